#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Output types of the three analytical views derived from the normalized
//! impact layer: the top-N-per-year ranking, the exceedance hotspots, and
//! the location × substance × year rollup.

use phyto_map_measurement_models::{ImpactFeature, Point, WaterBodyType};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A feature kept by the yearly ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedFeature {
    pub feature: ImpactFeature,
    /// Rank of the feature's parameter within its year, starting at 1.
    pub yearly_rank: usize,
    /// Always `true` for kept features.
    pub yearly_top: bool,
}

/// Which thresholds a hotspot exceeds.
///
/// Serialized as its integer code so map styles can switch on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExceedanceType {
    /// Sanitary and environmental
    Both = 1,
    /// Environmental only
    EnvironmentalOnly = 2,
    /// Sanitary only
    SanitaryOnly = 3,
}

impl ExceedanceType {
    /// Classifies a hotspot. Without an environmental exceedance the hotspot
    /// is necessarily a sanitary one.
    #[must_use]
    pub const fn from_flags(sanitary: bool, environmental: bool) -> Self {
        match (sanitary, environmental) {
            (true, true) => Self::Both,
            (false, true) => Self::EnvironmentalOnly,
            (_, false) => Self::SanitaryOnly,
        }
    }

    /// Integer code.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Parses an integer code.
    ///
    /// # Errors
    ///
    /// Returns the value back if it is not 1, 2, or 3.
    pub const fn from_value(value: u8) -> Result<Self, u8> {
        match value {
            1 => Ok(Self::Both),
            2 => Ok(Self::EnvironmentalOnly),
            3 => Ok(Self::SanitaryOnly),
            other => Err(other),
        }
    }
}

impl Serialize for ExceedanceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for ExceedanceType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        Self::from_value(value).map_err(|v| {
            serde::de::Error::custom(format!("invalid exceedance type {v}: expected 1-3"))
        })
    }
}

/// Exceedance summary for one (water type, location, substance).
///
/// Descriptive attributes and geometry come from the first feature of the
/// group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotAggregate {
    #[serde(skip)]
    pub point: Point,
    pub water_type: Option<WaterBodyType>,
    pub location: String,
    pub substance: String,
    pub parameter_code: Option<String>,
    pub usage: Option<String>,
    pub authorized: Option<bool>,
    pub commune: Option<String>,
    pub river: Option<String>,
    pub water_body: Option<String>,
    pub reference_link: Option<String>,
    /// Features with a known concentration.
    pub measurement_count: usize,
    /// Of those, features exceeding the sanitary threshold.
    pub exceedance_count: usize,
    pub sanitary_exceedance: bool,
    pub environmental_exceedance: bool,
    pub max_concentration_ugl: f64,
    /// Highest sanitary ratio, rounded to two decimals.
    pub sanitary_ratio: Option<f64>,
    /// Sampling date of the row that set the highest ratio.
    pub sampling_date: Option<String>,
    pub year_min: Option<String>,
    pub year_max: Option<String>,
    /// Symbol size in millimetres.
    pub size_mm: f64,
    pub inner_size_mm: f64,
    /// 1 (smallest) to 4.
    pub size_class: u8,
    pub exceedance_type: ExceedanceType,
}

/// Measurement count and mean concentration for one (water type, location,
/// substance, year).
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyRollup {
    pub water_type: Option<WaterBodyType>,
    pub location: String,
    pub commune: Option<String>,
    pub substance: String,
    pub usage: Option<String>,
    pub year: String,
    /// All features in the group.
    pub sample_count: usize,
    pub concentration_sum: f64,
    /// Features with a known concentration.
    pub concentration_count: usize,
}

impl YearlyRollup {
    /// Mean of the known concentrations, `None` when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_concentration(&self) -> Option<f64> {
        (self.concentration_count > 0)
            .then(|| self.concentration_sum / self.concentration_count as f64)
    }
}
