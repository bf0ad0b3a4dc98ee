//! Concentration unit normalization to µg/L.

use phyto_map_substance_models::lenient::value_to_decimal;
use serde_json::Value;

/// Micrograms per milligram.
pub const MICROGRAMS_PER_MILLIGRAM: f64 = 1000.0;

/// Concentration units the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcentrationUnit {
    /// µg/L
    MicrogramsPerLitre,
    /// mg/L
    MilligramsPerLitre,
}

impl ConcentrationUnit {
    /// Parses a unit symbol. The micro prefix may be written with the micro
    /// sign (U+00B5), the Greek mu (U+03BC), or an ASCII `u`.
    #[must_use]
    pub fn parse(symbol: &str) -> Option<Self> {
        let ascii: String = symbol
            .trim()
            .chars()
            .map(|c| if matches!(c, '\u{00B5}' | '\u{03BC}') { 'u' } else { c })
            .collect();

        match ascii.as_str() {
            "ug/L" => Some(Self::MicrogramsPerLitre),
            "mg/L" => Some(Self::MilligramsPerLitre),
            _ => None,
        }
    }

    /// Converts a value in this unit to µg/L.
    #[must_use]
    pub fn to_micrograms_per_litre(self, value: f64) -> f64 {
        match self {
            Self::MicrogramsPerLitre => value,
            Self::MilligramsPerLitre => value * MICROGRAMS_PER_MILLIGRAM,
        }
    }
}

/// Normalizes a raw result to µg/L.
///
/// `None` when the value or unit is missing, the unit is not recognized, or
/// the value is not a well-formed finite decimal.
#[must_use]
pub fn to_micrograms_per_litre(value: Option<&Value>, unit: Option<&str>) -> Option<f64> {
    let unit = ConcentrationUnit::parse(unit?)?;
    let value = value_to_decimal(value?)?;
    Some(unit.to_micrograms_per_litre(value))
}
