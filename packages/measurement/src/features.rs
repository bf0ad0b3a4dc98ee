//! Geographic feature building.
//!
//! Turns [`RawMeasurement`]s into [`ImpactFeature`]s: resolves a point,
//! applies the department filter, resolves the substance, normalizes the
//! concentration, and computes sanitary and environmental exceedances.
//!
//! Records sampled before the recency window, without a usable point,
//! outside the department, or without a parameter code are dropped and
//! counted in the [`BuildReport`], which also tallies how each emitted
//! feature's usage was resolved.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use phyto_map_measurement_models::{
    GroundwaterRecord, ImpactFeature, ImpactProperties, RawMeasurement, SurfaceWaterRecord,
    WaterBodyType,
};
use phyto_map_reference::{
    Catalog, EnvironmentalIndex, PesticideCodeList, ReferenceError, ReferenceTables,
};
use phyto_map_substance::SubstanceResolver;
use phyto_map_substance_models::ResolutionStep;
use strum_macros::{AsRefStr, Display};

use crate::department::DepartmentFilter;
use crate::geometry::resolve_point;
use crate::progress::ProgressCallback;
use crate::thresholds::ThresholdResolver;
use crate::units::to_micrograms_per_litre;

/// Records read per source before building, after the pesticide filter.
pub const DEFAULT_MAX_RECORDS_PER_SOURCE: usize = 50_000;

/// Why a record did not become a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// Sampled before the recency window, or undated while one is set
    OutsideWindow,
    /// Parameter code not in the pesticide list
    NotPesticide,
    /// Beyond the per-source record cap
    OverCap,
    /// No valid point geometry
    NoGeometry,
    /// Outside the target department
    OutsideDepartment,
    /// No parameter code
    MissingParameterCode,
}

/// Counters collected while building features.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Records received, before any filter.
    pub seen: usize,
    /// Features produced.
    pub emitted: usize,
    /// Dropped records per reason.
    pub dropped: BTreeMap<DropReason, usize>,
    /// Emitted features per usage resolution step.
    pub resolutions: BTreeMap<ResolutionStep, usize>,
}

impl BuildReport {
    fn drop_record(&mut self, reason: DropReason, count: usize) {
        if count > 0 {
            *self.dropped.entry(reason).or_default() += count;
        }
    }

    /// Number of records dropped for `reason`.
    #[must_use]
    pub fn dropped(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or_default()
    }

    /// Number of emitted features whose usage came from `step`.
    #[must_use]
    pub fn resolved(&self, step: ResolutionStep) -> usize {
        self.resolutions.get(&step).copied().unwrap_or_default()
    }

    fn log(&self) {
        log::info!(
            "Built {} features from {} records",
            self.emitted,
            self.seen
        );
        for (reason, count) in &self.dropped {
            log::info!("  dropped {count} records: {reason}");
        }
        for (step, count) in &self.resolutions {
            log::info!("  usage of {count} features resolved by {step}");
        }
    }
}

/// Feature builder options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Per-source record cap.
    pub max_records_per_source: usize,
    /// Earliest sampling day kept. `None` keeps every record.
    pub sampled_since: Option<NaiveDate>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_records_per_source: DEFAULT_MAX_RECORDS_PER_SOURCE,
            sampled_since: None,
        }
    }
}

/// First day of a window covering the last `years` years up to `today`,
/// counting a year as 365 days.
#[must_use]
pub fn recency_cutoff(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(365 * u64::from(years)))
        .unwrap_or(NaiveDate::MIN)
}

/// Builds [`ImpactFeature`]s against a snapshot of the reference tables.
pub struct FeatureBuilder {
    department: DepartmentFilter,
    options: BuildOptions,
    catalog: Arc<Catalog>,
    resolver: SubstanceResolver,
    thresholds: ThresholdResolver,
    environmental: Arc<EnvironmentalIndex>,
    pesticide_codes: Arc<PesticideCodeList>,
}

impl FeatureBuilder {
    /// Snapshots every table the builder needs, loading them if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] if the catalog is missing or a configured
    /// table cannot be parsed.
    pub fn new(
        department: DepartmentFilter,
        tables: &ReferenceTables,
        options: BuildOptions,
    ) -> Result<Self, ReferenceError> {
        Ok(Self {
            department,
            options,
            catalog: tables.catalog.get()?,
            resolver: SubstanceResolver::from_tables(tables)?,
            thresholds: ThresholdResolver::from_tables(tables)?,
            environmental: tables.environmental.get()?,
            pesticide_codes: tables.pesticide_codes.get()?,
        })
    }

    /// Builds one feature.
    ///
    /// # Errors
    ///
    /// Returns the [`DropReason`] when the record cannot become a feature.
    pub fn build_feature(&self, raw: &RawMeasurement) -> Result<ImpactFeature, DropReason> {
        self.build_resolved(raw).map(|(feature, _)| feature)
    }

    fn build_resolved(
        &self,
        raw: &RawMeasurement,
    ) -> Result<(ImpactFeature, ResolutionStep), DropReason> {
        let point = resolve_point(raw.geometry.as_ref(), raw.longitude, raw.latitude)
            .ok_or(DropReason::NoGeometry)?;

        if !self.department.contains(raw) {
            return Err(DropReason::OutsideDepartment);
        }

        let code = raw
            .parameter_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(DropReason::MissingParameterCode)?;

        let metadata = self.resolver.resolve(
            code,
            raw.parameter_label.as_deref(),
            self.catalog.get(code),
        );

        let concentration = to_micrograms_per_litre(raw.result.as_ref(), raw.unit.as_deref());
        let threshold = concentration.map(|_| self.thresholds.resolve(Some(code)));
        let ratio = match (concentration, threshold) {
            (Some(c), Some(t)) if t > 0.0 => Some(c / t),
            _ => None,
        };

        let year = raw.sampling_date.as_deref().and_then(sampling_year);
        let environmental_exceedance = match (raw.water_type, raw.station_code.as_deref(), &year) {
            (WaterBodyType::Surface, Some(station), Some(year)) => {
                self.environmental.exceedance(station, code, year)
            }
            _ => None,
        };

        let properties = ImpactProperties {
            location: non_empty(raw.location.as_deref()),
            commune: non_empty(raw.commune.as_deref()),
            river: non_empty(raw.river.as_deref()),
            water_body: non_empty(raw.water_body.as_deref()),
            substance: metadata.display_name,
            parameter_code: Some(code.to_string()),
            usage: metadata.usage,
            typical_uses: metadata.typical_uses,
            authorized: metadata.authorized,
            concentration_ugl: concentration,
            threshold_ugl: threshold,
            sanitary_ratio: ratio,
            sanitary_exceedance: ratio.map(|r| r > 1.0),
            environmental_exceedance,
            sampling_date: non_empty(raw.sampling_date.as_deref()),
            year,
            water_type: Some(raw.water_type),
            station_code: non_empty(raw.station_code.as_deref()),
            reference_link: Some(metadata.reference_link),
            wkt_geom: Some(point.to_wkt()),
        };

        Ok((ImpactFeature { point, properties }, metadata.resolved_by))
    }

    /// Builds features from both sources, surface records first.
    ///
    /// Per source, records sampled before the recency window are dropped
    /// first, then records outside the pesticide list, then at most
    /// `max_records_per_source` are kept.
    pub fn build(
        &self,
        surface: Vec<SurfaceWaterRecord>,
        groundwater: Vec<GroundwaterRecord>,
        progress: &dyn ProgressCallback,
    ) -> (Vec<ImpactFeature>, BuildReport) {
        let mut report = BuildReport::default();

        let surface = self.select(surface.into_iter().map(RawMeasurement::from), &mut report);
        let groundwater =
            self.select(groundwater.into_iter().map(RawMeasurement::from), &mut report);
        log::debug!(
            "Selected {} surface and {} groundwater records",
            surface.len(),
            groundwater.len()
        );

        progress.set_total((surface.len() + groundwater.len()) as u64);
        progress.set_message("Building features".to_string());

        let mut features = Vec::new();
        for raw in surface.iter().chain(groundwater.iter()) {
            match self.build_resolved(raw) {
                Ok((feature, step)) => {
                    *report.resolutions.entry(step).or_default() += 1;
                    features.push(feature);
                }
                Err(reason) => {
                    log::trace!(
                        "Dropping {} record {:?}: {reason}",
                        raw.water_type,
                        raw.station_code
                    );
                    report.drop_record(reason, 1);
                }
            }
            progress.inc(1);
        }

        report.emitted = features.len();
        progress.finish(format!("{} features", features.len()));
        report.log();

        (features, report)
    }

    fn select(
        &self,
        records: impl Iterator<Item = RawMeasurement>,
        report: &mut BuildReport,
    ) -> Vec<RawMeasurement> {
        let mut selected = Vec::new();
        let mut outside_window = 0;
        let mut not_pesticide = 0;
        let mut over_cap = 0;

        for raw in records {
            report.seen += 1;
            if !self.in_window(&raw) {
                outside_window += 1;
            } else if !self.is_pesticide(&raw) {
                not_pesticide += 1;
            } else if selected.len() >= self.options.max_records_per_source {
                over_cap += 1;
            } else {
                selected.push(raw);
            }
        }

        if over_cap > 0 {
            log::info!(
                "Reached max_records_per_source limit ({}), skipped {over_cap} records",
                self.options.max_records_per_source
            );
        }
        if let Some(since) = self.options.sampled_since
            && outside_window > 0
        {
            log::info!("Skipped {outside_window} records sampled before {since}");
        }
        report.drop_record(DropReason::OutsideWindow, outside_window);
        report.drop_record(DropReason::NotPesticide, not_pesticide);
        report.drop_record(DropReason::OverCap, over_cap);

        selected
    }

    fn in_window(&self, raw: &RawMeasurement) -> bool {
        let Some(since) = self.options.sampled_since else {
            return true;
        };
        raw.sampling_date
            .as_deref()
            .and_then(sampling_day)
            .is_some_and(|day| day >= since)
    }

    fn is_pesticide(&self, raw: &RawMeasurement) -> bool {
        if self.pesticide_codes.is_empty() {
            return true;
        }
        raw.parameter_code
            .as_deref()
            .is_some_and(|code| self.pesticide_codes.allows(code))
    }
}

/// Year of a sampling date: its first four characters when they are ASCII
/// digits.
#[must_use]
pub fn sampling_year(date: &str) -> Option<String> {
    let prefix = date.trim().get(..4)?;
    prefix
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| prefix.to_string())
}

/// Calendar day of a sampling date or timestamp (`YYYY-MM-DD…`).
#[must_use]
pub fn sampling_day(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date.trim().get(..10)?, "%Y-%m-%d").ok()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
