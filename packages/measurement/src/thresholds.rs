//! Sanitary threshold resolution.

use std::sync::Arc;

use phyto_map_reference::{ReferenceError, ReferenceTables, ThresholdTable};

/// Drinking-water limit for an individual pesticide, in µg/L. The 0.5 µg/L
/// limit on the sum of pesticides is not applied.
pub const DEFAULT_SANITARY_THRESHOLD_UGL: f64 = 0.1;

/// Parameter-specific threshold when one is configured, else
/// [`DEFAULT_SANITARY_THRESHOLD_UGL`].
#[derive(Debug, Clone, Default)]
pub struct ThresholdResolver {
    table: Arc<ThresholdTable>,
}

impl ThresholdResolver {
    #[must_use]
    pub const fn new(table: Arc<ThresholdTable>) -> Self {
        Self { table }
    }

    /// Snapshots the threshold table, loading it if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] if the configured table cannot be parsed.
    pub fn from_tables(tables: &ReferenceTables) -> Result<Self, ReferenceError> {
        Ok(Self::new(tables.thresholds.get()?))
    }

    /// Threshold in µg/L for a parameter code.
    #[must_use]
    pub fn resolve(&self, code: Option<&str>) -> f64 {
        code.and_then(|code| self.table.get(code))
            .unwrap_or(DEFAULT_SANITARY_THRESHOLD_UGL)
    }
}
