//! Environmental quality standard (NQE) exceedance index.
//!
//! Built from the regional "station × parameter × year" summary, where each
//! row carries a status for the annual-average (NQE-MA) and the maximum
//! allowable concentration (NQE-CMA) standards.

use std::collections::BTreeMap;

use crate::ReferenceError;
use crate::table::Table;

/// Status value meaning the standard was exceeded. "non dépassement" and
/// "indéterminé" both count as not exceeded.
pub const EXCEEDED_STATUS: &str = "dépassement";

/// NQE statuses for one station, parameter, and year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnvironmentalStatus {
    /// Annual-average standard exceeded.
    pub annual_average_exceeded: bool,
    /// Maximum allowable concentration exceeded.
    pub max_concentration_exceeded: bool,
}

impl EnvironmentalStatus {
    /// Whether either standard is exceeded.
    #[must_use]
    pub const fn any_exceeded(self) -> bool {
        self.annual_average_exceeded || self.max_concentration_exceeded
    }
}

type Key = (String, String, String);

/// `(station code, parameter code, year)` → [`EnvironmentalStatus`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentalIndex {
    entries: BTreeMap<Key, EnvironmentalStatus>,
}

impl EnvironmentalIndex {
    /// Records a status. `year` is truncated to its first four characters.
    pub fn insert(&mut self, station: &str, parameter: &str, year: &str, status: EnvironmentalStatus) {
        self.entries.insert(key(station, parameter, year), status);
    }

    /// Status for a station, parameter, and year.
    #[must_use]
    pub fn get(&self, station: &str, parameter: &str, year: &str) -> Option<EnvironmentalStatus> {
        self.entries.get(&key(station, parameter, year)).copied()
    }

    /// `Some(true)` if either standard is exceeded, `Some(false)` if an entry
    /// exists with neither, `None` without an entry.
    #[must_use]
    pub fn exceedance(&self, station: &str, parameter: &str, year: &str) -> Option<bool> {
        self.get(station, parameter, year)
            .map(EnvironmentalStatus::any_exceeded)
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the index from the summary table.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Malformed`] if `code_station`,
    /// `code_parametre`, or `annee` is missing from the header.
    pub fn from_table(table: &Table) -> Result<Self, ReferenceError> {
        if table.headers().is_empty() {
            return Ok(Self::default());
        }

        let (Some(station_col), Some(param_col), Some(year_col)) = (
            table.column(&["code_station"]),
            table.column(&["code_parametre"]),
            table.column(&["annee"]),
        ) else {
            return Err(ReferenceError::Malformed {
                name: "environmental".to_string(),
                message: "expected code_station, code_parametre and annee columns".to_string(),
            });
        };
        let ma_col = table.column(&["statut_nqe_ma_souple"]);
        let cma_col = table.column(&["statut_nqe_cma_souple"]);

        let mut index = Self::default();
        for row in table.rows() {
            let (Some(station), Some(param), Some(year)) =
                (row.get(station_col), row.get(param_col), row.get(year_col))
            else {
                continue;
            };
            let status = EnvironmentalStatus {
                annual_average_exceeded: row.get_opt(ma_col) == Some(EXCEEDED_STATUS),
                max_concentration_exceeded: row.get_opt(cma_col) == Some(EXCEEDED_STATUS),
            };
            index.insert(station, param, year, status);
        }

        Ok(index)
    }
}

fn key(station: &str, parameter: &str, year: &str) -> Key {
    let year = year.trim();
    let year = year.char_indices().nth(4).map_or(year, |(i, _)| &year[..i]);
    (
        station.trim().to_string(),
        parameter.trim().to_string(),
        year.to_string(),
    )
}
