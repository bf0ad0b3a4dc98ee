//! Parameter-specific sanitary thresholds (`code_parametre;seuil_ugl`).

use std::collections::BTreeMap;

use crate::ReferenceError;
use crate::table::Table;

/// Sanitary thresholds in µg/L keyed by parameter code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdTable {
    by_code: BTreeMap<String, f64>,
}

impl ThresholdTable {
    /// Threshold for a trimmed parameter code.
    #[must_use]
    pub fn get(&self, code: &str) -> Option<f64> {
        self.by_code.get(code.trim()).copied()
    }

    /// Number of parameter-specific thresholds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Whether no threshold was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Builds the table from parsed rows, skipping rows whose value does not
    /// parse.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Malformed`] if the header lacks
    /// `code_parametre` or `seuil_ugl`.
    pub fn from_table(table: &Table) -> Result<Self, ReferenceError> {
        if table.headers().is_empty() {
            return Ok(Self::default());
        }

        let (Some(code_col), Some(value_col)) = (
            table.column(&["code_parametre", "Code_parametre"]),
            table.column(&["seuil_ugl"]),
        ) else {
            return Err(ReferenceError::Malformed {
                name: "thresholds".to_string(),
                message: "expected code_parametre and seuil_ugl columns".to_string(),
            });
        };

        let mut by_code = BTreeMap::new();
        for row in table.rows() {
            let (Some(code), Some(raw)) = (row.get(code_col), row.get(value_col)) else {
                continue;
            };
            match parse_threshold_value(raw) {
                Some(value) => {
                    by_code.insert(code.to_string(), value);
                }
                None => log::debug!("Skipping threshold for {code}: unparseable value {raw:?}"),
            }
        }

        Ok(Self { by_code })
    }
}

impl FromIterator<(String, f64)> for ThresholdTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            by_code: iter.into_iter().collect(),
        }
    }
}

/// Parses a threshold cell, tolerating comma decimals and a leading
/// inequality sign (`<`, `>`, `≤`, `≥`, `=`).
#[must_use]
pub fn parse_threshold_value(raw: &str) -> Option<f64> {
    let trimmed = raw
        .trim()
        .trim_start_matches(['<', '>', '≤', '≥', '='])
        .trim();
    let normalized = trimmed.replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && !normalized.is_empty())
}
