//! Optional list of parameter codes treated as pesticides.

use std::collections::BTreeSet;

use crate::ReferenceError;
use crate::table::Table;

/// Parameter codes kept by the feature builder. Empty means "keep all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PesticideCodeList {
    codes: BTreeSet<String>,
}

impl PesticideCodeList {
    /// Whether a parameter code passes the filter.
    #[must_use]
    pub fn allows(&self, code: &str) -> bool {
        self.codes.is_empty() || self.codes.contains(code.trim())
    }

    /// Number of listed codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the list is empty (no filtering).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Builds the list from the first code-like column.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Malformed`] if no code column exists.
    pub fn from_table(table: &Table) -> Result<Self, ReferenceError> {
        if table.headers().is_empty() {
            return Ok(Self::default());
        }

        let Some(code_col) =
            table.column(&["code_parametre", "Code_parametre", "code", "Code"])
        else {
            return Err(ReferenceError::Malformed {
                name: "pesticide_codes".to_string(),
                message: "expected a code_parametre or code column".to_string(),
            });
        };

        Ok(table
            .rows()
            .filter_map(|row| row.get(code_col))
            .map(str::to_string)
            .collect())
    }
}

impl FromIterator<String> for PesticideCodeList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}
