//! INRS toxicological sheet (Fichetox) index, CAS → sheet number.

use std::collections::BTreeMap;

use crate::ReferenceError;
use crate::authorizations::normalize_cas;
use crate::table::Table;

/// Base URL of an individual sheet.
pub const SHEET_BASE_URL: &str = "https://www.inrs.fr/publications/bdd/fichetox/fiche.html";

/// Sheet search page, used when no sheet is known.
pub const HOME_URL: &str = "https://www.inrs.fr/publications/bdd/fichetox.html";

const SHEET_PREFIX: &str = "FICHETOX_";

/// CAS number → Fichetox sheet number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToxSheetIndex {
    by_cas: BTreeMap<String, String>,
}

impl ToxSheetIndex {
    /// Registers a sheet. `sheet` may carry the `FICHETOX_` prefix; anything
    /// that is not all digits once the prefix is stripped is ignored.
    pub fn insert(&mut self, cas: &str, sheet: &str) {
        let number = sheet.trim().trim_start_matches(SHEET_PREFIX).trim();
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return;
        }
        let cas = normalize_cas(cas);
        if !cas.is_empty() {
            self.by_cas.insert(cas, number.to_string());
        }
    }

    /// Sheet number for a CAS, retrying without hyphens.
    #[must_use]
    pub fn sheet_number(&self, cas: &str) -> Option<&str> {
        let normalized = normalize_cas(cas);
        if normalized.is_empty() {
            return None;
        }
        self.by_cas
            .get(&normalized)
            .or_else(|| {
                if normalized.contains('-') {
                    self.by_cas.get(&normalized.replace('-', ""))
                } else {
                    None
                }
            })
            .map(String::as_str)
    }

    /// Direct sheet URL for a CAS when one is known, else the search page.
    #[must_use]
    pub fn link_for(&self, cas: Option<&str>) -> String {
        cas.and_then(|cas| self.sheet_number(cas)).map_or_else(
            || HOME_URL.to_string(),
            |number| format!("{SHEET_BASE_URL}?refINRS={SHEET_PREFIX}{number}"),
        )
    }

    /// Number of indexed CAS numbers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_cas.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_cas.is_empty()
    }

    /// Builds the index from a `cas;ref_fichetox` table.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Malformed`] if either column is missing.
    pub fn from_table(table: &Table) -> Result<Self, ReferenceError> {
        if table.headers().is_empty() {
            return Ok(Self::default());
        }

        let (Some(cas_col), Some(ref_col)) =
            (table.column(&["cas", "CAS"]), table.column(&["ref_fichetox"]))
        else {
            return Err(ReferenceError::Malformed {
                name: "tox_sheets".to_string(),
                message: "expected cas and ref_fichetox columns".to_string(),
            });
        };

        let mut index = Self::default();
        for row in table.rows() {
            if let (Some(cas), Some(sheet)) = (row.get(cas_col), row.get(ref_col)) {
                index.insert(cas, sheet);
            }
        }

        Ok(index)
    }
}
