//! Market-authorization registry (active-substance decisions, keyed by CAS).

use std::collections::BTreeMap;

use crate::ReferenceError;
use crate::table::Table;

/// Authorization state meaning the substance is on the approved list.
pub const AUTHORIZED_STATE: &str = "INSCRITE";

/// CAS number → authorized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationRegistry {
    by_cas: BTreeMap<String, bool>,
}

/// Removes every space from a CAS number.
#[must_use]
pub fn normalize_cas(cas: &str) -> String {
    cas.chars().filter(|c| !c.is_whitespace()).collect()
}

impl AuthorizationRegistry {
    /// Records the authorization state of a CAS number.
    pub fn insert(&mut self, cas: &str, authorized: bool) {
        self.by_cas.insert(normalize_cas(cas), authorized);
    }

    /// Looks up a CAS number, retrying without hyphens when the hyphenated
    /// form is unknown.
    #[must_use]
    pub fn lookup(&self, cas: &str) -> Option<bool> {
        let normalized = normalize_cas(cas);
        if normalized.is_empty() {
            return None;
        }
        self.by_cas.get(&normalized).copied().or_else(|| {
            normalized
                .contains('-')
                .then(|| normalized.replace('-', ""))
                .and_then(|bare| self.by_cas.get(&bare).copied())
        })
    }

    /// Number of registered substances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_cas.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_cas.is_empty()
    }

    /// Builds the registry from the active-substance export.
    ///
    /// The CAS column is the first header mentioning both "cas" and
    /// "numero"; the state column is the first mentioning "autorisation".
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Malformed`] if either column is missing.
    pub fn from_table(table: &Table) -> Result<Self, ReferenceError> {
        if table.headers().is_empty() {
            return Ok(Self::default());
        }

        let cas_col = table.find_column(|h| h.contains("cas") && h.contains("numero"));
        let state_col = table.find_column(|h| h.contains("autorisation"));
        let (Some(cas_col), Some(state_col)) = (cas_col, state_col) else {
            return Err(ReferenceError::Malformed {
                name: "authorizations".to_string(),
                message: "expected CAS number and authorization state columns".to_string(),
            });
        };

        let mut registry = Self::default();
        for row in table.rows() {
            let (Some(cas), Some(state)) = (row.get(cas_col), row.get(state_col)) else {
                continue;
            };
            registry.insert(cas, state == AUTHORIZED_STATE);
        }

        Ok(registry)
    }
}
