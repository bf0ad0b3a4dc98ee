//! Manual usage dictionary (`code_parametre;cas;ppp_usage;ppp_usages_typiques;…`).

use std::collections::BTreeMap;

use phyto_map_substance_models::UsageOverride;

use crate::ReferenceError;
use crate::table::Table;

const CODE_COLUMNS: &[&str] = &["code_parametre", "Code_parametre"];
const CAS_COLUMNS: &[&str] = &["cas", "CAS"];
const USAGE_COLUMN: &str = "ppp_usage";
const TYPICAL_USES_COLUMN: &str = "ppp_usages_typiques";

/// Usage overrides keyed by parameter code and by CAS number.
#[derive(Debug, Clone, Default)]
pub struct UsageOverrides {
    by_code: BTreeMap<String, UsageOverride>,
    by_cas: BTreeMap<String, UsageOverride>,
}

impl UsageOverrides {
    /// Registers an override for a parameter code.
    pub fn insert_code(&mut self, code: impl Into<String>, value: UsageOverride) {
        self.by_code.insert(code.into(), value);
    }

    /// Registers an override for a CAS number.
    pub fn insert_cas(&mut self, cas: impl Into<String>, value: UsageOverride) {
        self.by_cas.insert(cas.into(), value);
    }

    /// Override for a trimmed parameter code.
    #[must_use]
    pub fn by_code(&self, code: &str) -> Option<&UsageOverride> {
        self.by_code.get(code.trim())
    }

    /// Override for a trimmed CAS number.
    #[must_use]
    pub fn by_cas(&self, cas: &str) -> Option<&UsageOverride> {
        self.by_cas.get(cas.trim())
    }

    /// Total number of keyed rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len() + self.by_cas.len()
    }

    /// Whether no row was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty() && self.by_cas.is_empty()
    }

    /// Builds the dictionary from a parsed table.
    ///
    /// Rows with neither a usage, a typical-use text, nor any other non-empty
    /// column are skipped. A row keyed by both code and CAS is registered
    /// under both.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError::Malformed`] if the table has headers but
    /// neither a code nor a CAS column.
    pub fn from_table(table: &Table) -> Result<Self, ReferenceError> {
        let mut overrides = Self::default();
        if table.headers().is_empty() {
            return Ok(overrides);
        }

        let code_col = table.column(CODE_COLUMNS);
        let cas_col = table.column(CAS_COLUMNS);
        if code_col.is_none() && cas_col.is_none() {
            return Err(ReferenceError::Malformed {
                name: "usage_overrides".to_string(),
                message: "no code_parametre or cas column".to_string(),
            });
        }

        for row in table.rows() {
            let mut value = UsageOverride::default();
            for (header, cell) in row.cells() {
                if CODE_COLUMNS.contains(&header) || CAS_COLUMNS.contains(&header) {
                    continue;
                }
                match header {
                    USAGE_COLUMN => value.usage = Some(cell.to_string()),
                    TYPICAL_USES_COLUMN => value.typical_uses = Some(cell.to_string()),
                    _ => {
                        value.attributes.insert(header.to_string(), cell.to_string());
                    }
                }
            }
            if value.is_empty() {
                continue;
            }

            if let Some(code) = row.get_opt(code_col) {
                overrides.insert_code(code, value.clone());
            }
            if let Some(cas) = row.get_opt(cas_col) {
                overrides.insert_cas(cas, value);
            }
        }

        Ok(overrides)
    }
}
