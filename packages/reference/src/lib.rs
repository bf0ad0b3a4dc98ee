#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reference tables for the phyto-map pipeline.
//!
//! Every table is read through the sniffing [`table`] reader and held in a
//! [`ReferenceCache`], which loads on first use and can be invalidated after
//! a table is rebuilt on disk. [`ReferenceTables`] bundles one cache per
//! table so resolvers can be handed an explicit, independent reference set.
//!
//! The substance catalog is required; every other table is optional and
//! loads as empty (with a warning) when its file is absent.

pub mod authorizations;
pub mod cache;
pub mod catalog;
pub mod environmental;
pub mod overrides;
pub mod pesticide_codes;
pub mod table;
pub mod thresholds;
pub mod tox_sheets;

use std::path::{Path, PathBuf};

pub use authorizations::AuthorizationRegistry;
pub use cache::ReferenceCache;
pub use catalog::Catalog;
pub use environmental::{EnvironmentalIndex, EnvironmentalStatus};
pub use overrides::UsageOverrides;
pub use pesticide_codes::PesticideCodeList;
pub use thresholds::ThresholdTable;
pub use tox_sheets::ToxSheetIndex;

/// Errors that can occur while loading reference tables.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// A required reference file does not exist.
    #[error("Reference file not found: {}", path.display())]
    MissingFile {
        /// Path that was expected.
        path: PathBuf,
    },

    /// Delimited text could not be decoded.
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON could not be parsed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file parsed but does not have the expected structure.
    #[error("Malformed {name} table: {message}")]
    Malformed {
        /// Table name.
        name: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Locations of the reference files. Only the catalog is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencePaths {
    /// C3PO aggregate catalog JSON.
    pub catalog: PathBuf,
    /// Manual usage dictionary.
    pub usage_overrides: Option<PathBuf>,
    /// Parameter-specific sanitary thresholds.
    pub thresholds: Option<PathBuf>,
    /// Active-substance authorization export.
    pub authorizations: Option<PathBuf>,
    /// NQE exceedance summary (may be gzip compressed).
    pub environmental: Option<PathBuf>,
    /// CAS → Fichetox sheet table.
    pub tox_sheets: Option<PathBuf>,
    /// Pesticide parameter code list.
    pub pesticide_codes: Option<PathBuf>,
}

impl ReferencePaths {
    /// `(table name, configured path)` for every table, catalog first.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, Option<&Path>); 7] {
        [
            ("catalog", Some(self.catalog.as_path())),
            ("usage_overrides", self.usage_overrides.as_deref()),
            ("thresholds", self.thresholds.as_deref()),
            ("authorizations", self.authorizations.as_deref()),
            ("environmental", self.environmental.as_deref()),
            ("tox_sheets", self.tox_sheets.as_deref()),
            ("pesticide_codes", self.pesticide_codes.as_deref()),
        ]
    }
}

/// Reads an optional table. `None` when unconfigured or absent.
///
/// # Errors
///
/// Propagates read and parse failures of a file that does exist.
pub fn read_optional_table(
    name: &str,
    path: Option<&Path>,
) -> Result<Option<table::Table>, ReferenceError> {
    let Some(path) = path else {
        log::debug!("No {name} table configured");
        return Ok(None);
    };
    if !path.exists() {
        log::warn!(
            "{name} table not found at {}, continuing without it",
            path.display()
        );
        return Ok(None);
    }

    let table = table::read_table(path)?;
    log::info!("Loaded {} {name} rows from {}", table.len(), path.display());
    Ok(Some(table))
}

fn optional_cache<T, F>(
    name: &'static str,
    path: Option<&Path>,
    from_table: F,
) -> ReferenceCache<T>
where
    T: Default + Send + Sync + 'static,
    F: Fn(&table::Table) -> Result<T, ReferenceError> + Send + Sync + 'static,
{
    let path = path.map(Path::to_path_buf);
    ReferenceCache::new(name, move || {
        read_optional_table(name, path.as_deref())?
            .map_or_else(|| Ok(T::default()), |table| from_table(&table))
    })
}

/// One memoizing cache per reference table.
pub struct ReferenceTables {
    /// Substance catalog.
    pub catalog: ReferenceCache<Catalog>,
    /// Manual usage dictionary.
    pub usage_overrides: ReferenceCache<UsageOverrides>,
    /// Sanitary thresholds.
    pub thresholds: ReferenceCache<ThresholdTable>,
    /// Authorization registry.
    pub authorizations: ReferenceCache<AuthorizationRegistry>,
    /// NQE exceedance index.
    pub environmental: ReferenceCache<EnvironmentalIndex>,
    /// Fichetox sheet index.
    pub tox_sheets: ReferenceCache<ToxSheetIndex>,
    /// Pesticide code filter.
    pub pesticide_codes: ReferenceCache<PesticideCodeList>,
}

impl ReferenceTables {
    /// Creates lazily loading caches for the given files.
    #[must_use]
    pub fn from_paths(paths: &ReferencePaths) -> Self {
        let catalog_path = paths.catalog.clone();
        Self {
            catalog: ReferenceCache::new("catalog", move || catalog::load_catalog(&catalog_path)),
            usage_overrides: optional_cache(
                "usage_overrides",
                paths.usage_overrides.as_deref(),
                UsageOverrides::from_table,
            ),
            thresholds: optional_cache(
                "thresholds",
                paths.thresholds.as_deref(),
                ThresholdTable::from_table,
            ),
            authorizations: optional_cache(
                "authorizations",
                paths.authorizations.as_deref(),
                AuthorizationRegistry::from_table,
            ),
            environmental: optional_cache(
                "environmental",
                paths.environmental.as_deref(),
                EnvironmentalIndex::from_table,
            ),
            tox_sheets: optional_cache(
                "tox_sheets",
                paths.tox_sheets.as_deref(),
                ToxSheetIndex::from_table,
            ),
            pesticide_codes: optional_cache(
                "pesticide_codes",
                paths.pesticide_codes.as_deref(),
                PesticideCodeList::from_table,
            ),
        }
    }

    /// A fixed in-memory reference set with the given catalog and every
    /// optional table empty. Individual caches can be swapped afterwards.
    #[must_use]
    pub fn in_memory(catalog: Catalog) -> Self {
        Self {
            catalog: ReferenceCache::preloaded("catalog", catalog),
            usage_overrides: ReferenceCache::preloaded("usage_overrides", UsageOverrides::default()),
            thresholds: ReferenceCache::preloaded("thresholds", ThresholdTable::default()),
            authorizations: ReferenceCache::preloaded(
                "authorizations",
                AuthorizationRegistry::default(),
            ),
            environmental: ReferenceCache::preloaded("environmental", EnvironmentalIndex::default()),
            tox_sheets: ReferenceCache::preloaded("tox_sheets", ToxSheetIndex::default()),
            pesticide_codes: ReferenceCache::preloaded(
                "pesticide_codes",
                PesticideCodeList::default(),
            ),
        }
    }

    /// Drops every memoized table so the next access reloads from disk.
    ///
    /// Must be called after a reference file (typically the usage
    /// dictionary) is rewritten.
    pub fn rebuild(&self) {
        self.catalog.invalidate();
        self.usage_overrides.invalidate();
        self.thresholds.invalidate();
        self.authorizations.invalidate();
        self.environmental.invalidate();
        self.tox_sheets.invalidate();
        self.pesticide_codes.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("phyto_map_reference_{name}"))
    }

    #[test]
    fn absent_optional_tables_load_empty() {
        let paths = ReferencePaths {
            catalog: temp_path("absent_catalog.json"),
            thresholds: Some(temp_path("absent_thresholds.csv")),
            ..ReferencePaths::default()
        };
        let tables = ReferenceTables::from_paths(&paths);

        assert!(tables.thresholds.get().unwrap().is_empty());
        assert!(tables.usage_overrides.get().unwrap().is_empty());
        assert!(matches!(
            tables.catalog.get(),
            Err(ReferenceError::MissingFile { .. })
        ));
    }

    #[test]
    fn rebuild_picks_up_rewritten_files() {
        let path = temp_path("rebuild_overrides.csv");
        std::fs::write(&path, "code_parametre;ppp_usage\n1105;herbicide\n").unwrap();

        let paths = ReferencePaths {
            catalog: temp_path("rebuild_catalog.json"),
            usage_overrides: Some(path.clone()),
            ..ReferencePaths::default()
        };
        let tables = ReferenceTables::from_paths(&paths);
        assert!(tables.usage_overrides.get().unwrap().by_code("1107").is_none());

        std::fs::write(
            &path,
            "code_parametre;ppp_usage\n1105;herbicide\n1107;herbicide\n",
        )
        .unwrap();
        assert!(tables.usage_overrides.get().unwrap().by_code("1107").is_none());

        tables.rebuild();
        assert!(tables.usage_overrides.get().unwrap().by_code("1107").is_some());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn malformed_optional_table_is_an_error() {
        let path = temp_path("malformed_thresholds.csv");
        std::fs::write(&path, "code;valeur\n1105;0.2\n").unwrap();

        let paths = ReferencePaths {
            thresholds: Some(path.clone()),
            ..ReferencePaths::default()
        };
        let tables = ReferenceTables::from_paths(&paths);
        assert!(matches!(
            tables.thresholds.get(),
            Err(ReferenceError::Malformed { .. })
        ));

        std::fs::remove_file(&path).ok();
    }
}
