//! `phyto_map.toml` loading.
//!
//! Every section and key is optional. Relative paths are resolved against
//! the directory holding the config file, so a project directory can be
//! moved as a whole.

use std::path::{Path, PathBuf};

use phyto_map_measurement::department::DEFAULT_DEPARTMENT;
use phyto_map_measurement::features::DEFAULT_MAX_RECORDS_PER_SOURCE;
use phyto_map_reference::ReferencePaths;
use serde::Deserialize;
use thiserror::Error;

/// Config file used when neither `--config` nor `PHYTO_MAP_CONFIG` is set.
pub const DEFAULT_CONFIG_FILE: &str = "phyto_map.toml";

/// Normalized layer file name inside the output directory.
pub const IMPACT_LAYER_FILE: &str = "impact_layer.geojson";
/// Yearly ranking file name inside the output directory.
pub const RANKING_FILE: &str = "top10_by_year.geojson";
/// Hotspot layer file name inside the output directory.
pub const HOTSPOTS_FILE: &str = "hotspots.geojson";
/// Rollup file name inside the output directory.
pub const ROLLUP_FILE: &str = "yearly_rollup.csv";

/// Errors loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but cannot be read
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`Config`]
    #[error("Failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Resolved pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub department: DepartmentSection,
    pub reference: ReferenceSection,
    pub input: InputSection,
    pub output: OutputSection,
}

/// `[department]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DepartmentSection {
    /// Two- or three-character department code, e.g. `"21"` or `"2A"`.
    pub code: String,
}

impl Default for DepartmentSection {
    fn default() -> Self {
        Self {
            code: DEFAULT_DEPARTMENT.to_string(),
        }
    }
}

/// `[reference]`: paths of the reference tables. Only the catalog is
/// required to exist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceSection {
    pub catalog: PathBuf,
    pub usage_overrides: Option<PathBuf>,
    pub thresholds: Option<PathBuf>,
    pub authorizations: Option<PathBuf>,
    pub environmental: Option<PathBuf>,
    pub tox_sheets: Option<PathBuf>,
    pub pesticide_codes: Option<PathBuf>,
    /// BNV-D export directory read by `build-usage-dict --from-sources`.
    pub usage_sources: PathBuf,
}

impl Default for ReferenceSection {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("reference/catalog.json"),
            usage_overrides: None,
            thresholds: None,
            authorizations: None,
            environmental: None,
            tox_sheets: None,
            pesticide_codes: None,
            usage_sources: PathBuf::from("reference/sources_dictionnaire"),
        }
    }
}

impl ReferenceSection {
    /// Paths handed to the reference loader.
    #[must_use]
    pub fn paths(&self) -> ReferencePaths {
        ReferencePaths {
            catalog: self.catalog.clone(),
            usage_overrides: self.usage_overrides.clone(),
            thresholds: self.thresholds.clone(),
            authorizations: self.authorizations.clone(),
            environmental: self.environmental.clone(),
            tox_sheets: self.tox_sheets.clone(),
            pesticide_codes: self.pesticide_codes.clone(),
        }
    }
}

/// `[input]`: raw record files, one JSON array per schema.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputSection {
    /// Naïades surface-water analyses
    pub surface: Option<PathBuf>,
    /// ADES groundwater analyses
    pub groundwater: Option<PathBuf>,
    pub max_records_per_source: usize,
    /// Keep only analyses sampled within this many years before today.
    pub recent_years: Option<u32>,
}

impl Default for InputSection {
    fn default() -> Self {
        Self {
            surface: None,
            groundwater: None,
            max_records_per_source: DEFAULT_MAX_RECORDS_PER_SOURCE,
            recent_years: None,
        }
    }
}

/// `[output]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub dir: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl OutputSection {
    #[must_use]
    pub fn impact_layer(&self) -> PathBuf {
        self.dir.join(IMPACT_LAYER_FILE)
    }

    #[must_use]
    pub fn ranking(&self) -> PathBuf {
        self.dir.join(RANKING_FILE)
    }

    #[must_use]
    pub fn hotspots(&self) -> PathBuf {
        self.dir.join(HOTSPOTS_FILE)
    }

    #[must_use]
    pub fn rollup(&self) -> PathBuf {
        self.dir.join(ROLLUP_FILE)
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let config = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let config = Self::parse(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
            log::info!("Loaded config from {}", path.display());
            config
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Self::default()
        };

        Ok(config.resolved_against(&base))
    }

    /// Parses TOML text without resolving paths.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is invalid or has unknown keys.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Makes every relative path relative to `base`.
    #[must_use]
    pub fn resolved_against(mut self, base: &Path) -> Self {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        let reference = &mut self.reference;
        resolve(&mut reference.catalog);
        resolve(&mut reference.usage_sources);
        for path in [
            &mut reference.usage_overrides,
            &mut reference.thresholds,
            &mut reference.authorizations,
            &mut reference.environmental,
            &mut reference.tox_sheets,
            &mut reference.pesticide_codes,
            &mut self.input.surface,
            &mut self.input.groundwater,
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
        resolve(&mut self.output.dir);

        self
    }
}
