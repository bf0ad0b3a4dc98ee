//! Build and view stages driven by a [`Config`].
//!
//! `build` reads the raw record files, normalizes them against the
//! reference tables, and writes the impact layer. `views` reads that layer
//! back and derives the ranking, hotspot, and rollup outputs from it, so
//! views can be re-run without rebuilding.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use phyto_map_cli_utils::{MultiProgress, TerminalProgress};
use phyto_map_measurement::progress::ProgressCallback;
use phyto_map_measurement::{BuildOptions, DepartmentFilter, FeatureBuilder, recency_cutoff};
use phyto_map_measurement_models::{GroundwaterRecord, ImpactFeature, SurfaceWaterRecord};
use phyto_map_reference::ReferenceTables;
use phyto_map_views::{
    aggregate_hotspots, rank_by_year, read_features, rollup_by_year, write_features,
    write_hotspots, write_ranked, write_rollup,
};
use serde::de::DeserializeOwned;

use crate::config::Config;

/// Stages reported by [`views`].
const VIEW_STAGES: u64 = 3;

/// Reads a JSON array of records. An unset or absent file yields no
/// records.
///
/// # Errors
///
/// Returns an error if the file exists but is not a JSON array of `T`.
pub fn read_records<T: DeserializeOwned>(
    name: &str,
    path: Option<&Path>,
) -> Result<Vec<T>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        log::warn!("No {name} input configured");
        return Ok(Vec::new());
    };
    if !path.exists() {
        log::warn!("{name} input not found at {}, skipping", path.display());
        return Ok(Vec::new());
    }

    let text = std::fs::read_to_string(path)?;
    let records: Vec<T> = serde_json::from_str(&text)
        .map_err(|e| format!("Failed to parse {name} records in {}: {e}", path.display()))?;
    log::info!("Read {} {name} records from {}", records.len(), path.display());
    Ok(records)
}

/// Builds the normalized impact layer and writes it to the output directory.
///
/// # Errors
///
/// Returns an error if the catalog is missing, a reference table or input
/// file is malformed, or the layer cannot be written.
pub fn build(
    config: &Config,
    tables: &ReferenceTables,
    multi: &MultiProgress,
) -> Result<Vec<ImpactFeature>, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let surface: Vec<SurfaceWaterRecord> =
        read_records("surface", config.input.surface.as_deref())?;
    let groundwater: Vec<GroundwaterRecord> =
        read_records("groundwater", config.input.groundwater.as_deref())?;

    let builder = FeatureBuilder::new(
        DepartmentFilter::new(config.department.code.as_str()),
        tables,
        build_options(config, Local::now().date_naive()),
    )?;

    let progress = TerminalProgress::records(multi, "Normalizing measurements");
    let (features, _report) = builder.build(surface, groundwater, progress.as_ref());

    let path = config.output.impact_layer();
    write_features(&path, &features)?;
    log::info!(
        "Impact layer for department {} written to {} in {:.1}s",
        config.department.code,
        path.display(),
        start.elapsed().as_secs_f64()
    );

    Ok(features)
}

/// Builder options for `config`, with the recency window ending `today`.
fn build_options(config: &Config, today: NaiveDate) -> BuildOptions {
    let sampled_since = config
        .input
        .recent_years
        .map(|years| recency_cutoff(today, years));
    if let Some(since) = sampled_since {
        log::info!("Keeping analyses sampled on or after {since}");
    }

    BuildOptions {
        max_records_per_source: config.input.max_records_per_source,
        sampled_since,
    }
}

/// Derives the three views from `features`, or from the persisted layer
/// when `features` is `None`.
///
/// # Errors
///
/// Returns an error if the layer cannot be read or a view cannot be
/// written.
pub fn views(
    config: &Config,
    features: Option<Vec<ImpactFeature>>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let features = match features {
        Some(features) => features,
        None => read_features(&config.output.impact_layer())?,
    };

    let progress: Arc<dyn ProgressCallback> =
        TerminalProgress::stages(multi, "Deriving views", VIEW_STAGES);

    progress.set_message("Ranking".to_string());
    write_ranked(&config.output.ranking(), &rank_by_year(&features))?;
    progress.inc(1);

    progress.set_message("Hotspots".to_string());
    write_hotspots(&config.output.hotspots(), &aggregate_hotspots(&features))?;
    progress.inc(1);

    progress.set_message("Rollup".to_string());
    write_rollup(&config.output.rollup(), &rollup_by_year(&features))?;
    progress.inc(1);

    progress.finish(format!("Views written to {}", config.output.dir.display()));
    Ok(())
}

/// Rewrites the usage override dictionary, from the catalog or, with
/// `from_sources`, from the BNV-D exports in `[reference] usage_sources`.
///
/// # Errors
///
/// Returns an error if no override path is configured, the catalog or a
/// required export cannot be loaded, or the file cannot be written.
pub fn build_usage_dictionary(
    config: &Config,
    tables: &ReferenceTables,
    out: Option<&Path>,
    from_sources: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = out
        .or(config.reference.usage_overrides.as_deref())
        .ok_or("No output path: pass --out or set reference.usage_overrides")?;

    let written = if from_sources {
        phyto_map_substance::write_usage_dictionary_from_sources(
            &config.reference.usage_sources,
            path,
        )?
    } else {
        let catalog = tables.catalog.get()?;
        phyto_map_substance::write_usage_dictionary(&catalog, path)?
    };
    println!("Wrote {written} usage entries to {}", path.display());

    if config.reference.usage_overrides.as_deref() == Some(path) {
        tables.usage_overrides.invalidate();
    }
    Ok(())
}

/// Prints each reference table and input with its configured path and
/// whether the file exists.
pub fn print_sources(config: &Config) {
    println!("{:<18} {:<8} PATH", "TABLE", "STATUS");
    println!("{}", "-".repeat(60));

    let paths = config.reference.paths();
    let inputs = [
        ("usage_sources", Some(config.reference.usage_sources.as_path())),
        ("surface", config.input.surface.as_deref()),
        ("groundwater", config.input.groundwater.as_deref()),
    ];

    for (name, path) in paths.entries().into_iter().chain(inputs) {
        let (status, shown) = match path {
            Some(path) if path.exists() => ("present", path.display().to_string()),
            Some(path) => ("missing", path.display().to_string()),
            None => ("unset", String::new()),
        };
        println!("{name:<18} {status:<8} {shown}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use phyto_map_reference::catalog::parse_catalog;
    use serde_json::json;

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("phyto_map_cli_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn absent_inputs_read_as_empty() {
        let records: Vec<SurfaceWaterRecord> = read_records("surface", None).unwrap();
        assert!(records.is_empty());

        let records: Vec<SurfaceWaterRecord> =
            read_records("surface", Some(Path::new("/nonexistent/naiades.json"))).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn malformed_inputs_are_errors() {
        let dir = temp_dir("malformed_input");
        let path = dir.join("ades.json");
        std::fs::write(&path, r#"{"data": "nope"}"#).unwrap();

        let result: Result<Vec<GroundwaterRecord>, _> = read_records("groundwater", Some(&path));
        assert!(result.is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn recent_years_sets_the_window_start() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        let mut config = Config::default();
        assert_eq!(build_options(&config, today).sampled_since, None);

        config.input.recent_years = Some(1);
        config.input.max_records_per_source = 10;
        let options = build_options(&config, today);
        assert_eq!(options.sampled_since, NaiveDate::from_ymd_opt(2025, 10, 18));
        assert_eq!(options.max_records_per_source, 10);
    }

    #[test]
    fn usage_dictionary_from_sources_writes_regulatory_columns() {
        let dir = temp_dir("usage_sources");
        let mut config = Config::default().resolved_against(&dir);
        std::fs::create_dir_all(&config.reference.usage_sources).unwrap();
        std::fs::write(
            config.reference.usage_sources.join("substances_identification.csv"),
            "id_bnvd;code_parametre_sandre;cas_parametre_sandre\nB1;1105;61-82-5\n",
        )
        .unwrap();
        std::fs::write(
            config.reference.usage_sources.join("substances_fonctions.csv"),
            "id_bnvd;herbicide\nB1;true\n",
        )
        .unwrap();
        config.reference.usage_overrides = Some(dir.join("ppp_usages.csv"));

        let tables = ReferenceTables::in_memory(parse_catalog(r#"{"apercu": []}"#).unwrap());
        build_usage_dictionary(&config, &tables, None, true).unwrap();

        let text = std::fs::read_to_string(dir.join("ppp_usages.csv")).unwrap();
        assert!(text.starts_with("code_parametre;cas;ppp_usage;ppp_usages_typiques;statut_ue"));
        assert!(text.contains("1105;61-82-5;herbicide;"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn build_then_views_end_to_end() {
        let dir = temp_dir("end_to_end");
        let surface = dir.join("naiades.json");
        std::fs::write(
            &surface,
            json!([
                {
                    "code_station": "06012000",
                    "libelle_station": "L'Ouche à Dijon",
                    "code_commune": "21231",
                    "libelle_commune": "Dijon",
                    "code_departement": "21",
                    "code_parametre": "1105",
                    "resultat": 0.35,
                    "symbole_unite": "µg/L",
                    "date_prelevement": "2021-06-03",
                    "longitude": 5.04,
                    "latitude": 47.32
                },
                {
                    "code_station": "06400000",
                    "libelle_station": "Le Doubs à Besançon",
                    "code_commune": "25056",
                    "code_departement": "25",
                    "code_parametre": "1105",
                    "resultat": 0.5,
                    "symbole_unite": "µg/L",
                    "date_prelevement": "2021-06-03",
                    "longitude": 6.02,
                    "latitude": 47.24
                }
            ])
            .to_string(),
        )
        .unwrap();

        let mut config = Config::default().resolved_against(&dir);
        config.input.surface = Some(surface);

        let catalog = parse_catalog(
            r#"{"apercu": [{"code_parametre_sandre": "1105", "libelle_parametre_sandre": "Aminotriazole", "libelle_ephy": "Herbicide"}]}"#,
        )
        .unwrap();
        let tables = ReferenceTables::in_memory(catalog);
        let multi = MultiProgress::new();

        let features = build(&config, &tables, &multi).unwrap();
        assert_eq!(features.len(), 1);

        views(&config, None, &multi).unwrap();
        assert!(config.output.ranking().exists());
        assert!(config.output.rollup().exists());

        let hotspots: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(config.output.hotspots()).unwrap())
                .unwrap();
        assert_eq!(hotspots["features"].as_array().unwrap().len(), 1);
        assert_eq!(hotspots["features"][0]["properties"]["substance"], "Aminotriazole");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
