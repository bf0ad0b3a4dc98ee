#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `phyto_map`: pesticide water-quality layers for one French department.
//!
//! Reads Naïades and ADES analyses, normalizes them against the substance
//! and threshold reference tables, and writes a `GeoJSON` impact layer plus
//! ranking, hotspot, and yearly rollup views.

mod config;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use phyto_map_reference::ReferenceTables;

use crate::config::{Config, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "phyto_map", about = "Pesticide water-quality mapping pipeline")]
struct Cli {
    /// Path to the TOML configuration
    #[arg(long, global = true, env = "PHYTO_MAP_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override `[department] code`
    #[arg(long, global = true)]
    department: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw analyses into the impact layer
    Build {
        /// Override `[input] max_records_per_source`
        #[arg(long)]
        limit: Option<usize>,

        /// Override `[input] recent_years`
        #[arg(long)]
        years: Option<u32>,
    },
    /// Derive the ranking, hotspot, and rollup views from the impact layer
    Views,
    /// Build the impact layer, then derive the views
    Run {
        /// Override `[input] max_records_per_source`
        #[arg(long)]
        limit: Option<usize>,

        /// Override `[input] recent_years`
        #[arg(long)]
        years: Option<u32>,
    },
    /// Rewrite the usage override CSV from the catalog
    BuildUsageDict {
        /// Output path (defaults to `[reference] usage_overrides`)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Read the BNV-D exports in `[reference] usage_sources` instead,
        /// adding regulatory and hazard columns
        #[arg(long)]
        from_sources: bool,
    },
    /// List reference tables and inputs with their status
    Sources,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = phyto_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    if let Some(department) = cli.department {
        config.department.code = department;
    }

    let tables = ReferenceTables::from_paths(&config.reference.paths());

    match cli.command {
        Commands::Build { limit, years } => {
            apply_input_overrides(&mut config, limit, years);
            pipeline::build(&config, &tables, &multi)?;
        }
        Commands::Views => pipeline::views(&config, None, &multi)?,
        Commands::Run { limit, years } => {
            apply_input_overrides(&mut config, limit, years);
            let features = pipeline::build(&config, &tables, &multi)?;
            pipeline::views(&config, Some(features), &multi)?;
        }
        Commands::BuildUsageDict { out, from_sources } => {
            pipeline::build_usage_dictionary(&config, &tables, out.as_deref(), from_sources)?;
        }
        Commands::Sources => pipeline::print_sources(&config),
    }

    Ok(())
}

const fn apply_input_overrides(config: &mut Config, limit: Option<usize>, years: Option<u32>) {
    if let Some(limit) = limit {
        config.input.max_records_per_source = limit;
    }
    if years.is_some() {
        config.input.recent_years = years;
    }
}
