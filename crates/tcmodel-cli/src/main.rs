//! # TCModel CLI
//!
//! Command-line interface for building the thalamocortical column tables.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tcmodel_core::{load_config, ModelConfig};
use tcmodel_network::{
    build_network, describe_populations, ColumnSpec, LayerBands, PopulationModel,
};
use tcmodel_synparams::ParameterTables;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tcmodel")]
#[command(author = "Yatrogenesis")]
#[command(version = "0.1.0")]
#[command(about = "Thalamocortical column network builder", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Parameter tables (structured JSON)
    #[arg(long, conflicts_with = "legacy_params")]
    params: Option<PathBuf>,

    /// Parameter tables (flat legacy key/value JSON)
    #[arg(long)]
    legacy_params: Option<PathBuf>,

    /// Column definition (JSON)
    #[arg(long)]
    column: Option<PathBuf>,

    /// Full-size network, ignoring testing mode
    #[arg(long)]
    full: bool,
}

impl Inputs {
    fn apply_to(&self, config: &mut ModelConfig) {
        if self.full {
            config.testing = false;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Derive every table and write them as JSON
    Build {
        #[command(flatten)]
        inputs: Inputs,

        /// Output directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print the population table
    Populations {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// Print the connection probability matrix
    Probabilities {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// Validate configuration and tables without writing anything
    Check {
        #[command(flatten)]
        inputs: Inputs,
    },
}

fn init_logging(config: &ModelConfig, verbose: bool) {
    let level = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_tables(inputs: &Inputs) -> Result<ParameterTables> {
    match (&inputs.params, &inputs.legacy_params) {
        (Some(path), _) => ParameterTables::from_json_file(path)
            .with_context(|| format!("loading parameter tables from {}", path.display())),
        (None, Some(path)) => {
            let import = ParameterTables::from_legacy_json_file(path)
                .with_context(|| format!("importing legacy parameters from {}", path.display()))?;
            if !import.skipped.is_empty() {
                println!(
                    "{} {} legacy keys skipped",
                    "warning:".yellow().bold(),
                    import.skipped.len()
                );
            }
            Ok(import.tables)
        }
        (None, None) => ParameterTables::traub2005().context("loading built-in parameter tables"),
    }
}

fn load_column(path: Option<&Path>) -> Result<ColumnSpec> {
    match path {
        Some(path) => ColumnSpec::from_json_file(path)
            .with_context(|| format!("loading column from {}", path.display())),
        None => Ok(ColumnSpec::traub2005()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&config, cli.verbose);
    debug!(target: "tcmodel", "Configuration: {:?}", config);

    match cli.command {
        Commands::Build { inputs, out } => {
            inputs.apply_to(&mut config);
            let tables = load_tables(&inputs)?;
            let column = load_column(inputs.column.as_deref())?;

            let network = build_network(&config, &column, &tables)?;
            let dir = out.unwrap_or_else(|| config.output_paths().output.join("network"));
            let written = network
                .write_tables(&dir)
                .with_context(|| format!("writing tables to {}", dir.display()))?;

            println!("{} {}", "Network tables written to".green().bold(), dir.display());
            for path in written {
                println!("  {}", path.display());
            }
        }

        Commands::Populations { inputs } => {
            inputs.apply_to(&mut config);
            let column = load_column(inputs.column.as_deref())?;
            let model = PopulationModel::for_config(&config, &column)?;
            let bands = LayerBands::from_boundaries(&config.layer_boundaries)?;
            let entries = describe_populations(&model, &bands, config.v_init)?;

            println!(
                "{}",
                format!("{:<14} {:<5} {:>6}  {:<18} {}", "population", "class", "cells", "depth (um)", "template")
                    .green()
                    .bold()
            );
            for entry in entries {
                let depth = format!("{:.1}-{:.1}", entry.y_range[0], entry.y_range[1]);
                println!(
                    "{:<14} {:<5} {:>6}  {:<18} {}",
                    entry.id.cyan(),
                    entry.cell_type.label(),
                    entry.num_cells,
                    depth,
                    entry.template
                );
            }
        }

        Commands::Probabilities { inputs } => {
            inputs.apply_to(&mut config);
            let column = load_column(inputs.column.as_deref())?;
            let model = PopulationModel::for_config(&config, &column)?;
            let probabilities = model.connection_probabilities();

            println!("{}", "Connection probabilities (pre rows, post columns):".green().bold());
            for (pre, row) in model.populations().iter().zip(probabilities.rows()) {
                let cells: Vec<String> = row.iter().map(|p| format!("{:6.3}", p)).collect();
                println!("{:<14} {}", pre.id.cyan(), cells.join(" "));
            }
        }

        Commands::Check { inputs } => {
            inputs.apply_to(&mut config);
            let tables = load_tables(&inputs)?;
            let column = load_column(inputs.column.as_deref())?;

            let mismatches = tables.audit();
            let network = build_network(&config, &column, &tables)?;

            println!("{}", "Configuration OK".green().bold());
            println!(
                "  tables:      {} synapse entries, {} compartment lists, {} gap templates",
                tables.synapse_count(),
                tables.compartment_list_count(),
                tables.gap_template_count()
            );
            println!("  populations: {}", network.populations.len());
            println!(
                "  mechanisms:  {} ({} gap junction)",
                network.mechanisms.len(),
                network.gap_mechanism_count()
            );
            println!("  rules:       {} ({} gap junction)", network.rules.len(), network.gap_rule_count());
            if !mismatches.is_empty() {
                println!("{} {} compartment count mismatches", "warning:".yellow().bold(), mismatches.len());
                for m in &mismatches {
                    println!("  {}: declared {}, listed {}", m.pair, m.declared, m.listed);
                }
            }
        }
    }

    Ok(())
}
