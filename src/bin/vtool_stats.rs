// src/bin/vtool_stats.rs
//! Command-line driver: compute, combine and inspect stats files

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vtool_core::config::{ConfigLoader, VtoolConfig};
use vtool_core::io::{load_collected_signals, load_stats_file, save_stats_file};
use vtool_core::processing::{combine_stats_files, compute_stats_array, StatsInput};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compute binned statistics of one or more collected-signals files
    Compute {
        /// Input as NAME=PATH; the first one supplies times and file names
        #[arg(short, long = "input", value_parser = parse_input, required = true)]
        inputs: Vec<(String, PathBuf)>,

        /// Reference array name (defaults to the first input)
        #[arg(long)]
        reference: Option<String>,

        /// Skip PSD statistics
        #[arg(long)]
        no_spectral: bool,

        /// Keep per-case arrays in the output
        #[arg(long)]
        include_data: bool,

        #[arg(short, long, default_value = "stats.json")]
        output: PathBuf,
    },
    /// Combine stats files computed over disjoint bins
    Combine {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = "combined_stats.json")]
        output: PathBuf,
    },
    /// Validate a collected-signals file and print its layout
    Check { file: PathBuf },
    /// Write the effective configuration as TOML
    ExportConfig { output: PathBuf },
}

fn parse_input(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok((name.to_string(), PathBuf::from(path))),
        Some(_) => Err(format!("expected NAME=PATH, got '{}'", arg)),
        None => {
            let stem = Path::new(arg)
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| format!("cannot derive an array name from '{}'", arg))?;
            Ok((stem.to_string(), PathBuf::from(arg)))
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<(ConfigLoader, VtoolConfig)> {
    let loader = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} not found", path.display());
            }
            ConfigLoader::with_paths(vec![path.clone()])
        }
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("failed to load configuration")?;
    Ok((loader, config))
}

fn main() -> anyhow::Result<()> {
    // honours RUST_LOG through the env-filter feature
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let about = vtool_core::version_info();
    debug!(name = %about.name, version = %about.version, "starting");
    let (loader, mut config) = load_config(&cli)?;

    match cli.command {
        Command::Compute { inputs, reference, no_spectral, include_data, output } => {
            let mut input: Option<StatsInput> = None;
            for (name, path) in &inputs {
                let collected = load_collected_signals(path)
                    .with_context(|| format!("failed to load {}", path.display()))?;
                input = Some(match input {
                    None => StatsInput::from_collected(name, collected),
                    Some(acc) => acc.with_array(name, collected.signals),
                });
            }
            let Some(input) = input else {
                bail!("no input files");
            };

            if reference.is_some() {
                config.stats.reference = reference;
            }
            if no_spectral {
                config.stats.spectral = false;
            }
            config.stats.include_data |= include_data;

            let result = compute_stats_array(&input, &config.stats, &config.analysis)?;
            save_stats_file(&output, &result).with_context(|| format!("failed to write {}", output.display()))?;
            info!(output = %output.display(), arrays = result.stats.len(), bins = result.info.n_bins(), "stats written");
        }
        Command::Combine { files, output } => {
            let loaded = files
                .iter()
                .map(|path| load_stats_file(path).with_context(|| format!("failed to load {}", path.display())))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let combined = combine_stats_files(&loaded)?;
            save_stats_file(&output, &combined).with_context(|| format!("failed to write {}", output.display()))?;
            info!(output = %output.display(), cases = combined.info.n_cases(), "combined stats written");
        }
        Command::Check { file } => {
            let collected = load_collected_signals(&file)
                .with_context(|| format!("{} is not a valid collected-signals file", file.display()))?;
            let names = collected.signals.get(0).map(|g| g.primary_names()).unwrap_or_default();
            println!("cases:   {}", collected.len());
            println!("signals: {}", names.join(", "));
            println!("times:   {}", if collected.times.is_some() { "present" } else { "absent" });
        }
        Command::ExportConfig { output } => {
            loader.export_config(&config, &output)?;
            info!(output = %output.display(), "configuration exported");
        }
    }
    Ok(())
}
