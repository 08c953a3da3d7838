// src/main.rs

mod cli;

use aip2dip::{Config, PackageAssembler};
use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit code for bad invocations and invalid input/output directories
const EXIT_USAGE: u8 = 2;
/// Exit code for failed conversions
const EXIT_FAILURE: u8 = 1;

/// Initialize tracing, honouring RUST_LOG over the configured level
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create log directory: {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(mode) = cli.mode {
        config.conversion.mode = mode;
    }
    if let Some(name) = &cli.metadata_file {
        config.conversion.metadata_file = name.clone();
    }
    if let Some(file) = &cli.log_file {
        config.logging.file = Some(file.clone());
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli, config: &Config) -> aip2dip::Result<String> {
    let assembler = PackageAssembler::new(config.conversion_options());
    let result = assembler.convert(&cli.input, &cli.output)?;
    info!(
        "Created {} ({} files copied)",
        result.package_dir.display(),
        result.replication.files
    );
    Ok(result.package_id)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if let Err(e) = init_logging(&config.logging.level, config.logging.file.as_deref()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(EXIT_FAILURE);
    }

    match run(&cli, &config) {
        Ok(package_id) => {
            println!("{}", package_id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            if config.logging.file.is_some() {
                error!("{}", e);
            }
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
