// src/cli.rs
//! CLI definitions for aip2dip
//!
//! Argument parsing only; the conversion itself lives in the library.

use aip2dip::ExclusionMode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aip2dip")]
#[command(author = "aip2dip Contributors")]
#[command(version)]
#[command(about = "Convert an E-ARK AIP into a DIP", long_about = None)]
pub struct Cli {
    /// AIP directory (must contain a representations directory)
    #[arg(short, long, value_name = "AIP_DIR")]
    pub input: PathBuf,

    /// Directory the DIP is created in (created if missing)
    #[arg(short, long, value_name = "OUTPUT_DIR")]
    pub output: PathBuf,

    /// Substructures to leave out of the DIP (default: submission)
    #[arg(short, long, value_enum)]
    pub mode: Option<ExclusionMode>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append log output to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// File name of the package-root METS document
    #[arg(long, value_name = "NAME")]
    pub metadata_file: Option<String>,
}
