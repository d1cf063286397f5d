//! CLI argument definitions for doubles

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doubles")]
#[command(about = "Find unlisted common-proper-motion double stars")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Partition raw UCAC4 zones into square-degree buckets
    Partition(PartitionArgs),

    /// Search partitioned buckets for unlisted pairs
    Search(SearchArgs),

    /// Summarise a partitioned bucket directory
    Info(InfoArgs),
}

#[derive(Parser)]
pub struct PartitionArgs {
    /// Directory holding UCAC4 zone files (z001..z900, optionally .gz)
    #[arg(long)]
    pub catalog: PathBuf,

    /// Output directory for bucket files and the candidate list
    #[arg(long)]
    pub output: PathBuf,

    /// First zone to read
    #[arg(long, default_value = "1")]
    pub first_zone: u16,

    /// Last zone to read (inclusive)
    #[arg(long, default_value = "900")]
    pub last_zone: u16,

    /// Delete existing bucket files in the output directory first
    #[arg(long)]
    pub clean: bool,

    /// JSON config file with threshold overrides
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Candidate primary magnitude limit, thousandths (overrides config)
    #[arg(long)]
    pub candidate_mag: Option<i32>,

    /// Faintest magnitude stored, thousandths (overrides config)
    #[arg(long)]
    pub save_mag: Option<i32>,

    /// Border margin for replication, arcseconds (overrides config)
    #[arg(long)]
    pub margin_arcsec: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Html,
    Csv,
    Json,
}

#[derive(Parser)]
pub struct SearchArgs {
    /// Directory produced by `partition`
    #[arg(long)]
    pub regions: PathBuf,

    /// Reference catalog (WDS summary or precise-coordinate lines)
    #[arg(long)]
    pub reference: PathBuf,

    /// Report output path
    #[arg(long)]
    pub output: PathBuf,

    /// Report format
    #[arg(long, value_enum, default_value = "html")]
    pub format: ReportFormat,

    /// JSON config file with threshold overrides
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Primary magnitude limit, thousandths
    #[arg(long)]
    pub primary_mag: Option<i32>,

    /// Secondary magnitude limit, thousandths
    #[arg(long)]
    pub secondary_mag: Option<i32>,

    /// Largest magnitude difference, thousandths
    #[arg(long)]
    pub max_mag_diff: Option<i32>,

    /// Minimum separation, arcseconds
    #[arg(long)]
    pub min_sep: Option<f64>,

    /// Maximum separation, arcseconds
    #[arg(long)]
    pub max_sep: Option<f64>,

    /// Minimum mean proper motion, mas/yr
    #[arg(long)]
    pub min_pm: Option<f64>,

    /// Minimum mean-to-half-difference proper-motion ratio
    #[arg(long)]
    pub min_pm_ratio: Option<f64>,

    /// Stop after this many results
    #[arg(long)]
    pub max_results: Option<usize>,
}

#[derive(Parser)]
pub struct InfoArgs {
    /// Directory produced by `partition`
    #[arg(long)]
    pub regions: PathBuf,
}
