//! `cybertrack` command-line front end.
//!
//! # Responsibility
//! - Parse flags/env into a runtime config and dispatch one command.
//! - Own the file export/import surface of the core.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use cybertrack_core::db::DEFAULT_DB_FILE;
use cybertrack_core::geo::nominatim::DEFAULT_BASE_URL;
use cybertrack_core::{ExportFormat, Rank};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cybertrack",
    about = "Record, filter and exchange GPS targets",
    version,
    propagate_version = true
)]
struct Cli {
    /// SQLite database file holding the target collection
    #[arg(long, global = true, env = "CYBERTRACK_DB", default_value = DEFAULT_DB_FILE)]
    db: PathBuf,

    /// Absolute directory for rolling log files (logging is off when unset)
    #[arg(long, global = true, env = "CYBERTRACK_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true, env = "CYBERTRACK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Skip network lookups; every region resolves to "Unknown"
    #[arg(long, global = true)]
    offline: bool,

    /// Nominatim base URL for region lookup and place search
    #[arg(long, global = true, env = "CYBERTRACK_NOMINATIM_URL", default_value = DEFAULT_BASE_URL)]
    nominatim_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List targets, optionally filtered by rank and region
    List {
        #[arg(long, value_parser = parse_rank)]
        rank: Option<Rank>,
        #[arg(long)]
        region: Option<String>,
    },

    /// Record a target at a coordinate
    Add {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lng: f64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long, value_parser = parse_rank)]
        rank: Option<Rank>,
        /// Skip the reverse lookup and use this region
        #[arg(long)]
        region: Option<String>,
    },

    /// Change name, note, rank or region of a target
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        note: Option<String>,
        #[arg(long, value_parser = parse_rank)]
        rank: Option<Rank>,
        #[arg(long)]
        region: Option<String>,
    },

    /// Delete a target
    Remove { id: String },

    /// Write all targets to `gps-targets-<date>.<ext>`
    Export {
        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,
        /// Output directory or file (default: current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Merge targets from a .json or .csv file
    Import { file: PathBuf },

    /// List distinct regions
    Regions,

    /// Look up a place by name
    Search {
        query: String,
        /// Record the first hit as a target
        #[arg(long)]
        add: bool,
    },

    /// Replay a recorded track (`lat,lng` per line) through a tracking session
    Track {
        #[arg(long)]
        replay: PathBuf,
        /// Record the final position as a target
        #[arg(long)]
        mark: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => ExportFormat::Structured,
            FormatArg::Csv => ExportFormat::Tabular,
        }
    }
}

fn parse_rank(raw: &str) -> Result<Rank, String> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("rank must be a number between 1 and 4, got `{raw}`"))?;
    Rank::try_from(value).map_err(|err| err.to_string())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = commands::run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
