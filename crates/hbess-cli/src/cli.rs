use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hbess", author, version, about = "Hybrid battery pack sizing", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Size a hybrid pack from a scenario file
    Size {
        /// Scenario TOML (cells, profiles, options, solver, run)
        #[arg(long, value_hint = ValueHint::FilePath)]
        scenario: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,

        /// Write per-profile time series CSVs of the final design here
        #[arg(long, value_hint = ValueHint::DirPath)]
        series_dir: Option<PathBuf>,
    },
    /// Load profile utilities
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Show the built-in cell presets, or the cells in a file
    Cells {
        /// Cell pair file (TOML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Summarize a load profile CSV
    Inspect {
        #[arg(value_hint = ValueHint::FilePath)]
        csv: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
