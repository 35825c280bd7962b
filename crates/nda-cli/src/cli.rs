//! CLI argument definitions for the BIDS to NDA converter.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use nda_model::SubjectStrictness;

#[derive(Parser)]
#[command(
    name = "bids2nda",
    version,
    about = "Convert a BIDS dataset into an NDA image03 submission",
    long_about = "Convert a BIDS dataset into an NDA image03 submission.\n\n\
                  Writes image03.txt plus one metadata archive per scan that\n\
                  carries sidecar metadata, task events or diffusion gradients."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Show GUIDs and other participant values in logs and reports.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert a BIDS dataset and write image03.txt.
    Convert(ConvertArgs),

    /// Check a GUID mapping file and summarize its entries.
    VerifyGuid(VerifyGuidArgs),

    /// List the supported scan suffixes and their NDA scan types.
    ScanTypes,
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Root of the BIDS dataset.
    #[arg(value_name = "BIDS_DIRECTORY")]
    pub bids_dir: PathBuf,

    /// File with one `<participant_id> - <GUID>` entry per line.
    #[arg(value_name = "GUID_MAPPING")]
    pub guid_mapping: PathBuf,

    /// Directory for image03.txt and the metadata archives.
    #[arg(value_name = "OUTPUT_DIRECTORY")]
    pub output_dir: PathBuf,

    /// How to treat participants without a GUID.
    #[arg(long = "strictness", value_enum, default_value = "strict")]
    pub strictness: StrictnessArg,

    /// Leave failing scans out of the table instead of aborting.
    ///
    /// Unmapped scan suffixes and unknown header units still abort.
    #[arg(long = "skip-failed-scans")]
    pub skip_failed_scans: bool,

    /// Process scans in parallel. Row order is unaffected.
    #[arg(long = "parallel")]
    pub parallel: bool,
}

#[derive(Args)]
pub struct VerifyGuidArgs {
    /// GUID mapping file to check.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StrictnessArg {
    /// Abort when a participant has no GUID.
    Strict,
    /// Warn and continue without unmapped participants.
    Warn,
    /// Continue without unmapped participants.
    Ignore,
}

impl From<StrictnessArg> for SubjectStrictness {
    fn from(arg: StrictnessArg) -> Self {
        match arg {
            StrictnessArg::Strict => Self::Strict,
            StrictnessArg::Warn => Self::Warn,
            StrictnessArg::Ignore => Self::Ignore,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
