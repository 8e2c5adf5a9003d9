//! CLI argument definitions.

use crate::source::DelayReference;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Sample-accurate random access to decoded audio.
#[derive(Debug, Parser)]
#[command(name = "audiosource")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the properties of an audio track.
    Info(InfoArgs),
    /// Decode a sample range to a WAV or raw PCM file.
    Extract(ExtractArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Options shared by every command that opens a source.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct SourceArgs {
    /// Media file to open.
    pub input: PathBuf,

    /// Track index (-1 picks the first audio track).
    #[arg(short, long, allow_hyphen_values = true, env = "AUDIOSOURCE_TRACK")]
    pub track: Option<i64>,

    /// Delay adjustment in samples; positive values skip into the stream.
    #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
    pub delay: i64,

    /// Align the audio with another track's start time ("earliest" or an index).
    #[arg(long, value_name = "REF", num_args = 0..=1, default_missing_value = "earliest")]
    pub auto_delay: Option<DelayReference>,

    /// Decode the whole track to establish the exact sample count.
    #[arg(long)]
    pub exact: bool,

    /// Follow references to other files.
    #[arg(long)]
    pub enable_drefs: bool,

    /// Resolve a relative input path against the working directory.
    #[arg(long)]
    pub absolute_paths: bool,

    /// Dynamic range compression scale.
    #[arg(long, value_parser = parse_drc_scale)]
    pub drc_scale: Option<f32>,
}

/// Arguments for the info command.
#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Source selection.
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print properties as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the extract command.
#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Source selection.
    #[command(flatten)]
    pub source: SourceArgs,

    /// First output sample (negative values read leading silence).
    #[arg(short, long, allow_hyphen_values = true, default_value_t = 0)]
    pub start: i64,

    /// Number of samples to extract (default: to the end of the track).
    #[arg(short = 'n', long, value_parser = clap::value_parser!(i64).range(1..))]
    pub count: Option<i64>,

    /// Output file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write interleaved raw PCM instead of WAV.
    #[arg(long)]
    pub raw: bool,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

/// Parse and validate a DRC scale.
fn parse_drc_scale(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !value.is_finite() || value < 0.0 {
        return Err(format!("drc scale must be a non-negative number, got {value}"));
    }

    Ok(value)
}
