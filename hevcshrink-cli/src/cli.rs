// hevcshrink-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand};
use hevcshrink_core::config::{
    BitrateMultiplier, DEFAULT_ENCODER_PRESET, DEFAULT_PROCESSED_MARKER, DeletionPolicy,
};
use hevcshrink_core::hardware::EncoderSelection;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "hevcshrink: batch H.265 re-encoding at a fraction of the source bitrate",
    long_about = "Scans a directory for video files and re-encodes each one to HEVC with \
                  ffmpeg at a multiple of its original bitrate, optionally removing originals."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Re-encodes every video file in a directory to HEVC
    Encode(EncodeArgs),
    /// Lists the HEVC encoders available in the local ffmpeg build
    Encoders,
}

#[derive(Parser, Debug)]
pub struct EncodeArgs {
    /// Directory to scan (prompted for when omitted on a terminal)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Target bitrate as a multiple of the source bitrate (0.1 - 10.0, default 0.75),
    /// or a preset: highest, high, medium, low, lowest
    #[arg(
        short,
        long,
        value_name = "M",
        env = "HEVCSHRINK_MULTIPLIER",
        value_parser = parse_multiplier
    )]
    pub multiplier: Option<f64>,

    /// Only scan the top level of DIR
    #[arg(long)]
    pub no_recursive: bool,

    /// What to do with originals after a successful encode
    #[arg(long, value_name = "POLICY", default_value_t = DeletionPolicy::Never)]
    pub delete_originals: DeletionPolicy,

    /// HEVC encoder to use (auto, nvenc, amf, qsv, vaapi, videotoolbox, x265)
    #[arg(long, value_name = "ENCODER", default_value = "auto")]
    pub encoder: EncoderSelection,

    /// Fall back to libx265 when no hardware encoder is found
    #[arg(long)]
    pub allow_software: bool,

    /// Encoder preset for encoders that take one
    #[arg(long, value_name = "NAME", default_value = DEFAULT_ENCODER_PRESET)]
    pub preset: String,

    /// Suffix appended to encoded file names
    #[arg(long, value_name = "TEXT", default_value = DEFAULT_PROCESSED_MARKER)]
    pub marker: String,

    /// Directory for log files (defaults to DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Write the batch summary as JSON to FILE
    #[arg(long, value_name = "FILE")]
    pub json_summary: Option<PathBuf>,

    /// Never prompt; missing values are errors or defaults
    #[arg(long)]
    pub non_interactive: bool,
}

/// Accepts a preset name or a number and rejects out-of-range values at parse time.
fn parse_multiplier(s: &str) -> Result<f64, String> {
    s.parse::<BitrateMultiplier>()
        .map(BitrateMultiplier::value)
        .map_err(|e| e.to_string())
}
