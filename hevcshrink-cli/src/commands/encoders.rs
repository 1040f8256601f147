//! Implementation of the 'encoders' subcommand.

use crate::commands::encode::RunOptions;
use crate::error::CliResult;
use crate::logging;
use crate::terminal::TerminalReporter;

use hevcshrink_core::external::check_dependency;
use hevcshrink_core::hardware::{EncoderSelection, HevcEncoder, detect_encoders, select_encoder};
use hevcshrink_core::progress_reporting as report;

/// One output line per known encoder.
fn describe(
    encoder: HevcEncoder,
    available: &[HevcEncoder],
    auto: Option<HevcEncoder>,
) -> (String, String) {
    let state = if !available.contains(&encoder) {
        "not available"
    } else if auto == Some(encoder) {
        "available (auto)"
    } else {
        "available"
    };
    (
        encoder.as_ffmpeg_codec().to_string(),
        format!("{} - {}", state, encoder.description()),
    )
}

/// Lists the HEVC encoders the local ffmpeg provides and which one `auto` picks.
pub fn run_encoders(options: RunOptions) -> CliResult<()> {
    logging::init_logging(options.verbose, options.color, None)?;
    report::set_progress_reporter(Box::new(TerminalReporter::new()));

    check_dependency("ffmpeg")?;
    let available = detect_encoders()?;
    let auto = select_encoder(EncoderSelection::Auto, &available, false).ok();

    report::section("HEVC encoders");
    for encoder in HevcEncoder::ALL {
        let (name, detail) = describe(encoder, &available, auto);
        report::status(&name, &detail, auto == Some(encoder));
    }
    if auto.is_none() {
        report::warning("No hardware encoder found; use --allow-software for libx265");
    }
    Ok(())
}
