// ============================================================================
// hevcshrink-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: fern dispatch to console and run log file
//
// Everything the application reports, including the terminal UI rendered by
// `terminal.rs`, goes through the `log` facade. The console receives info
// messages verbatim and prefixes warnings and errors; the run log receives
// every record with a timestamp and without ANSI escapes.

use crate::cli_error;
use crate::error::{CliErrorContext, CliResult};

use log::{Level, LevelFilter};
use owo_colors::OwoColorize;

use std::fs;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// File name of the log for a run started now.
pub fn run_log_filename() -> String {
    format!("hevcshrink_run_{}.log", get_timestamp())
}

fn level_filter(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn console_line(level: Level, message: &str, color: bool) -> String {
    match (level, color) {
        (Level::Info, _) => message.to_string(),
        (Level::Error, true) => format!("{} {}", "error:".red().bold(), message),
        (Level::Warn, true) => format!("{} {}", "warning:".yellow().bold(), message),
        (_, true) => format!("{}", message.dimmed()),
        (Level::Error, false) => format!("error: {message}"),
        (Level::Warn, false) => format!("warning: {message}"),
        (_, false) => message.to_string(),
    }
}

fn console_dispatch(color: bool) -> fern::Dispatch {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let line = console_line(record.level(), &message.to_string(), color);
            out.finish(format_args!("{line}"))
        })
        .chain(std::io::stdout())
}

/// Installs the global logger.
///
/// With `log_dir` set, the directory is created and a timestamped run log is
/// opened inside it; its path is returned.
pub fn init_logging(verbose: bool, color: bool, log_dir: Option<&Path>) -> CliResult<Option<PathBuf>> {
    let mut dispatch = fern::Dispatch::new()
        .level(level_filter(verbose))
        .level_for("ffmpeg_sidecar", LevelFilter::Warn)
        .chain(console_dispatch(color));

    let mut log_path = None;
    if let Some(dir) = log_dir {
        fs::create_dir_all(dir)
            .cli_with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;
        let path = dir.join(run_log_filename());
        let file = fern::log_file(&path)
            .cli_with_context(|| format!("Failed to open log file '{}'", path.display()))?;

        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let plain = strip_ansi_escapes::strip_str(message.to_string());
                    out.finish(format_args!(
                        "[{} {:<5} {}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        record.target(),
                        plain
                    ))
                })
                .chain(file),
        );
        log_path = Some(path);
    }

    dispatch
        .apply()
        .map_err(|e| cli_error!("Failed to initialise logging: {}", e))?;
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_log_filename_shape() {
        let name = run_log_filename();
        assert!(name.starts_with("hevcshrink_run_"));
        assert!(name.ends_with(".log"));
        let stamp = &name["hevcshrink_run_".len()..name.len() - 4];
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
    }

    #[test]
    fn test_console_line_plain() {
        assert_eq!(console_line(Level::Info, "  ✓ done", false), "  ✓ done");
        assert_eq!(console_line(Level::Warn, "slow", false), "warning: slow");
        assert_eq!(console_line(Level::Error, "boom", false), "error: boom");
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(false), LevelFilter::Info);
        assert_eq!(level_filter(true), LevelFilter::Debug);
    }
}
