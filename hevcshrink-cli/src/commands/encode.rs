//! Implementation of the 'encode' subcommand.
//!
//! Resolves the directory and multiplier (prompting on a terminal), sets up
//! logging, builds the core configuration and, once the operator has agreed
//! to the file list, runs the batch through a core `Orchestrator`. Ctrl-C
//! stops the batch; a second Ctrl-C exits at once. The summary is printed at
//! the end and optionally written as JSON.

use crate::cli::EncodeArgs;
use crate::cli_error;
use crate::error::{CliErrorContext, CliResult};
use crate::logging;
use crate::prompt::{self, TerminalConfirmer};
use crate::terminal::TerminalReporter;

use hevcshrink_core::config::{BitrateMultiplier, CoreConfig, CoreConfigBuilder, DeletionPolicy};
use hevcshrink_core::external::{CrateFfprobeExecutor, SidecarSpawner, StdFsMetadataProvider};
use hevcshrink_core::processing::{
    CancelFlag, DeletionConfirmer, FfmpegTranscoder, NeverConfirm, Orchestrator,
};
use hevcshrink_core::progress_reporting as report;
use hevcshrink_core::{BatchSummary, CoreError, find_processable_files, format_bytes, format_duration};

use console::Term;
use log::{debug, info, warn};

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Global options that affect every command.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub verbose: bool,
    pub color: bool,
}

/// Checks a directory given on the command line before anything is created.
fn validate_directory_arg(dir: &Path) -> CliResult<PathBuf> {
    if !dir.exists() {
        return Err(CoreError::NotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(cli_error!("{} is not a directory", dir.display()));
    }
    std::path::absolute(dir).cli_with_context(|| format!("Invalid directory '{}'", dir.display()))
}

fn resolve_directory(args: &EncodeArgs, interactive: bool, term: &Term) -> CliResult<PathBuf> {
    match &args.dir {
        Some(dir) => validate_directory_arg(dir),
        None if interactive => prompt::prompt_directory(term),
        None => Err(cli_error!(
            "No directory given; pass DIR or run without --non-interactive on a terminal"
        )),
    }
}

fn resolve_multiplier(
    args: &EncodeArgs,
    interactive: bool,
    term: &Term,
) -> CliResult<BitrateMultiplier> {
    match args.multiplier {
        Some(value) => BitrateMultiplier::new(value),
        None if interactive => prompt::prompt_multiplier(term),
        None => Ok(BitrateMultiplier::default()),
    }
}

/// Applies the terminal constraints to the requested deletion policy.
///
/// `Ask` needs someone to answer and degrades to `Never` otherwise. `Always`
/// is confirmed up front when a terminal is available.
fn resolve_deletion_policy(
    requested: DeletionPolicy,
    interactive: bool,
    term: &Term,
    dir: &Path,
) -> CliResult<DeletionPolicy> {
    match requested {
        DeletionPolicy::Ask if !interactive => {
            warn!("--delete-originals ask needs an interactive terminal; originals will be kept");
            Ok(DeletionPolicy::Never)
        }
        DeletionPolicy::Always if interactive => {
            if prompt::confirm_delete_all(term, dir)? {
                Ok(DeletionPolicy::Always)
            } else {
                info!("Deletion not confirmed; originals will be kept");
                Ok(DeletionPolicy::Never)
            }
        }
        policy => Ok(policy),
    }
}

fn build_config(
    args: &EncodeArgs,
    dir: PathBuf,
    multiplier: BitrateMultiplier,
    policy: DeletionPolicy,
) -> CliResult<CoreConfig> {
    CoreConfigBuilder::new()
        .input_dir(dir)
        .multiplier(multiplier.value())
        .recursive(!args.no_recursive)
        .processed_marker(&args.marker)
        .deletion_policy(policy)
        .encoder(args.encoder)
        .allow_software(args.allow_software)
        .encoder_preset(&args.preset)
        .build()
}

/// Lists the files the batch will see, with their sizes.
fn preview_files(config: &CoreConfig) -> CliResult<Vec<(PathBuf, u64)>> {
    let files = find_processable_files(
        &config.input_dir,
        config.recursive,
        &config.processed_marker,
    )?;
    Ok(files
        .into_iter()
        .map(|path| {
            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            (path, size)
        })
        .collect())
}

/// Raises `cancel` on the first Ctrl-C and exits on the second.
///
/// ffmpeg shares the terminal's process group, so the running encode is
/// interrupted too; the transcoder then removes its partial output.
fn install_interrupt_handler(cancel: CancelFlag) {
    let result = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            std::process::exit(130);
        }
        cancel.cancel();
        report::warning("Interrupted; stopping the batch (press Ctrl-C again to quit now)");
    });
    if let Err(e) = result {
        warn!("Could not install Ctrl-C handler: {e}");
    }
}

fn display_initialization_info(config: &CoreConfig, log_path: Option<&Path>) {
    report::section("Initialization");
    report::status("Directory", &config.input_dir.display().to_string(), false);
    report::status("Multiplier", &config.multiplier.to_string(), true);
    report::status("Recursive", if config.recursive { "yes" } else { "no" }, false);
    report::status("Originals", &config.deletion_policy.to_string(), false);
    if let Some(path) = log_path {
        report::status("Log file", &path.display().to_string(), false);
    }
}

fn format_signed_bytes(bytes: i64) -> String {
    if bytes < 0 {
        format!("-{}", format_bytes(bytes.unsigned_abs()))
    } else {
        format_bytes(bytes.unsigned_abs())
    }
}

/// Prints the end-of-run summary through the progress reporter.
pub fn display_summary(summary: &BatchSummary) {
    report::section("Summary");
    report::status("Files", &summary.total_files().to_string(), false);
    report::status("Encoded", &summary.encoded.to_string(), true);
    report::status("Skipped", &summary.skipped.to_string(), false);
    report::status("Failed", &summary.failed.to_string(), summary.failed > 0);
    if let Some(encoder) = &summary.encoder {
        report::status("Encoder", encoder, false);
    }
    if summary.encoded > 0 {
        report::status("Original size", &format_bytes(summary.total_original_bytes), false);
        report::status("Encoded size", &format_bytes(summary.total_encoded_bytes), false);
    }
    report::status("Bytes saved", &format_signed_bytes(summary.bytes_saved), true);
    report::status("Originals deleted", &summary.originals_deleted.to_string(), false);
    report::status(
        "Total time",
        &format_duration(summary.elapsed().as_secs_f64()),
        false,
    );

    for failure in &summary.failures {
        report::file_error(&failure.path, &failure.message);
    }
    if summary.deletion_failures > 0 {
        report::warning(&format!(
            "{} original(s) could not be deleted",
            summary.deletion_failures
        ));
    }
    if summary.cancelled {
        report::warning("Batch cancelled before all files were processed");
    } else if summary.total_files() == 0 {
        report::warning("No video files found");
    } else if summary.failed == 0 {
        report::success("Batch complete");
    }
}

/// Runs the encode command and returns the batch summary, or `None` when the
/// operator declined to start.
pub fn run_encode(args: EncodeArgs, options: RunOptions) -> CliResult<Option<BatchSummary>> {
    let interactive = !args.non_interactive && std::io::stdin().is_terminal();
    let term = Term::stderr();

    let dir = resolve_directory(&args, interactive, &term)?;
    let multiplier = resolve_multiplier(&args, interactive, &term)?;

    let log_dir = args.log_dir.clone().unwrap_or_else(|| dir.join("logs"));
    let log_path = logging::init_logging(options.verbose, options.color, Some(&log_dir))?;
    report::set_progress_reporter(Box::new(TerminalReporter::new()));

    let policy = resolve_deletion_policy(args.delete_originals, interactive, &term, &dir)?;
    let config = build_config(&args, dir, multiplier, policy)?;

    debug!("Interactive: {interactive}");
    debug!("Run started: {}", chrono::Local::now());
    display_initialization_info(&config, log_path.as_deref());

    if interactive {
        let files = preview_files(&config)?;
        if !files.is_empty() && !prompt::confirm_start(&term, &files)? {
            info!("Processing cancelled; no files were touched");
            return Ok(None);
        }
    }

    let transcoder = FfmpegTranscoder::new(SidecarSpawner, &config);
    let confirmer: Box<dyn DeletionConfirmer> = match config.deletion_policy {
        DeletionPolicy::Ask => Box::new(TerminalConfirmer::new(term.clone())),
        _ => Box::new(NeverConfirm),
    };

    let cancel = CancelFlag::new();
    install_interrupt_handler(cancel.clone());

    let ffprobe_executor = CrateFfprobeExecutor::new();
    let summary = Orchestrator::new(
        &config,
        &transcoder,
        &ffprobe_executor,
        &StdFsMetadataProvider,
        confirmer.as_ref(),
    )
    .with_cancel_flag(cancel)
    .run()?;
    display_summary(&summary);

    if let Some(path) = &args.json_summary {
        summary
            .write_json(path)
            .cli_with_context(|| format!("Failed to write summary to '{}'", path.display()))?;
        info!("Summary written to {}", path.display());
    }

    debug!("Finished at: {}", chrono::Local::now());
    Ok(Some(summary))
}
