// ============================================================================
// hevcshrink-core/src/processing/batch.rs
// ============================================================================
//
// BATCH ORCHESTRATION: Scan, Inspect, Encode, Compare
//
// This module drives one batch run as an explicit state machine:
//
//   Idle -> CollectingInput -> Scanning -> ProcessingFile(0..n) -> Summarizing -> Done
//
// KEY COMPONENTS:
// - Orchestrator: owns the collaborators and the current state
// - process_videos: convenience wrapper that runs an Orchestrator to completion
// - FileOutcome and its payloads: one explicit result per discovered file
// - CancelFlag: stops the batch between files
//
// ERROR POLICY:
// Only input errors (bad directory, bad configuration) abort the run. A
// missing ffprobe or ffmpeg fails every file with a Probe or Encode kind, and
// every other per-file failure is recorded the same way before the batch moves
// on to the next file. Nothing is retried.

use crate::config::CoreConfig;
use crate::discovery::find_processable_files;
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::external::{FfprobeExecutor, FileMetadataProvider};
use crate::processing::cleanup::{
    DeletionConfirmer, DeletionOutcome, SizeComparison, apply_deletion_policy, compare_sizes,
};
use crate::processing::inspector::{BitrateSource, FileRecord, inspect};
use crate::processing::transcode::{Transcoder, output_path_for};
use crate::progress_reporting;
use crate::reporting::BatchSummary;
use crate::utils::{format_bitrate, format_bytes};

use chrono::Utc;
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// ============================================================================
// OUTCOME TYPES
// ============================================================================

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// A successfully encoded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeResult {
    pub source_path: PathBuf,
    /// Always differs from `source_path`; carries the processed marker
    pub output_path: PathBuf,
    pub original_size: u64,
    pub encoded_size: u64,
    pub source_bitrate_bps: u64,
    pub target_bitrate_bps: u64,
    #[serde(rename = "encode_time_secs", serialize_with = "serialize_secs")]
    pub encode_time: Duration,
    pub encoder: Option<String>,
    pub deletion: DeletionOutcome,
}

impl EncodeResult {
    pub fn comparison(&self) -> SizeComparison {
        SizeComparison::new(self.original_size, self.encoded_size)
    }
}

/// Why a file was not encoded although nothing went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The output path is already taken
    OutputExists(PathBuf),
    /// Neither stream, container nor size/duration gave a bitrate
    BitrateUnknown,
    /// The batch was cancelled before this file was reached
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::OutputExists(path) => write!(f, "output {} already exists", path.display()),
            SkipReason::BitrateUnknown => f.write_str("bitrate unknown"),
            SkipReason::Cancelled => f.write_str("batch cancelled"),
        }
    }
}

/// A file that was left alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedResult {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// A file whose processing failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedResult {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl FailedResult {
    fn from_error(path: &Path, error: &CoreError) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    fn tool_unavailable(path: &Path, kind: ErrorKind, message: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            message: message.to_string(),
        }
    }
}

/// Per-file result of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Encoded(EncodeResult),
    Skipped(SkippedResult),
    Failed(FailedResult),
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Encoded(r) => &r.source_path,
            FileOutcome::Skipped(r) => &r.path,
            FileOutcome::Failed(r) => &r.path,
        }
    }
}

// ============================================================================
// CANCELLATION
// ============================================================================

/// Shared flag that asks a running batch to stop.
///
/// Checked before each file. The flag does not stop an encode in progress,
/// but an encode that fails after it was raised counts as cancelled rather
/// than failed. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// External tools found missing when the first file was reached.
#[derive(Debug, Default)]
struct ToolAvailability {
    probe_error: Option<String>,
    encoder_error: Option<String>,
}

// ============================================================================
// STATE MACHINE
// ============================================================================

/// States of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    CollectingInput,
    Scanning,
    /// Index into the discovered file list
    ProcessingFile(usize),
    Summarizing,
    Done,
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::Idle => f.write_str("Idle"),
            BatchState::CollectingInput => f.write_str("CollectingInput"),
            BatchState::Scanning => f.write_str("Scanning"),
            BatchState::ProcessingFile(i) => write!(f, "ProcessingFile({i})"),
            BatchState::Summarizing => f.write_str("Summarizing"),
            BatchState::Done => f.write_str("Done"),
        }
    }
}

/// Drives one batch run over its collaborators.
///
/// Generic over the external seams so tests can substitute fakes:
/// - `T`: Transcoder - encodes one file
/// - `P`: FfprobeExecutor - probes container metadata
/// - `M`: FileMetadataProvider - file sizes
/// - `C`: DeletionConfirmer - consulted under [`DeletionPolicy::Ask`](crate::config::DeletionPolicy::Ask)
pub struct Orchestrator<'a, T, P, M, C: ?Sized>
where
    T: Transcoder,
    P: FfprobeExecutor,
    M: FileMetadataProvider,
    C: DeletionConfirmer,
{
    config: &'a CoreConfig,
    transcoder: &'a T,
    ffprobe_executor: &'a P,
    metadata_provider: &'a M,
    confirmer: &'a C,
    cancel: CancelFlag,
    tools: ToolAvailability,
    state: BatchState,
}

impl<'a, T, P, M, C> Orchestrator<'a, T, P, M, C>
where
    T: Transcoder,
    P: FfprobeExecutor,
    M: FileMetadataProvider,
    C: DeletionConfirmer + ?Sized,
{
    pub fn new(
        config: &'a CoreConfig,
        transcoder: &'a T,
        ffprobe_executor: &'a P,
        metadata_provider: &'a M,
        confirmer: &'a C,
    ) -> Self {
        Self {
            config,
            transcoder,
            ffprobe_executor,
            metadata_provider,
            confirmer,
            cancel: CancelFlag::new(),
            tools: ToolAvailability::default(),
            state: BatchState::Idle,
        }
    }

    /// Uses `cancel` to stop the batch early. Files not yet started when it
    /// is raised, and an encode that fails after it, are recorded as
    /// [`SkipReason::Cancelled`].
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current state.
    pub fn state(&self) -> BatchState {
        self.state
    }

    fn transition(&mut self, next: BatchState) {
        log::debug!("Batch state: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Runs the batch to completion.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] / [`CoreError::InvalidInput`] if the input is
    /// invalid; no file has been touched in that case. A missing ffprobe or
    /// ffmpeg is not an error of the run: every file is recorded as failed
    /// and the summary is still returned.
    pub fn run(&mut self) -> CoreResult<BatchSummary> {
        let started_at = Utc::now();

        self.transition(BatchState::CollectingInput);
        self.collect_input()?;

        self.transition(BatchState::Scanning);
        let files = find_processable_files(
            &self.config.input_dir,
            self.config.recursive,
            &self.config.processed_marker,
        )?;
        log::info!(
            "Found {} video file(s) in {}",
            files.len(),
            self.config.input_dir.display()
        );

        let mut outcomes = Vec::with_capacity(files.len());
        let mut announced = false;
        for (index, path) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                if !announced {
                    progress_reporting::warning(&format!(
                        "Batch cancelled, {} file(s) not started",
                        files.len() - index
                    ));
                    announced = true;
                }
                log::info!("Skipped {}: {}", path.display(), SkipReason::Cancelled);
                outcomes.push(FileOutcome::Skipped(SkippedResult {
                    path: path.clone(),
                    reason: SkipReason::Cancelled,
                }));
                continue;
            }

            self.transition(BatchState::ProcessingFile(index));
            if index == 0 {
                self.check_tools();
            }
            progress_reporting::file_start(index, files.len(), path);
            let outcome = self.process_file(path);
            log_outcome(&outcome);
            outcomes.push(outcome);
        }

        self.transition(BatchState::Summarizing);
        let mut summary = BatchSummary::from_outcomes(
            &self.config.input_dir,
            self.config.multiplier.value(),
            self.transcoder.encoder_name(),
            started_at,
            outcomes,
        );
        summary.cancelled = self.cancel.is_cancelled();

        self.transition(BatchState::Done);
        Ok(summary)
    }

    fn collect_input(&self) -> CoreResult<()> {
        let dir = &self.config.input_dir;
        if !dir.exists() {
            return Err(CoreError::NotFound(dir.clone()));
        }
        if !dir.is_dir() {
            return Err(CoreError::InvalidInput(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        self.config.validate()
    }

    /// Runs the ffprobe check and the transcoder's one-time setup. Failures
    /// are kept and turned into per-file failures by [`Self::process_file`].
    fn check_tools(&mut self) {
        if let Err(e) = self.ffprobe_executor.check_available() {
            progress_reporting::error(&format!("ffprobe is unavailable: {e}"));
            self.tools.probe_error = Some(format!("cannot inspect file: {e}"));
        }
        if let Err(e) = self.transcoder.prepare() {
            progress_reporting::error(&format!("Encoder is unavailable: {e}"));
            self.tools.encoder_error = Some(format!("cannot encode file: {e}"));
        }
    }

    /// Inspect, encode, compare and clean up one file.
    fn process_file(&self, path: &Path) -> FileOutcome {
        let output_path = match output_path_for(path, &self.config.processed_marker) {
            Ok(p) => p,
            Err(e) => return FileOutcome::Failed(FailedResult::from_error(path, &e)),
        };
        if output_path.exists() {
            return FileOutcome::Skipped(SkippedResult {
                path: path.to_path_buf(),
                reason: SkipReason::OutputExists(output_path),
            });
        }

        if let Some(message) = &self.tools.probe_error {
            return FileOutcome::Failed(FailedResult::tool_unavailable(
                path,
                ErrorKind::Probe,
                message,
            ));
        }
        let record = match inspect(self.ffprobe_executor, self.metadata_provider, path) {
            Ok(record) => record,
            Err(e) => return FileOutcome::Failed(FailedResult::from_error(path, &e)),
        };
        let Some(source_bitrate) = record.bitrate_bps else {
            return FileOutcome::Skipped(SkippedResult {
                path: path.to_path_buf(),
                reason: SkipReason::BitrateUnknown,
            });
        };
        let target_bitrate = self.config.multiplier.target_bitrate(source_bitrate);
        report_record(&record, source_bitrate);

        if let Some(message) = &self.tools.encoder_error {
            return FileOutcome::Failed(FailedResult::tool_unavailable(
                path,
                ErrorKind::Encode,
                message,
            ));
        }
        let start = Instant::now();
        let encoded_path = match self.transcoder.encode_file(&record, target_bitrate) {
            Ok(p) => p,
            // The interrupt that raised the flag also stopped this encode
            Err(e) if self.cancel.is_cancelled() => {
                log::debug!("Encode of {} interrupted: {}", path.display(), e);
                return FileOutcome::Skipped(SkippedResult {
                    path: path.to_path_buf(),
                    reason: SkipReason::Cancelled,
                });
            }
            Err(e) => return FileOutcome::Failed(FailedResult::from_error(path, &e)),
        };
        let encode_time = start.elapsed();

        let comparison = match compare_sizes(self.metadata_provider, path, &encoded_path) {
            Ok(c) => c,
            Err(e) => return FileOutcome::Failed(FailedResult::from_error(path, &e)),
        };
        report_comparison(&comparison);

        let deletion =
            apply_deletion_policy(self.config.deletion_policy, self.confirmer, path, &comparison);

        FileOutcome::Encoded(EncodeResult {
            source_path: path.to_path_buf(),
            output_path: encoded_path,
            original_size: comparison.original_size,
            encoded_size: comparison.encoded_size,
            source_bitrate_bps: source_bitrate,
            target_bitrate_bps: target_bitrate,
            encode_time,
            encoder: self.transcoder.encoder_name(),
            deletion,
        })
    }
}

fn report_record(record: &FileRecord, source_bitrate: u64) {
    progress_reporting::status("Size", &format_bytes(record.size_bytes), false);
    if let (Some(w), Some(h)) = (record.width, record.height) {
        progress_reporting::status("Resolution", &format!("{w}x{h}"), false);
    }
    let source = match record.bitrate_source {
        Some(BitrateSource::Container) => " (container)",
        Some(BitrateSource::Estimated) => " (estimated)",
        Some(BitrateSource::Stream) | None => "",
    };
    progress_reporting::status(
        "Source bitrate",
        &format!("{}{}", format_bitrate(source_bitrate), source),
        false,
    );
}

fn report_comparison(comparison: &SizeComparison) {
    progress_reporting::status("Encoded size", &format_bytes(comparison.encoded_size), false);
    if comparison.is_beneficial() {
        progress_reporting::success(&format!(
            "Saved {} ({:.1}%)",
            format_bytes(comparison.bytes_saved().unsigned_abs()),
            -comparison.percent_change()
        ));
    } else {
        progress_reporting::warning(&format!(
            "Transcoding was not beneficial: output is {} larger ({:+.1}%)",
            format_bytes(comparison.bytes_saved().unsigned_abs()),
            comparison.percent_change()
        ));
    }
}

fn log_outcome(outcome: &FileOutcome) {
    match outcome {
        FileOutcome::Encoded(r) => {
            log::info!(
                "Encoded {} -> {} ({} -> {}) in {:.1}s",
                r.source_path.display(),
                r.output_path.display(),
                format_bytes(r.original_size),
                format_bytes(r.encoded_size),
                r.encode_time.as_secs_f64()
            );
            if let DeletionOutcome::Failed(message) = &r.deletion {
                progress_reporting::error(message);
            }
        }
        FileOutcome::Skipped(s) => {
            log::info!("Skipped {}: {}", s.path.display(), s.reason);
            progress_reporting::warning(&format!("Skipped: {}", s.reason));
        }
        FileOutcome::Failed(f) => {
            log::error!("{}", f.message);
            progress_reporting::file_error(&f.path, &f.message);
        }
    }
}

/// Runs a full batch with the given collaborators.
///
/// # Examples
///
/// ```rust,no_run
/// use hevcshrink_core::config::CoreConfigBuilder;
/// use hevcshrink_core::external::{CrateFfprobeExecutor, SidecarSpawner, StdFsMetadataProvider};
/// use hevcshrink_core::processing::{FfmpegTranscoder, NeverConfirm, process_videos};
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .input_dir(PathBuf::from("/path/to/videos"))
///     .build()
///     .unwrap();
/// let transcoder = FfmpegTranscoder::new(SidecarSpawner, &config);
/// let summary = process_videos(
///     &config,
///     &transcoder,
///     &CrateFfprobeExecutor::new(),
///     &StdFsMetadataProvider,
///     &NeverConfirm,
/// )
/// .unwrap();
/// println!("Encoded {} file(s)", summary.encoded);
/// ```
pub fn process_videos<T, P, M, C>(
    config: &CoreConfig,
    transcoder: &T,
    ffprobe_executor: &P,
    metadata_provider: &M,
    confirmer: &C,
) -> CoreResult<BatchSummary>
where
    T: Transcoder,
    P: FfprobeExecutor,
    M: FileMetadataProvider,
    C: DeletionConfirmer + ?Sized,
{
    Orchestrator::new(config, transcoder, ffprobe_executor, metadata_provider, confirmer).run()
}
