//! Per-file processing steps and the batch orchestrator.
//!
//! A batch runs each discovered file through [`inspector`], [`transcode`] and
//! [`cleanup`] in that order; [`batch`] drives the loop and records one
//! [`FileOutcome`] per file.

/// Batch state machine and per-file outcomes
pub mod batch;

/// Size comparison and deletion of originals
pub mod cleanup;

/// Size and bitrate inspection
pub mod inspector;

/// The `Transcoder` seam and its ffmpeg implementation
pub mod transcode;

pub use batch::{
    BatchState, CancelFlag, EncodeResult, FailedResult, FileOutcome, Orchestrator, SkipReason, SkippedResult,
    process_videos,
};
pub use cleanup::{DeletionConfirmer, DeletionOutcome, NeverConfirm, SizeComparison};
pub use inspector::{BitrateSource, FileRecord, inspect};
pub use transcode::{FfmpegTranscoder, Transcoder, output_path_for};
