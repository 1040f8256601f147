//! Core library for batch re-encoding of video files to H.265 with ffmpeg.
//!
//! This crate scans a directory for video files, inspects each one with
//! ffprobe, re-encodes it with a hardware HEVC encoder at a multiple of its
//! original bitrate, compares the result with the original and optionally
//! removes the original.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use hevcshrink_core::config::{CoreConfigBuilder, DeletionPolicy};
//! use hevcshrink_core::external::{CrateFfprobeExecutor, SidecarSpawner, StdFsMetadataProvider};
//! use hevcshrink_core::processing::{FfmpegTranscoder, NeverConfirm};
//! use hevcshrink_core::process_videos;
//! use std::path::PathBuf;
//!
//! let config = CoreConfigBuilder::new()
//!     .input_dir(PathBuf::from("/path/to/videos"))
//!     .multiplier(0.6)
//!     .deletion_policy(DeletionPolicy::Never)
//!     .build()
//!     .unwrap();
//!
//! let transcoder = FfmpegTranscoder::new(SidecarSpawner, &config);
//! let summary = process_videos(
//!     &config,
//!     &transcoder,
//!     &CrateFfprobeExecutor::new(),
//!     &StdFsMetadataProvider,
//!     &NeverConfirm,
//! )
//! .unwrap();
//! println!("{} encoded, {} failed", summary.encoded, summary.failed);
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod hardware;
pub mod processing;
pub mod progress_reporting;
pub mod reporting;
pub mod utils;

// Re-exports for public API
pub use config::{BitrateMultiplier, CoreConfig, CoreConfigBuilder, DeletionPolicy};
pub use discovery::{find_processable_files, scan_video_files};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use hardware::{EncoderSelection, HevcEncoder};
pub use processing::{
    BatchState, CancelFlag, DeletionConfirmer, EncodeResult, FileOutcome, Orchestrator, Transcoder,
    process_videos,
};
pub use reporting::BatchSummary;
pub use utils::{format_bytes, format_duration, parse_ffmpeg_time};
