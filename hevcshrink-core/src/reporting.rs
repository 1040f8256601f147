//! Batch summary.
//!
//! [`BatchSummary`] is computed once, after the last file, from the list of
//! per-file outcomes. It is what the CLI prints at the end of a run and what
//! `--json-summary` writes to disk.

use crate::error::{CoreResult, ErrorKind};
use crate::processing::batch::FileOutcome;
use crate::processing::cleanup::DeletionOutcome;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A failed file, as listed in the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEntry {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

/// Aggregate of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub input_dir: PathBuf,
    pub multiplier: f64,
    pub encoder: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub encoded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Original size of encoded files only
    pub total_original_bytes: u64,
    pub total_encoded_bytes: u64,
    /// Negative when encodes grew in total
    pub bytes_saved: i64,
    pub originals_deleted: usize,
    /// Deletions that were confirmed but refused by the filesystem
    pub deletion_failures: usize,
    /// The run stopped early; files not started are counted as skipped
    pub cancelled: bool,
    pub failures: Vec<FailureEntry>,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchSummary {
    /// Folds `outcomes` into a summary.
    pub fn from_outcomes(
        input_dir: &Path,
        multiplier: f64,
        encoder: Option<String>,
        started_at: DateTime<Utc>,
        outcomes: Vec<FileOutcome>,
    ) -> Self {
        let mut summary = Self {
            input_dir: input_dir.to_path_buf(),
            multiplier,
            encoder,
            started_at,
            finished_at: Utc::now(),
            encoded: 0,
            skipped: 0,
            failed: 0,
            total_original_bytes: 0,
            total_encoded_bytes: 0,
            bytes_saved: 0,
            originals_deleted: 0,
            deletion_failures: 0,
            cancelled: false,
            failures: Vec::new(),
            outcomes: Vec::new(),
        };

        for outcome in &outcomes {
            match outcome {
                FileOutcome::Encoded(result) => {
                    summary.encoded += 1;
                    summary.total_original_bytes += result.original_size;
                    summary.total_encoded_bytes += result.encoded_size;
                    match result.deletion {
                        DeletionOutcome::Deleted => summary.originals_deleted += 1,
                        DeletionOutcome::Failed(_) => summary.deletion_failures += 1,
                        DeletionOutcome::Kept => {}
                    }
                }
                FileOutcome::Skipped(_) => summary.skipped += 1,
                FileOutcome::Failed(failure) => {
                    summary.failed += 1;
                    summary.failures.push(FailureEntry {
                        path: failure.path.clone(),
                        kind: failure.kind,
                        message: failure.message.clone(),
                    });
                }
            }
        }
        summary.bytes_saved =
            summary.total_original_bytes as i64 - summary.total_encoded_bytes as i64;
        summary.outcomes = outcomes;
        summary
    }

    /// Number of files the batch looked at.
    pub fn total_files(&self) -> usize {
        self.encoded + self.skipped + self.failed
    }

    /// Wall time of the run.
    pub fn elapsed(&self) -> std::time::Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Writes the summary as pretty JSON.
    pub fn write_json(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::debug!("Wrote summary to {}", path.display());
        Ok(())
    }
}
