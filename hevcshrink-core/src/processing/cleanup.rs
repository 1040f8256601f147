//! Size comparison and removal of originals.
//!
//! After a successful encode the two files are compared. Whether the original
//! is then removed depends on the [`DeletionPolicy`] and, for
//! [`DeletionPolicy::Ask`], on a [`DeletionConfirmer`].

use crate::config::DeletionPolicy;
use crate::error::{CoreError, CoreResult};
use crate::external::FileMetadataProvider;
use crate::utils::percent_change;

use serde::Serialize;
use std::path::Path;

/// Result of comparing an encode with its original.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeComparison {
    pub original_size: u64,
    pub encoded_size: u64,
}

impl SizeComparison {
    pub fn new(original_size: u64, encoded_size: u64) -> Self {
        Self {
            original_size,
            encoded_size,
        }
    }

    /// `original - encoded`; negative when the encode grew.
    pub fn bytes_saved(&self) -> i64 {
        self.original_size as i64 - self.encoded_size as i64
    }

    /// Size change in percent; negative when the encode is smaller.
    pub fn percent_change(&self) -> f64 {
        percent_change(self.original_size, self.encoded_size)
    }

    /// True when the encode is strictly smaller than the original.
    pub fn is_beneficial(&self) -> bool {
        self.encoded_size < self.original_size
    }
}

/// Compares the current sizes of `original` and `encoded` on disk.
pub fn compare_sizes<M: FileMetadataProvider>(
    metadata_provider: &M,
    original: &Path,
    encoded: &Path,
) -> CoreResult<SizeComparison> {
    Ok(SizeComparison::new(
        metadata_provider.get_size(original)?,
        metadata_provider.get_size(encoded)?,
    ))
}

/// Decides per file whether an original may be deleted.
pub trait DeletionConfirmer {
    /// Called only after a successful encode, with the size comparison.
    fn confirm_delete(&self, original: &Path, comparison: &SizeComparison) -> bool;
}

/// Confirmer that always keeps originals.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl DeletionConfirmer for NeverConfirm {
    fn confirm_delete(&self, _original: &Path, _comparison: &SizeComparison) -> bool {
        false
    }
}

/// What happened to an original after its encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Kept,
    Deleted,
    /// Deletion was confirmed but the filesystem refused it
    Failed(String),
}

/// Removes an original file.
pub fn delete_original(path: &Path) -> CoreResult<()> {
    std::fs::remove_file(path).map_err(|source| CoreError::Deletion {
        path: path.to_path_buf(),
        source,
    })
}

/// Applies `policy` to `original` and reports what happened. Never fails;
/// a refused deletion is returned as [`DeletionOutcome::Failed`].
pub fn apply_deletion_policy<C: DeletionConfirmer + ?Sized>(
    policy: DeletionPolicy,
    confirmer: &C,
    original: &Path,
    comparison: &SizeComparison,
) -> DeletionOutcome {
    let confirmed = match policy {
        DeletionPolicy::Never => false,
        DeletionPolicy::Always => true,
        DeletionPolicy::Ask => confirmer.confirm_delete(original, comparison),
    };
    if !confirmed {
        return DeletionOutcome::Kept;
    }

    match delete_original(original) {
        Ok(()) => {
            log::info!("Deleted original {}", original.display());
            DeletionOutcome::Deleted
        }
        Err(e) => {
            log::error!("{}", e);
            DeletionOutcome::Failed(e.to_string())
        }
    }
}
