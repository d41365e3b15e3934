//! Reassembly of downloaded parts into a single file.
//!
//! Parts are concatenated in file-name order. Zero-padded sequence numbers
//! (see [`PartFilename`](crate::PartFilename)) make that the download order.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{self, AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};

/// Errors that can occur while merging parts.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The part directory could not be listed.
    #[error("failed to list parts in {path}: {source}")]
    ReadDir {
        /// The part directory.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The part directory holds no part files.
    #[error("no parts found in {path}")]
    NoParts {
        /// The part directory.
        path: PathBuf,
    },

    /// A part could not be read.
    #[error("failed to read part {path}: {source}")]
    Read {
        /// The part file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The destination could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The destination file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A part or the part directory could not be removed after merging.
    #[error("failed to remove {path}: {source}")]
    Remove {
        /// The path that could not be removed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    /// Number of parts concatenated.
    pub parts: usize,
    /// Total bytes written to the destination.
    pub bytes: u64,
}

/// Concatenates every file in `input_dir`, sorted by name, into `dest`.
///
/// `dest` is created or truncated. With `remove_parts`, each part is deleted
/// after the merge and then `input_dir` itself is removed.
///
/// # Errors
///
/// Returns [`MergeError`] if the directory cannot be listed or holds no
/// parts, or if any read, write or removal fails.
#[instrument(skip_all, fields(input_dir = %input_dir.display(), dest = %dest.display()))]
pub async fn merge_parts(
    input_dir: &Path,
    dest: &Path,
    remove_parts: bool,
) -> Result<MergeSummary, MergeError> {
    let parts = list_parts(input_dir, dest).await?;
    if parts.is_empty() {
        return Err(MergeError::NoParts {
            path: input_dir.to_path_buf(),
        });
    }

    let write_err = |source| MergeError::Write {
        path: dest.to_path_buf(),
        source,
    };
    let mut out = BufWriter::new(File::create(dest).await.map_err(write_err)?);
    let mut bytes = 0u64;

    for part in &parts {
        let mut reader = File::open(part).await.map_err(|source| MergeError::Read {
            path: part.clone(),
            source,
        })?;
        let copied = io::copy(&mut reader, &mut out)
            .await
            .map_err(|source| MergeError::Read {
                path: part.clone(),
                source,
            })?;
        debug!(part = %part.display(), bytes = copied, "merged part");
        bytes += copied;
    }
    out.flush().await.map_err(write_err)?;

    if remove_parts {
        for part in &parts {
            fs::remove_file(part)
                .await
                .map_err(|source| MergeError::Remove {
                    path: part.clone(),
                    source,
                })?;
        }
        fs::remove_dir(input_dir)
            .await
            .map_err(|source| MergeError::Remove {
                path: input_dir.to_path_buf(),
                source,
            })?;
    }

    info!(parts = parts.len(), bytes, "parts merged");
    Ok(MergeSummary {
        parts: parts.len(),
        bytes,
    })
}

/// Regular files of `dir` sorted by file name, excluding `dest`.
async fn list_parts(dir: &Path, dest: &Path) -> Result<Vec<PathBuf>, MergeError> {
    let read_err = |source| MergeError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(dir).await.map_err(read_err)?;
    let mut parts = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let file_type = entry.file_type().await.map_err(read_err)?;
        let path = entry.path();
        if file_type.is_file() && path != dest {
            parts.push(path);
        }
    }

    parts.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(parts)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_merge_concatenates_in_name_order() {
        let temp = TempDir::new().unwrap();
        let parts = temp.path().join("parts");
        std::fs::create_dir(&parts).unwrap();
        std::fs::write(parts.join("part_00000002"), b"world").unwrap();
        std::fs::write(parts.join("part_00000001"), b"hello ").unwrap();
        std::fs::write(parts.join("part_00000010"), b"!").unwrap();

        let dest = temp.path().join("merged.bin");
        let summary = merge_parts(&parts, &dest, false).await.unwrap();

        assert_eq!(summary, MergeSummary { parts: 3, bytes: 12 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world!");
        assert!(parts.join("part_00000001").exists(), "parts kept");
    }

    #[tokio::test]
    async fn test_merge_remove_parts_deletes_directory() {
        let temp = TempDir::new().unwrap();
        let parts = temp.path().join("parts");
        std::fs::create_dir(&parts).unwrap();
        std::fs::write(parts.join("a"), b"1").unwrap();

        let dest = temp.path().join("out");
        merge_parts(&parts, &dest, true).await.unwrap();

        assert!(!parts.exists());
        assert_eq!(std::fs::read(&dest).unwrap(), b"1");
    }

    #[tokio::test]
    async fn test_merge_truncates_existing_destination() {
        let temp = TempDir::new().unwrap();
        let parts = temp.path().join("parts");
        std::fs::create_dir(&parts).unwrap();
        std::fs::write(parts.join("a"), b"new").unwrap();
        let dest = temp.path().join("out");
        std::fs::write(&dest, b"old contents that are longer").unwrap();

        merge_parts(&parts, &dest, false).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_merge_empty_directory_is_error() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out.bin");
        let parts = temp.path().join("empty");
        std::fs::create_dir(&parts).unwrap();

        let err = merge_parts(&parts, &dest, false).await.unwrap_err();
        assert!(matches!(err, MergeError::NoParts { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_merge_missing_directory_is_error() {
        let temp = TempDir::new().unwrap();
        let err = merge_parts(&temp.path().join("nope"), &temp.path().join("o"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::ReadDir { .. }));
    }
}
