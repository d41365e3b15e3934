//! Destination naming for downloaded parts.
//!
//! A [`PartNamer`] maps a chunk's arrival-order sequence number to the file
//! it is written to. Naming never depends on completion order.

use std::path::{Path, PathBuf};

/// Maps chunk sequence numbers to destination file names.
///
/// Implementations must be pure and total over positive integers: the
/// engine calls them from many tasks at once and has no way to report a
/// naming failure.
pub trait PartNamer: Send + Sync {
    /// Directory every part is written into.
    fn dest_dir(&self) -> &Path;

    /// File name (without directory) for part `part`.
    fn file_name(&self, part: u64) -> String;

    /// Full path of part `part`.
    fn path_of(&self, part: u64) -> PathBuf {
        self.dest_dir().join(self.file_name(part))
    }
}

/// Default naming policy: `{prefix}{part:08}{suffix}` inside `dest`.
///
/// # Example
///
/// ```
/// use chunkload_core::naming::{PartFilename, PartNamer};
///
/// let names = PartFilename::new("out").with_prefix("page").with_suffix(".jpeg");
/// assert_eq!(names.file_name(7), "page00000007.jpeg");
/// assert_eq!(names.path_of(7), std::path::Path::new("out/page00000007.jpeg"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartFilename {
    /// Text placed before the zero-padded sequence number.
    pub prefix: String,
    /// Text placed after the zero-padded sequence number.
    pub suffix: String,
    /// Destination directory.
    pub dest: PathBuf,
}

impl PartFilename {
    /// Creates a policy writing into `dest` with empty prefix and suffix.
    #[must_use]
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            prefix: String::new(),
            suffix: String::new(),
            dest: dest.into(),
        }
    }

    /// Sets the file name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the file name suffix.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }
}

impl PartNamer for PartFilename {
    fn dest_dir(&self) -> &Path {
        &self.dest
    }

    fn file_name(&self, part: u64) -> String {
        format!("{}{part:08}{}", self.prefix, self.suffix)
    }
}
