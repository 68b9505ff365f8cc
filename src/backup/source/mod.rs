pub mod walk;

pub use walk::{enumerate, tally, walk, WalkEntry};

use getset::{CopyGetters, Getters};
use itertools::Itertools;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// What a source path turned out to be when it was inspected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Directory,
    /// Missing, unreadable, or neither a regular file nor a directory.
    Invalid,
}

/// Classifies `path`, following symbolic links.
pub fn classify<P: AsRef<Path>>(path: P) -> SourceKind {
    match std::fs::metadata(path.as_ref()) {
        Ok(md) if md.is_file() => SourceKind::File,
        Ok(md) if md.is_dir() => SourceKind::Directory,
        _ => SourceKind::Invalid,
    }
}

/// Name a source is stored under at the destination.
///
/// Paths without a final component, such as `/`, are stored as `root`.
pub fn base_name<P: AsRef<Path>>(path: P) -> OsString {
    path.as_ref()
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| OsString::from("root"))
}

/// A regular file found under a source.
#[derive(Clone, Debug, PartialEq, Eq, Getters, CopyGetters)]
pub struct SourceFile {
    #[getset(get = "pub")]
    absolute: PathBuf,
    /// Relative to the source root; the base name for a file source.
    #[getset(get = "pub")]
    relative: PathBuf,
    #[getset(get_copy = "pub")]
    size: u64,
}

impl SourceFile {
    pub fn new<A: Into<PathBuf>, R: Into<PathBuf>>(absolute: A, relative: R, size: u64) -> Self {
        Self {
            absolute: absolute.into(),
            relative: relative.into(),
            size,
        }
    }

    /// Relative path with `/` separators, as used for archive entry names.
    pub fn archive_name(&self) -> String {
        self.relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .join("/")
    }
}
