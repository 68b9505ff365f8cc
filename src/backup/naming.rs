//! Collision-free naming for backup output.
//!
//! A name is resolved against a [`NamingNamespace`]: when the candidate is taken, the counter
//! suffix `" (n)"` is inserted before the extension, starting at 1, until a free name turns up.
//! Only the final segment of a `/`-separated relative path is ever altered.

use crate::backup::notifications::{BackupEvent, Notification};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fmt::Debug;
use std::path::Path;

/// A name that can take a `" (n)"` counter in front of its extension.
pub trait CandidateName: ToOwned + Debug {
    fn with_counter(&self, n: u64) -> Self::Owned;

    fn to_lossy_string(&self) -> String;
}

/// Archive entry names: `/`-separated, only the last segment is ever altered.
impl CandidateName for str {
    fn with_counter(&self, n: u64) -> String {
        let (dir, stem, ext) = split_candidate(self);
        format!("{dir}{stem} ({n}){ext}")
    }

    fn to_lossy_string(&self) -> String {
        self.to_owned()
    }
}

/// Single file system names, kept byte for byte.
impl CandidateName for OsStr {
    #[cfg(unix)]
    fn with_counter(&self, n: u64) -> OsString {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let bytes = self.as_bytes();
        let split = extension_start(bytes).unwrap_or(bytes.len());
        let mut name = bytes[..split].to_vec();
        name.extend_from_slice(format!(" ({n})").as_bytes());
        name.extend_from_slice(&bytes[split..]);
        OsString::from_vec(name)
    }

    #[cfg(not(unix))]
    fn with_counter(&self, n: u64) -> OsString {
        OsString::from(self.to_string_lossy().as_ref().with_counter(n))
    }

    fn to_lossy_string(&self) -> String {
        self.to_string_lossy().into_owned()
    }
}

/// Set of names already occupied in one destination scope.
pub trait NamingNamespace<C: ?Sized = str> {
    fn is_taken(&self, name: &C) -> bool;

    /// Records `name` as occupied once it has been chosen.
    fn claim(&mut self, name: &C);
}

/// Entries of a filesystem directory, queried live on every probe.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryNamespace<'a> {
    dir: &'a Path,
}

impl<'a> DirectoryNamespace<'a> {
    pub fn new(dir: &'a Path) -> Self {
        Self { dir }
    }
}

impl NamingNamespace<OsStr> for DirectoryNamespace<'_> {
    fn is_taken(&self, name: &OsStr) -> bool {
        // dangling symlinks still occupy the name
        self.dir.join(name).symlink_metadata().is_ok()
    }

    fn claim(&mut self, _name: &OsStr) {}
}

/// Entry names written into one archive during one run.
#[derive(Debug, Clone, Default)]
pub struct ArchiveNamespace {
    taken: HashSet<String>,
}

impl ArchiveNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.taken.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taken.is_empty()
    }
}

impl NamingNamespace for ArchiveNamespace {
    fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    fn claim(&mut self, name: &str) {
        self.taken.insert(name.to_owned());
    }
}

impl<S: Into<String>> FromIterator<S> for ArchiveNamespace {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            taken: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Picks unique names and reports every rename to an optional notifier.
#[derive(Clone, Copy, Default)]
pub struct NameResolver<'a> {
    notifier: Option<&'a dyn Notification>,
}

impl<'a> NameResolver<'a> {
    pub fn new(notifier: Option<&'a dyn Notification>) -> Self {
        Self { notifier }
    }

    /// Returns `candidate` or its first free `" (n)"` variant in `namespace`, then claims it.
    ///
    /// `origin` is the source path the name stands for, used only for diagnostics.
    pub fn resolve<C, N>(&self, namespace: &mut N, candidate: &C, origin: &Path) -> C::Owned
    where
        C: CandidateName + ?Sized,
        N: NamingNamespace<C> + ?Sized,
    {
        if !namespace.is_taken(candidate) {
            namespace.claim(candidate);
            return candidate.to_owned();
        }

        let mut n = 1u64;
        let chosen = loop {
            let name = candidate.with_counter(n);
            if !namespace.is_taken(name.borrow()) {
                break name;
            }
            n += 1;
        };
        let chosen_name: &C = chosen.borrow();

        tracing::warn!("Duplicate detected, renaming: {:?} -> {:?}", origin, chosen_name);
        if let Some(notifier) = self.notifier {
            notifier.notify(&BackupEvent::Renamed {
                origin: origin.to_path_buf(),
                candidate: candidate.to_lossy_string(),
                chosen: chosen_name.to_lossy_string(),
            });
        }

        namespace.claim(chosen_name);
        chosen
    }
}

/// Byte offset of the extension's dot. Leading dots belong to the stem.
fn extension_start(file_name: &[u8]) -> Option<usize> {
    let leading_dots = file_name.iter().take_while(|&&b| b == b'.').count();
    file_name[leading_dots..]
        .iter()
        .rposition(|&b| b == b'.')
        .map(|idx| leading_dots + idx)
}

/// Splits `a/b/name.ext` into `("a/b/", "name", ".ext")`.
///
/// `.bashrc` has no extension and `name.` keeps `"."`.
fn split_candidate(candidate: &str) -> (&str, &str, &str) {
    let (dir, file_name) = match candidate.rfind('/') {
        Some(idx) => candidate.split_at(idx + 1),
        None => ("", candidate),
    };
    match extension_start(file_name.as_bytes()) {
        Some(idx) => {
            let (stem, ext) = file_name.split_at(idx);
            (dir, stem, ext)
        }
        None => (dir, file_name, ""),
    }
}
