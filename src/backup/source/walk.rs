use crate::backup::function_path;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithDebugObjectAndFnName;
use crate::backup::source::{base_name, classify, SourceFile, SourceKind};
use crate::backup::summary::Tally;

use dyn_iter::{DynIter, IntoDynIterator};
use function_name::named;
use walkdir::{DirEntry, WalkDir};

use std::path::{Path, PathBuf};

/// One item found while walking a source, in pre-order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalkEntry {
    Directory { absolute: PathBuf, relative: PathBuf },
    File(SourceFile),
}

/// Walks `source` in lexicographic order, yielding every directory below the root and every file.
///
/// Symbolic links are followed. Broken links, link loops, unreadable entries and special files
/// come out as errors rather than being skipped, so totals never silently shrink.
#[named]
pub fn walk<'a>(source: &Path) -> Result<DynIter<'a, Result<WalkEntry>>> {
    match classify(source) {
        SourceKind::File => {
            let size = std::fs::metadata(source)?.len();
            let file = SourceFile::new(source, base_name(source), size);
            tracing::trace!("Including file: {:?}", file.absolute());
            Ok(std::iter::once(Ok(WalkEntry::File(file))).into_dyn_iter())
        }
        SourceKind::Directory => {
            tracing::debug!("Walking directory {:?}", source);
            let root = source.to_path_buf();
            let root_debug = root.clone();

            let entries = WalkDir::new(source)
                .min_depth(1)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .map(move |res| {
                    res.map_err(Error::from)
                        .and_then(|de| process_dir_entry(de, &root))
                })
                .map(move |res| {
                    res.with_debug_object_and_fn_name(root_debug.clone(), function_path!())
                });

            Ok(entries.into_dyn_iter())
        }
        SourceKind::Invalid => Err(Error::source_invalid(
            source,
            "does not exist or is not a file or directory",
        )),
    }
}

fn process_dir_entry(de: DirEntry, root: &Path) -> Result<WalkEntry> {
    let relative = de
        .path()
        .strip_prefix(root)
        .map_err(|e| Error::source_invalid(de.path(), e.to_string()))?
        .to_path_buf();
    let file_type = de.file_type();

    if file_type.is_dir() {
        tracing::trace!("Including directory: {:?}", de.path());
        Ok(WalkEntry::Directory {
            absolute: de.into_path(),
            relative,
        })
    } else if file_type.is_file() {
        let size = de.metadata()?.len();
        tracing::trace!("Including file: {:?} ({} bytes)", de.path(), size);
        Ok(WalkEntry::File(SourceFile::new(de.into_path(), relative, size)))
    } else {
        Err(Error::source_invalid(
            de.path(),
            "not a regular file or directory",
        ))
    }
}

/// Lazily lists the regular files of `source` with their sizes.
///
/// A file source yields exactly itself, named by its base name. Every call walks again.
pub fn enumerate<'a>(source: &Path) -> Result<DynIter<'a, Result<SourceFile>>> {
    Ok(walk(source)?
        .filter_map(|res| match res {
            Ok(WalkEntry::File(file)) => Some(Ok(file)),
            Ok(WalkEntry::Directory { .. }) => None,
            Err(e) => Some(Err(e)),
        })
        .into_dyn_iter())
}

/// Counts the files under `source` and sums their sizes.
pub fn tally(source: &Path) -> Result<Tally> {
    enumerate(source)?.try_fold(Tally::default(), |total, file| {
        file.map(|file| total + Tally::single(file.size()))
    })
}
