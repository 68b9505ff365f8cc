//! Point-in-time backup of a list of sources into a directory or a ZIP archive.
//!
//! Sources are processed strictly in list order and, inside a directory, in walk order, so the
//! names chosen on collision are reproducible. Nothing ever overwrites an existing path.
//!
//! Runs are not atomic. When a source fails, output already written for earlier sources stays at
//! the destination and the failed source's own partial output (if any) is reported through
//! [`Error::partial_artifact`].

use crate::backup::function_path;
use crate::backup::naming::{DirectoryNamespace, NameResolver};
use crate::backup::notifications::{BackupEvent, Notification};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg, WithPartialArtifact};
use crate::backup::source::{self, SourceKind, WalkEntry};
use crate::backup::summary::{BackupResult, Tally};
use crate::backup::zip::{ZipArchiveWriter, ARCHIVE_SUFFIX};

use bon::Builder;
use function_name::named;
use std::ffi::OsString;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Where a run writes its output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackupTarget {
    /// Folder receiving one uniquely named entry per source.
    Directory(PathBuf),
    /// Archive path without the `.zip` suffix.
    Archive(PathBuf),
}

impl BackupTarget {
    pub fn path(&self) -> &Path {
        match self {
            BackupTarget::Directory(p) | BackupTarget::Archive(p) => p,
        }
    }
}

/// Stateless backup executor. Each [`run`](BackupEngine::run) is independent.
#[derive(Builder, Default, Clone)]
pub struct BackupEngine {
    notifier: Option<Arc<dyn Notification + Send + Sync>>,
}

impl BackupEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, event: BackupEvent) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(&event);
        }
    }

    fn resolver(&self) -> NameResolver<'_> {
        NameResolver::new(self.notifier.as_deref().map(|n| n as &dyn Notification))
    }

    /// Backs up `sources` into `target`.
    ///
    /// Fails on the first source that is invalid or cannot be copied; no result is produced then.
    #[named]
    pub fn run<P: AsRef<Path>>(&self, sources: &[P], target: &BackupTarget) -> Result<BackupResult> {
        let started = Instant::now();
        tracing::info!("Starting backup of {} sources into {:?}", sources.len(), target);

        let res = match target {
            BackupTarget::Directory(dir) => self.backup_to_directory(sources, dir),
            BackupTarget::Archive(base) => self.backup_to_archive(sources, base),
        };

        match res {
            Ok(tally) => {
                let result = BackupResult::new(tally, started.elapsed());
                tracing::info!("Backup finished: {}", result);
                self.notify(BackupEvent::Completed(result));
                Ok(result)
            }
            Err(e) => {
                let e = e.with_debug_object_and_fn_name(target.clone(), function_path!());
                tracing::error!("Backup failed: {e}");
                self.notify(BackupEvent::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn backup_to_directory<P: AsRef<Path>>(
        &self,
        sources: &[P],
        destination: &Path,
    ) -> Result<Tally> {
        ensure_directory(destination)?;
        sources
            .iter()
            .map(AsRef::as_ref)
            .try_fold(Tally::default(), |total, src| {
                self.copy_source(src, destination)
                    .map(|tally| total + tally)
                    .with_msg(format!("Backing up {:?} into {:?} failed", src, destination))
            })
    }

    fn copy_source(&self, src: &Path, destination: &Path) -> Result<Tally> {
        match source::classify(src) {
            SourceKind::Directory => {
                reject_nested(src, destination)?;
                let tally = source::tally(src)?;
                let name = self.resolver().resolve(
                    &mut DirectoryNamespace::new(destination),
                    source::base_name(src).as_os_str(),
                    src,
                );
                copy_tree(src, &destination.join(name))?;
                Ok(tally)
            }
            SourceKind::File => {
                let name = self.resolver().resolve(
                    &mut DirectoryNamespace::new(destination),
                    source::base_name(src).as_os_str(),
                    src,
                );
                let dst = destination.join(name);
                let copied = copy_file(src, &dst)?;
                Ok(Tally::single(copied))
            }
            SourceKind::Invalid => Err(invalid_source(src)),
        }
    }

    fn backup_to_archive<P: AsRef<Path>>(&self, sources: &[P], base: &Path) -> Result<Tally> {
        let (parent, file_name) = archive_location(base);
        ensure_directory(&parent)?;

        // invalid sources fail before the archive file exists
        for src in sources.iter().map(AsRef::as_ref) {
            match source::classify(src) {
                SourceKind::Directory => reject_nested(src, &parent)?,
                SourceKind::File => {}
                SourceKind::Invalid => return Err(invalid_source(src)),
            }
        }

        let name = self
            .resolver()
            .resolve(&mut DirectoryNamespace::new(&parent), file_name.as_os_str(), base);
        let path = parent.join(name);
        let file = File::create_new(&path).map_err(|e| Error::on_create(&path, e))?;
        tracing::info!("Writing archive {:?}", path);

        self.write_archive(BufWriter::new(file), sources)
            .with_partial_artifact(path)
    }

    fn write_archive<P: AsRef<Path>>(&self, file: BufWriter<File>, sources: &[P]) -> Result<Tally> {
        let resolver = self.resolver();
        let mut writer = ZipArchiveWriter::new(file);

        let tally = sources
            .iter()
            .map(AsRef::as_ref)
            .try_fold(Tally::default(), |total, src| {
                archive_source(&mut writer, &resolver, src)
                    .map(|tally| total + tally)
                    .with_msg(format!("Archiving {:?} failed", src))
            })?;

        writer
            .finish()?
            .into_inner()
            .map_err(|e| Error::from(e.into_error()))?
            .sync_all()?;
        Ok(tally)
    }
}

fn archive_source(
    writer: &mut ZipArchiveWriter<BufWriter<File>>,
    resolver: &NameResolver,
    src: &Path,
) -> Result<Tally> {
    source::enumerate(src)?.try_fold(Tally::default(), |total, file| {
        let file = file?;
        writer
            .append(&file, resolver)
            .map(|written| total + Tally::single(written))
    })
}

fn invalid_source(src: &Path) -> Error {
    Error::source_invalid(src, "does not exist or is not a file or directory")
}

/// `<base>.zip` split into its parent folder and file name.
fn archive_location(base: &Path) -> (PathBuf, OsString) {
    let mut file_name = base
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("backup"));
    file_name.push(ARCHIVE_SUFFIX);

    let parent = match base.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (parent, file_name)
}

/// Creates `dir` if missing; an existing non-directory is a conflict.
fn ensure_directory(dir: &Path) -> Result<()> {
    match std::fs::metadata(dir) {
        Ok(md) if md.is_dir() => Ok(()),
        Ok(_) => Err(Error::destination_conflict(dir, "exists and is not a directory")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => std::fs::create_dir_all(dir)
            .map_err(Error::from)
            .with_msg(format!("Creating destination {:?} failed", dir)),
        Err(e) => Err(Error::from(e).with_msg(format!("Accessing destination {:?} failed", dir))),
    }
}

/// A source containing the destination would end up walking its own output.
fn reject_nested(src: &Path, destination: &Path) -> Result<()> {
    let src = src.canonicalize()?;
    let destination = destination.canonicalize()?;
    if destination.starts_with(&src) {
        return Err(Error::source_invalid(
            &src,
            format!("contains the destination {:?}", destination),
        ));
    }
    Ok(())
}

/// Copies the tree at `src` into `dst`, which must not exist yet.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir(dst).map_err(|e| Error::on_create(dst, e))?;
    tracing::debug!("Copying tree {:?} -> {:?}", src, dst);

    source::walk(src)
        .and_then(|mut entries| {
            entries.try_for_each(|entry| match entry? {
                WalkEntry::Directory { relative, .. } => {
                    let dir = dst.join(relative);
                    std::fs::create_dir(&dir).map_err(|e| Error::on_create(&dir, e))
                }
                WalkEntry::File(file) => {
                    copy_file(file.absolute(), &dst.join(file.relative())).map(|_| ())
                }
            })
        })
        .with_partial_artifact(dst)
}

/// Copies one file to a fresh `dst`, keeping its modification time and permissions.
fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    let mut reader = File::open(src)
        .map_err(Error::from)
        .with_msg(format!("Opening {:?} failed", src))?;
    let mut writer = File::create_new(dst).map_err(|e| Error::on_create(dst, e))?;

    let copied = (|| -> Result<u64> {
        let copied = std::io::copy(&mut reader, &mut writer)?;
        let md = reader.metadata()?;
        writer.set_modified(md.modified()?)?;
        writer.set_permissions(md.permissions())?;
        Ok(copied)
    })()
    .with_msg(format!("Copying {:?} -> {:?} failed", src, dst))
    .with_partial_artifact(dst)?;

    tracing::trace!("Copied {:?} -> {:?} ({} bytes)", src, dst, copied);
    Ok(copied)
}
