use crate::backup::naming::{ArchiveNamespace, NameResolver};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::source::SourceFile;
use chrono::{DateTime, Datelike, Local, Timelike};
use std::fs::File;
use std::io::{Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Suffix appended to the destination base name in archive mode.
pub static ARCHIVE_SUFFIX: &str = ".zip";

/// Entries at or above this size need ZIP64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Writes source files into a ZIP archive under names that stay unique for the whole run.
pub struct ZipArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    namespace: ArchiveNamespace,
    entry_count: usize,
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            namespace: ArchiveNamespace::new(),
            entry_count: 0,
        }
    }

    /// Appends `file` under its resolved archive name and returns the bytes written.
    pub fn append(&mut self, file: &SourceFile, resolver: &NameResolver) -> Result<u64> {
        let name = resolver.resolve(&mut self.namespace, file.archive_name().as_str(), file.absolute());
        let mut reader = File::open(file.absolute())
            .map_err(Error::from)
            .with_msg(format!("Opening {:?} failed", file.absolute()))?;
        let options = entry_options(&reader, file.size());

        self.zip.start_file(name.as_str(), options)?;
        let written = std::io::copy(&mut reader, &mut self.zip)
            .map_err(Error::from)
            .with_msg(format!("Writing {:?} as {} failed", file.absolute(), name))?;
        tracing::trace!("Archived {:?} as {} ({} bytes)", file.absolute(), name, written);

        self.entry_count += 1;
        Ok(written)
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Writes the central directory and hands back the underlying writer.
    pub fn finish(self) -> Result<W> {
        tracing::info!("Processed {} archive entries", self.entry_count);
        Ok(self.zip.finish()?)
    }
}

fn entry_options(reader: &File, size: u64) -> SimpleFileOptions {
    let mut options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(size >= ZIP64_THRESHOLD);

    if let Ok(md) = reader.metadata() {
        if let Some(modified) = md.modified().ok().and_then(zip_date_time) {
            options = options.last_modified_time(modified);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            options = options.unix_permissions(md.permissions().mode());
        }
    }

    options
}

/// ZIP timestamps cover 1980 to 2107 in local time; anything else keeps the writer's default.
fn zip_date_time(time: std::time::SystemTime) -> Option<zip::DateTime> {
    let local: DateTime<Local> = time.into();
    let year = u16::try_from(local.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}
