use derive_more::Add;
use getset::CopyGetters;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Running file and byte totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Add, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Tally {
    files: u64,
    bytes: u64,
}

impl Tally {
    pub fn new(files: u64, bytes: u64) -> Self {
        Self { files, bytes }
    }

    pub fn single(bytes: u64) -> Self {
        Self::new(1, bytes)
    }
}

/// Outcome of one successful run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct BackupResult {
    file_count: u64,
    total_bytes: u64,
    duration: Duration,
}

impl BackupResult {
    pub fn new(tally: Tally, duration: Duration) -> Self {
        Self {
            file_count: tally.files,
            total_bytes: tally.bytes,
            duration,
        }
    }
}

impl Display for BackupResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} files ({}) in {:.2} seconds",
            self.file_count,
            human_size(self.total_bytes),
            self.duration.as_secs_f64()
        )
    }
}

static SIZE_UNITS: [&str; 6] = ["bytes", "KB", "MB", "GB", "TB", "PB"];

/// Formats a byte count with a base-1024 unit and two decimals, e.g. `1.50 KB`.
pub fn human_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 bytes".to_owned();
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, SIZE_UNITS[unit])
}
