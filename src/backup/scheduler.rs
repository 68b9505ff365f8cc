use crate::backup::backup_config::BackupConfig;
use crate::backup::engine::{BackupEngine, BackupTarget};
use crate::backup::result_error::result::Result;
use crate::backup::summary::BackupResult;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What to back up, where, and how often, as known right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub sources: Vec<PathBuf>,
    pub target: BackupTarget,
    pub interval: Option<Duration>,
}

pub trait SelectionSource {
    fn selection(&self) -> Result<Selection>;
}

impl SelectionSource for BackupConfig {
    fn selection(&self) -> Result<Selection> {
        Ok(Selection {
            sources: self.paths().clone(),
            target: self.target(&Local::now()),
            interval: self.backup_interval(),
        })
    }
}

/// Re-reads the config file for every run so edits apply to the next one.
#[derive(Clone, Debug)]
pub struct ConfigFileSelection {
    path: PathBuf,
}

impl ConfigFileSelection {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SelectionSource for ConfigFileSelection {
    fn selection(&self) -> Result<Selection> {
        BackupConfig::load(&self.path)?.selection()
    }
}

/// Runs the engine now and then once per interval, one run at a time.
pub struct Scheduler<S> {
    engine: BackupEngine,
    selection: S,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: SelectionSource> Scheduler<S> {
    pub fn new(engine: BackupEngine, selection: S) -> Self {
        Self {
            engine,
            selection,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Runs one backup with the current selection.
    ///
    /// `None` means the run was skipped: nothing selected, or another run still in flight.
    pub fn run_once(&self) -> Option<Result<BackupResult>> {
        match self.selection.selection() {
            Ok(selection) => self.run_selection(&selection),
            Err(e) => Some(Err(e)),
        }
    }

    fn run_selection(&self, selection: &Selection) -> Option<Result<BackupResult>> {
        if selection.sources.is_empty() {
            warn!("No sources selected, skipping backup");
            return None;
        }
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!("Previous backup still running, skipping this one");
            return None;
        };
        Some(self.engine.run(&selection.sources, &selection.target))
    }

    /// One scheduler step; returns the delay before the next step, if any.
    ///
    /// Failures are logged only. When the selection cannot be loaded, `last_interval` is kept.
    fn tick(&self, last_interval: Option<Duration>) -> Option<Duration> {
        match self.selection.selection() {
            Ok(selection) => {
                if let Some(Err(e)) = self.run_selection(&selection) {
                    debug!("Scheduled backup failed, keeping schedule: {e}");
                }
                selection.interval
            }
            Err(e) => {
                error!("Loading backup selection failed: {e}");
                last_interval
            }
        }
    }

    /// Backs up immediately, then again after every interval until none is configured.
    pub fn start_loop(&self) {
        let mut interval = None;
        loop {
            interval = self.tick(interval);
            match interval {
                Some(delay) => {
                    info!("Next backup in {:?}", delay);
                    std::thread::sleep(delay);
                }
                None => {
                    info!("No backup interval configured, not repeating");
                    return;
                }
            }
        }
    }
}
