//! # snapvault
//!
//! Copies a selection of files and folders into a fresh, timestamped backup, either as a plain
//! directory tree or as a single ZIP archive. Nothing that already exists is ever overwritten:
//! colliding names get a ` (n)` suffix.
//!
//! ## Features
//!
//! - **Two modes**: directory copy or Deflate-compressed ZIP archive
//! - **Collision-free naming**: `report.txt` becomes `report (1).txt` on conflict
//! - **Scheduling**: repeat on a fixed interval, re-reading the selection before each run
//! - **Versioned destinations**: `backup_<timestamp>_V<major>.<minor>`
//!
//! ## Quick Start
//!
//! ```no_run
//! use snapvault::backup::backup_config::BackupConfig;
//! use snapvault::backup::engine::BackupEngine;
//! use snapvault::backup::scheduler::{ConfigFileSelection, Scheduler};
//!
//! let mut config = BackupConfig::load_or_init("config.yml")?;
//! config.increment_version();
//! config.save("config.yml")?;
//!
//! let scheduler = Scheduler::new(BackupEngine::new(), ConfigFileSelection::new("config.yml"));
//! scheduler.start_loop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
pub mod logging;
