use clap::Parser;
use snapvault::backup::backup_config::BackupConfig;
use snapvault::backup::engine::BackupEngine;
use snapvault::backup::result_error::error::Error;
use snapvault::backup::result_error::result::Result;
use snapvault::backup::result_error::WithMsg;
use snapvault::backup::scheduler::{ConfigFileSelection, Scheduler};
use snapvault::logging::init_logging;
use std::path::{Path, PathBuf};
use std::process::exit;
use tracing::error;
use validator::Validate;

/// Back up selected files and folders without ever overwriting anything
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file, created with defaults when missing
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Also write logs to backup.log in this directory
    #[arg(short, long)]
    log_dir: Option<PathBuf>,

    /// Run a single backup and exit
    #[arg(long)]
    once: bool,
}

fn prepare_config(path: &Path) -> Result<()> {
    let mut config = BackupConfig::load_or_init(path)?;
    config
        .validate()
        .map_err(Error::from)
        .with_msg(format!("Config validation failed: {:?}", path))?;
    let version = config.increment_version();
    config.save(path)?;
    tracing::info!("Backup version {}", version);
    Ok(())
}

fn main() {
    let args = Args::parse();
    let _guard = match init_logging(args.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            exit(1);
        }
    };

    if let Err(e) = prepare_config(&args.config) {
        error!("{e}");
        exit(1);
    }

    let scheduler = Scheduler::new(BackupEngine::new(), ConfigFileSelection::new(&args.config));
    if !args.once {
        scheduler.start_loop();
        return;
    }

    match scheduler.run_once() {
        Some(Ok(_)) | None => {}
        Some(Err(e)) => {
            error!("{e}");
            exit(1);
        }
    }
}
