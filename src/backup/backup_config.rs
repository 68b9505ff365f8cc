use crate::backup::engine::BackupTarget;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::validate::{validate_absolute_paths, validate_writable_dir};
use bon::Builder;
use chrono::{DateTime, TimeZone};
use derive_more::Display;
use getset::{CopyGetters, Getters, Setters};
use serde::{Deserialize, Serialize};
use serde_with::{skip_serializing_none, DeserializeFromStr, SerializeDisplay};
use std::fmt::Display as FmtDisplay;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tempfile::NamedTempFile;
use validator::Validate;

static TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
static DEFAULT_BACKUP_DIR: &str = "backups";

/// `<major>.<minor>` counter embedded in destination names.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, SerializeDisplay, DeserializeFromStr,
)]
#[display("{major}.{minor}")]
pub struct BackupVersion {
    major: u32,
    minor: u32,
}

impl BackupVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Bumps the minor part; once it passes `23 * major` the major part rolls over.
    pub fn next(self) -> Self {
        let minor = self.minor + 1;
        if minor > 23 * self.major {
            Self::new(self.major + 1, 0)
        } else {
            Self::new(self.major, minor)
        }
    }
}

impl Default for BackupVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl FromStr for BackupVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("invalid version {s:?}, expected <major>.<minor>"))?;
        let parse = |part: &str| {
            part.parse::<u32>()
                .map_err(|e| format!("invalid version {s:?}: {e}"))
        };
        Ok(Self::new(parse(major)?, parse(minor)?))
    }
}

/// Selection and destination settings persisted between program starts.
#[skip_serializing_none]
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Builder, Getters, CopyGetters, Setters, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    #[serde(default)]
    #[builder(default)]
    #[getset(get_copy = "pub")]
    version: BackupVersion,
    #[serde(default)]
    #[builder(default, into)]
    #[validate(custom(function = validate_absolute_paths))]
    #[getset(get = "pub", set = "pub")]
    paths: Vec<PathBuf>,
    #[serde(default)]
    #[builder(default)]
    #[getset(get_copy = "pub", set = "pub")]
    compress: bool,
    #[validate(custom(function = validate_writable_dir))]
    #[builder(into)]
    #[getset(get = "pub", set = "pub")]
    backup_dir: PathBuf,
    #[serde(default, with = "humantime_serde")]
    #[getset(set = "pub")]
    backup_interval: Option<Duration>,
}

impl BackupConfig {
    /// Default config for a file at `config_path`, backing up into a sibling `backups` folder.
    pub fn default_for<P: AsRef<Path>>(config_path: P) -> Self {
        let parent = config_path
            .as_ref()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Self::builder()
            .backup_dir(parent.join(DEFAULT_BACKUP_DIR))
            .build()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .with_msg(format!("Open config failed: {:?}", path))
            .and_then(|f| {
                serde_yml::from_reader::<_, BackupConfig>(f)
                    .map_err(Error::from)
                    .with_msg(format!("Parse YAML config failed: {:?}", path))
            })
    }

    /// Loads `path`, writing a default config there first when it does not exist.
    pub fn load_or_init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default_for(path);
        config.save(path)?;
        tracing::info!("Created default config {:?}", path);
        Ok(config)
    }

    /// Replaces `path` atomically with the YAML form of this config.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let res = (|| -> Result<()> {
            let mut tmp = NamedTempFile::new_in(dir)?;
            serde_yml::to_writer(&mut tmp, self)?;
            tmp.persist(path).map_err(|e| Error::from(e.error))?;
            Ok(())
        })();
        res.with_msg(format!("Save config failed: {:?}", path))
    }

    pub fn increment_version(&mut self) -> BackupVersion {
        self.version = self.version.next();
        self.version
    }

    /// Repetition interval; zero counts as none.
    pub fn backup_interval(&self) -> Option<Duration> {
        self.backup_interval.filter(|d| !d.is_zero())
    }

    /// `backup_<timestamp>_V<version>`, distinct across runs and program starts.
    pub fn destination_name<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: FmtDisplay,
    {
        format!("backup_{}_V{}", now.format(TIME_FORMAT), self.version)
    }

    pub fn target<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> BackupTarget
    where
        Tz::Offset: FmtDisplay,
    {
        let path = self.backup_dir.join(self.destination_name(now));
        if self.compress {
            BackupTarget::Archive(path)
        } else {
            BackupTarget::Directory(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_version_parse_and_display() {
        let version: BackupVersion = "2.17".parse().unwrap();
        assert_eq!(version, BackupVersion::new(2, 17));
        assert_eq!(version.to_string(), "2.17");

        assert!("2".parse::<BackupVersion>().is_err());
        assert!("a.1".parse::<BackupVersion>().is_err());
        assert!("1.-1".parse::<BackupVersion>().is_err());
    }

    #[test]
    fn test_version_next() {
        assert_eq!(BackupVersion::new(1, 0).next(), BackupVersion::new(1, 1));
        assert_eq!(BackupVersion::new(1, 22).next(), BackupVersion::new(1, 23));
        assert_eq!(BackupVersion::new(1, 23).next(), BackupVersion::new(2, 0));
        assert_eq!(BackupVersion::new(2, 46).next(), BackupVersion::new(3, 0));
        assert_eq!(BackupVersion::new(0, 0).next(), BackupVersion::new(1, 0));
    }

    #[test]
    fn test_parse_yaml_config() {
        let yaml = r#"
version: "1.4"
paths:
  - /home/user/documents
  - /home/user/notes.txt
compress: true
backup_dir: /var/backups/snapvault
backup_interval: 6h
"#;
        let config: BackupConfig = serde_yml::from_str(yaml).unwrap();

        assert_eq!(config.version(), BackupVersion::new(1, 4));
        assert_eq!(config.paths().len(), 2);
        assert!(config.compress());
        assert_eq!(config.backup_dir(), Path::new("/var/backups/snapvault"));
        assert_eq!(config.backup_interval(), Some(Duration::from_secs(6 * 3600)));
    }

    #[test]
    fn test_parse_minimal_yaml_config() {
        let config: BackupConfig = serde_yml::from_str("backup_dir: /tmp/b\n").unwrap();

        assert_eq!(config.version(), BackupVersion::default());
        assert!(config.paths().is_empty());
        assert!(!config.compress());
        assert_eq!(config.backup_interval(), None);
    }

    #[test]
    fn test_zero_interval_disables_repetition() {
        let config: BackupConfig =
            serde_yml::from_str("backup_dir: /tmp/b\nbackup_interval: 0s\n").unwrap();
        assert_eq!(config.backup_interval(), None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let res = serde_yml::from_str::<BackupConfig>("backup_dir: /tmp/b\ncron: '* * *'\n");
        assert!(res.is_err());
    }

    #[test]
    fn test_load_or_init_creates_default() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");

        let config = BackupConfig::load_or_init(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.backup_dir(), &temp_dir.path().join("backups"));
        assert_eq!(BackupConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");
        let mut config = BackupConfig::builder()
            .backup_dir(temp_dir.path().join("out"))
            .paths(vec![temp_dir.path().join("docs")])
            .compress(true)
            .backup_interval(Duration::from_secs(90))
            .build();
        config.increment_version();

        config.save(&path).unwrap();
        let loaded = BackupConfig::load(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.version(), BackupVersion::new(1, 1));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");
        std::fs::write(&path, "paths: [unclosed").unwrap();

        let err = BackupConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Parse YAML config failed"));
    }

    #[test]
    fn test_validate() {
        let temp_dir = TempDir::new().unwrap();
        let config = BackupConfig::builder()
            .backup_dir(temp_dir.path().join("created"))
            .paths(vec![PathBuf::from("/abs/path")])
            .build();
        assert!(config.validate().is_ok());
        assert!(temp_dir.path().join("created").is_dir());

        let config = BackupConfig::builder()
            .backup_dir(temp_dir.path())
            .paths(vec![PathBuf::from("relative")])
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_destination_name_and_target() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let mut config = BackupConfig::builder().backup_dir("/b").build();

        assert_eq!(config.destination_name(&now), "backup_2024-03-09_14-05-07_V1.0");
        assert_eq!(
            config.target(&now),
            BackupTarget::Directory(PathBuf::from("/b/backup_2024-03-09_14-05-07_V1.0"))
        );

        config.set_compress(true);
        config.increment_version();
        assert_eq!(
            config.target(&now),
            BackupTarget::Archive(PathBuf::from("/b/backup_2024-03-09_14-05-07_V1.1"))
        );
    }
}
