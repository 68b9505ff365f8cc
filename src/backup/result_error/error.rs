use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg, WithPartialArtifact};
use derive_more::Display;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use thiserror::Error;
use zip::result::ZipError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    #[error(transparent)]
    Zip(#[from] ZipError),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    SerdeYml(#[from] serde_yml::Error),
    #[error("Invalid source {path:?}: {reason}")]
    SourceInvalid { path: PathBuf, reason: String },
    #[error("Destination conflict at {path:?}: {reason}")]
    DestinationConflict { path: PathBuf, reason: String },
    #[error("Archive integrity fault: {0}")]
    ArchiveCorrupt(String),
    #[error("{}:\n{}", msg, indent::indent_all_with("  ", error.to_string()))]
    WithMsg { msg: String, error: Box<Error> },
    #[error("{:?} {} failed:\n{}", obj_debug, fn_name, indent::indent_all_with("  ", error.to_string()))]
    WithDebugObjAndFnName {
        error: Box<Error>,
        obj_debug: Box<dyn Debug + Send>,
        fn_name: String,
    },
    #[error("Partial output left at {:?}:\n{}", path, indent::indent_all_with("  ", error.to_string()))]
    PartialArtifact { path: PathBuf, error: Box<Error> },
}

/// Failure categories a run can end with.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[display("source invalid")]
    SourceInvalid,
    #[display("destination conflict")]
    DestinationConflict,
    #[display("permission denied")]
    PermissionDenied,
    #[display("archive corrupt")]
    ArchiveCorrupt,
    #[display("unclassified")]
    Unclassified,
}

impl ErrorKind {
    fn of_io(error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            std::io::ErrorKind::AlreadyExists => ErrorKind::DestinationConflict,
            _ => ErrorKind::Unclassified,
        }
    }
}

impl<S: Into<String>, O: Debug + Send + 'static> WithDebugObjectAndFnName<S, O> for Error {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self {
        Error::WithDebugObjAndFnName {
            error: Box::new(self),
            obj_debug: Box::new(obj),
            fn_name: fn_name.into(),
        }
    }
}

impl<S: Into<String>> WithMsg<S> for Error {
    fn with_msg(self, msg: S) -> Self {
        Self::WithMsg {
            msg: msg.into(),
            error: Box::new(self),
        }
    }
}

impl<P: Into<PathBuf>> WithPartialArtifact<P> for Error {
    fn with_partial_artifact(self, path: P) -> Self {
        Self::PartialArtifact {
            path: path.into(),
            error: Box::new(self),
        }
    }
}

impl Error {
    pub fn source_invalid<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::SourceInvalid {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn destination_conflict<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::DestinationConflict {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Converts a failure to create `path` exclusively, keeping the path when it already exists.
    pub fn on_create<P: AsRef<Path>>(path: P, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::AlreadyExists => Self::destination_conflict(path, "already exists"),
            _ => Self::from(error).with_msg(format!("Creating {:?} failed", path.as_ref())),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(e) => ErrorKind::of_io(e),
            Error::WalkDir(e) => {
                if e.loop_ancestor().is_some() {
                    ErrorKind::SourceInvalid
                } else {
                    match e.io_error() {
                        Some(io) if io.kind() == std::io::ErrorKind::NotFound => {
                            ErrorKind::SourceInvalid
                        }
                        Some(io) => ErrorKind::of_io(io),
                        None => ErrorKind::Unclassified,
                    }
                }
            }
            Error::Zip(e) => match e {
                ZipError::Io(io) => ErrorKind::of_io(io),
                ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
                    ErrorKind::ArchiveCorrupt
                }
                _ => ErrorKind::Unclassified,
            },
            Error::ValidationError(_) | Error::SerdeYml(_) => ErrorKind::Unclassified,
            Error::SourceInvalid { .. } => ErrorKind::SourceInvalid,
            Error::DestinationConflict { .. } => ErrorKind::DestinationConflict,
            Error::ArchiveCorrupt(_) => ErrorKind::ArchiveCorrupt,
            Error::WithMsg { error, .. }
            | Error::WithDebugObjAndFnName { error, .. }
            | Error::PartialArtifact { error, .. } => error.kind(),
        }
    }

    /// Path of the output a failed run left behind, if any.
    pub fn partial_artifact(&self) -> Option<&Path> {
        match self {
            Error::PartialArtifact { path, .. } => Some(path.as_path()),
            Error::WithMsg { error, .. } | Error::WithDebugObjAndFnName { error, .. } => {
                error.partial_artifact()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io(kind: std::io::ErrorKind) -> Error {
        Error::from(std::io::Error::new(kind, "boom"))
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error);

        match error {
            Error::Io(_) => (),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_kind_mapping() {
        assert_eq!(
            io(std::io::ErrorKind::PermissionDenied).kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            io(std::io::ErrorKind::AlreadyExists).kind(),
            ErrorKind::DestinationConflict
        );
        assert_eq!(io(std::io::ErrorKind::Other).kind(), ErrorKind::Unclassified);
    }

    #[test]
    fn test_zip_kind_mapping() {
        let error = Error::from(ZipError::UnsupportedArchive("bad"));
        assert_eq!(error.kind(), ErrorKind::ArchiveCorrupt);

        let error = Error::from(ZipError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "nope",
        )));
        assert_eq!(error.kind(), ErrorKind::PermissionDenied);

        assert_eq!(Error::from(ZipError::FileNotFound).kind(), ErrorKind::Unclassified);
    }

    #[test]
    fn test_kind_survives_wrapping() {
        let error = Error::source_invalid("/missing", "does not exist")
            .with_msg("Backing up failed")
            .with_debug_object_and_fn_name("target", "run")
            .with_partial_artifact("/tmp/out");
        assert_eq!(error.kind(), ErrorKind::SourceInvalid);
    }

    #[test]
    fn test_partial_artifact_through_wrappers() {
        let error = io(std::io::ErrorKind::Other)
            .with_partial_artifact("/tmp/out.zip")
            .with_msg("Writing archive failed");
        assert_eq!(error.partial_artifact(), Some(Path::new("/tmp/out.zip")));
        assert!(io(std::io::ErrorKind::Other).partial_artifact().is_none());
    }

    #[test]
    fn test_on_create_keeps_conflicting_path() {
        let error = Error::on_create(
            "/dst/photos",
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists"),
        );
        match &error {
            Error::DestinationConflict { path, .. } => assert_eq!(path, Path::new("/dst/photos")),
            _ => panic!("Expected DestinationConflict"),
        }

        let error = Error::on_create(
            "/dst/photos",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(error.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_error_with_msg_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::from(io_error);
        let error_with_msg = error.with_msg("Operation failed");
        let error_str = error_with_msg.to_string();

        assert!(error_str.contains("Operation failed"));
        assert!(error_str.contains("file not found"));
    }

    #[test]
    fn test_error_with_debug_display() {
        let error = io(std::io::ErrorKind::NotFound);
        let error_with_debug = error.with_debug_object_and_fn_name(42, "test_function");
        let error_str = error_with_debug.to_string();

        assert!(error_str.contains("test_function"));
        assert!(error_str.contains("failed"));
        assert!(error_str.contains("boom"));
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::SourceInvalid.to_string(), "source invalid");
        assert_eq!(ErrorKind::ArchiveCorrupt.to_string(), "archive corrupt");
    }
}
