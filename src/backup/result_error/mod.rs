use std::fmt::Debug;
use std::path::PathBuf;
pub mod error;
pub mod result;

pub trait WithDebugObjectAndFnName<S: Into<String>, O: Debug + 'static> {
    fn with_debug_object_and_fn_name(self, obj: O, fn_name: S) -> Self;
}

pub trait WithMsg<S: Into<String>> {
    fn with_msg(self, msg: S) -> Self;
}

/// Marks an error as having left partially written output at `path`.
pub trait WithPartialArtifact<P: Into<PathBuf>> {
    fn with_partial_artifact(self, path: P) -> Self;
}
