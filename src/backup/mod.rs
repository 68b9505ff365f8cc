pub mod backup_config;
pub mod engine;
pub mod naming;
pub mod notifications;
pub mod result_error;
pub mod scheduler;
pub mod source;
pub mod summary;
pub mod validate;
pub mod zip;

macro_rules! function_path {
    () => {
        concat!(module_path!(), "::", function_name!(), " ", file!(), ":", line!())
    };
}

pub(crate) use function_path;
