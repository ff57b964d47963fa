//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The layered configuration could not be merged or deserialized.
    #[display("could not load configuration")]
    Load,
    /// Config files must be TOML, YAML or JSON.
    #[display("unsupported configuration file format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// A required key was not set by any layer.
    #[display("missing required setting `{_0}`")]
    Missing(#[error(not(source))] &'static str),
    /// A path setting points somewhere unusable.
    #[display("setting `{key}` is not usable: {}", path.display())]
    InvalidPath {
        #[error(not(source))]
        key: &'static str,
        #[error(not(source))]
        path: PathBuf,
    },
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
