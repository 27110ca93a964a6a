//! Errors raised while loading `parkval` settings.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A settings file exists but could not be read.
    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A settings file is not valid JSON.
    #[error("settings file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The merged settings do not match the expected shape.
    #[error("invalid settings: {0}")]
    Invalid(#[from] serde_json::Error),
}
