//! Error types for AutoSky

use std::path::PathBuf;
use thiserror::Error;

use crate::vmf::ParseError;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad paths, or input and output being the same file
    #[error("{0}")]
    Validation(String),

    #[error("An error occurred parsing {}:\n\n{source}\n\nIf you're sure your VMF isn't corrupt or improperly formatted, please report this issue with the VMF attached and the command line you used.", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Cannot build a skybox room: {0}")]
    DegenerateRoom(String),

    #[error("Cannot compute bounds of an empty set of objects")]
    EmptyInput,

    #[error("The model {0} already has a replacement; remove it first")]
    DuplicateKey(String),

    #[error("The model {0} is part of the built-in replacement index and cannot be removed")]
    BuiltinImmutable(String),

    #[error("Could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("A skybox is already being generated")]
    Busy,

    /// A confirmation was answered "no"; Not a failure
    #[error("Cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Settings(err.to_string())
    }
}
