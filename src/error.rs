use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Nothing in here is fatal to the process: file-access failures are
/// surfaced and the operation continues, parse failures are treated as
/// "no signal", and a missing configuration refuses the operation up front.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("file access failed for {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse {what}")]
    Parse { what: &'static str },

    #[error("no game config folder has been chosen")]
    MissingConfiguration,
}

impl AppError {
    pub fn file_access(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
