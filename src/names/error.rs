use std::path::PathBuf;

use crate::fsutil::FileReadError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to list interfaces in `{path}`: {source}")]
    ListInterfaces {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Read(#[from] FileReadError),
    #[error("failed to read lease file `{path}`: {source}")]
    ReadLeases {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lease file path `{0}` has no file name or parent directory")]
    InvalidLeasePath(PathBuf),
    #[error("failed to watch `{path}`: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
