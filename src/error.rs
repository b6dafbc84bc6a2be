use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a PDF export was abandoned. Nothing is left on disk in any case.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("export worker stopped: {0}")]
    Worker(String),
}

#[derive(Debug, Error)]
pub enum LogoError {
    #[error("Please select an image file ({} is not one)", path.display())]
    NotAnImage { path: PathBuf },

    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
