use std::path::PathBuf;

use thiserror::Error;

/// Library error type for folder selection.
#[derive(Debug, Error)]
pub enum Error {
    /// The selected folder is missing or not a directory.
    #[error("invalid video folder: {}", .0.display())]
    BadFolder(PathBuf),

    /// The scan completed but found nothing playable.
    #[error("no eligible items found in {}", .0.display())]
    EmptySelection(PathBuf),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
