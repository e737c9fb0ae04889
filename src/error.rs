use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort an ingestion run.
///
/// Metadata problems never show up here: the capture-date resolvers absorb
/// them and fall back to the filesystem modification time.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to fingerprint {}: {source}", .path.display())]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read modification time of {}: {source}", .path.display())]
    ModifiedTime {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read ledger {}: {source}", .path.display())]
    LedgerRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write ledger {}: {source}", .path.display())]
    LedgerWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write conflict log {}: {source}", .path.display())]
    ConflictLog {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source directory {} does not exist", .0.display())]
    MissingSource(PathBuf),

    #[error("destination directory {} does not exist", .0.display())]
    MissingDestination(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("{} has no file name", .0.display())]
    InvalidPath(PathBuf),
}

pub type Result<T> = std::result::Result<T, IngestError>;
