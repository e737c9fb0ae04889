pub mod actions;
pub mod capture_date;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod ledger;
pub mod logging;
pub mod report;
pub mod scanner;
pub mod utils;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

pub use capture_date::{CaptureDateResolver, ExifDateResolver, ModifiedTimeResolver};
pub use config::IngestConfig;
pub use dedup::{perform_ingestion, run_ingestion};
pub use engine::IngestEngine;
pub use error::IngestError;
pub use fingerprint::{fingerprint_file, Fingerprint};
pub use ledger::ProcessedLedger;
pub use report::{PassSummary, RunReport};
pub use scanner::Scanner;

/// The two kinds of media handled in separate passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    /// Photos: deduplicated by content fingerprint, dated from EXIF
    Image,
    /// Videos: deduplicated by file name only, dated from modification time
    Video,
}

impl MediaClass {
    /// Whether candidates of this class are compared by content
    pub fn fingerprints(self) -> bool {
        matches!(self, MediaClass::Image)
    }
}

impl fmt::Display for MediaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaClass::Image => f.write_str("image"),
            MediaClass::Video => f.write_str("video"),
        }
    }
}

/// What the engine did with one candidate file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestAction {
    /// Source already recorded in the ledger; nothing was read
    SkipSeen,
    /// Identical content is already in the destination
    SkipDuplicate { existing: Option<PathBuf> },
    /// Copied under its own name
    Copied { dest: PathBuf, bytes: u64 },
    /// Name collision with different content: copied under a dated name,
    /// and the previous occupant moved to `previous` if it was still there
    Renamed {
        dest: PathBuf,
        previous: Option<PathBuf>,
        bytes: u64,
    },
    /// New name, but the content is already present under `matches`
    SameContent { matches: Vec<String> },
}
