use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{IngestError, Result};

/// Source paths already ingested by this or an earlier run.
///
/// Persisted as one path per line in discovery order. A path in the ledger is
/// never inspected again, which is what makes an aborted run resumable.
///
/// On unix the raw path bytes are written, so paths that are not valid UTF-8
/// still match their source on the next run.
#[derive(Debug)]
pub struct ProcessedLedger {
    path: PathBuf,
    order: Vec<PathBuf>,
    members: HashSet<PathBuf>,
}

impl ProcessedLedger {
    /// Empty ledger that will be persisted to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            order: Vec::new(),
            members: HashSet::new(),
        }
    }

    /// Load the ledger at `path`, treating a missing file as empty.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let mut ledger = Self::new(path);

        let contents = match fs::read(&ledger.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(ledger = %ledger.path.display(), "no ledger yet, starting empty");
                return Ok(ledger);
            }
            Err(source) => {
                return Err(IngestError::LedgerRead {
                    path: ledger.path,
                    source,
                })
            }
        };

        for line in contents.split(|&b| b == b'\n') {
            let line = trim_ascii(line);
            if !line.is_empty() {
                ledger.record(&path_from_bytes(line));
            }
        }

        info!(
            ledger = %ledger.path.display(),
            entries = ledger.len(),
            "loaded processed-source ledger"
        );
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, source: &Path) -> bool {
        self.members.contains(source)
    }

    /// Record a source; returns `false` if it was already present.
    pub fn record(&mut self, source: &Path) -> bool {
        if !self.members.insert(source.to_path_buf()) {
            return false;
        }
        self.order.push(source.to_path_buf());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.order.iter().map(PathBuf::as_path)
    }

    /// Render the ledger exactly as it is written to disk.
    pub fn render(&self) -> Vec<u8> {
        self.order
            .iter()
            .map(|p| path_to_bytes(p))
            .collect::<Vec<_>>()
            .join(&b'\n')
    }

    /// Overwrite the ledger file with the current contents.
    pub fn persist(&self) -> Result<()> {
        fs::write(&self.path, self.render()).map_err(|source| IngestError::LedgerWrite {
            path: self.path.clone(),
            source,
        })?;

        info!(
            ledger = %self.path.display(),
            entries = self.len(),
            "processed-source ledger written"
        );
        Ok(())
    }
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if !first.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    while let [rest @ .., last] = bytes {
        if !last.is_ascii_whitespace() {
            break;
        }
        bytes = rest;
    }
    bytes
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_str() {
        Some(text) => Cow::Borrowed(text.as_bytes()),
        None => {
            tracing::warn!(
                source = %path.display(),
                "path is not valid UTF-8, ledger entry will not match on reload"
            );
            Cow::Owned(path.to_string_lossy().into_owned().into_bytes())
        }
    }
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}
