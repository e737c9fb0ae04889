use std::fs;
use std::path::Path;

use filetime::FileTime;
use tracing::warn;

use crate::error::{IngestError, Result};

/// Copy a file byte for byte, carrying over permissions and timestamps.
///
/// Permission bits come along with `fs::copy`; access and modification times
/// are restored afterwards on a best-effort basis. Returns the bytes written.
pub fn copy_preserving(source: &Path, dest: &Path) -> Result<u64> {
    let bytes = fs::copy(source, dest).map_err(|source_err| IngestError::Copy {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: source_err,
    })?;

    match fs::metadata(source) {
        Ok(metadata) => {
            let accessed = FileTime::from_last_access_time(&metadata);
            let modified = FileTime::from_last_modification_time(&metadata);
            if let Err(e) = filetime::set_file_times(dest, accessed, modified) {
                warn!(dest = %dest.display(), error = %e, "could not preserve timestamps");
            }
        }
        Err(e) => {
            warn!(source = %source.display(), error = %e, "could not read source timestamps");
        }
    }

    Ok(bytes)
}

/// Rename a file that already sits in the destination directory.
pub fn rename_in_place(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|source| IngestError::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}
