use std::fs;
use std::path::{Path, PathBuf};

use humansize::{format_size, DECIMAL};

use crate::error::{IngestError, Result};

/// Format file size in human-readable format
pub fn format_file_size(size: u64) -> String {
    format_size(size, DECIMAL)
}

/// Base name of a path as an owned string.
pub fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| IngestError::InvalidPath(path.to_path_buf()))
}

/// `{date}_{name}`, the label given to both sides of a name collision.
pub fn date_prefixed_name(date: &str, name: &str) -> String {
    format!("{}_{}", date, name)
}

/// Split filename into stem and extension; the extension keeps its dot.
fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => filename.split_at(dot_pos),
        _ => (filename, ""),
    }
}

/// First free path for `name` inside `dir`.
///
/// The plain name is tried first, then `{stem}_0{ext}`, `{stem}_1{ext}`, ...
/// The counter always starts again from zero.
pub fn unique_destination(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if !path.exists() {
        return path;
    }

    let (stem, ext) = split_filename(name);
    let mut counter: u64 = 0;

    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Whether a directory has no entries; unreadable directories count as non-empty.
pub fn is_dir_empty(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
