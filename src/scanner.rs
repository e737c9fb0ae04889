use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Walks source trees and yields the files of one media class
pub struct Scanner {
    suffixes: HashSet<String>,
}

impl Scanner {
    /// Scanner accepting the given extensions, matched case-insensitively.
    /// A leading dot is optional (`".jpg"` and `"jpg"` are the same).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            suffixes: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .map(|ext| format!(".{}", ext))
                .collect(),
        }
    }

    /// Collect every matching file under `directories`, as absolute paths.
    ///
    /// Roots are visited in the order given; entries within a directory are
    /// visited in file-name order so repeated runs see the same sequence.
    pub fn scan_directories(&self, directories: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for dir in directories {
            let root = match fs::canonicalize(dir) {
                Ok(root) if root.is_dir() => root,
                Ok(_) => {
                    warn!(dir = %dir.display(), "not a directory, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "cannot resolve source directory, skipping");
                    continue;
                }
            };

            let walker = WalkDir::new(&root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file());

            for entry in walker {
                if self.matches(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        }

        debug!(count = files.len(), "candidate files found");
        files
    }

    /// Check whether the file name ends in one of the accepted extensions.
    /// A bare `.jpg` counts as a match.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.suffixes.iter().any(|suffix| name.ends_with(suffix.as_str()))
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
