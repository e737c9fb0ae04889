use std::fs;
use std::path::Path;

use console::style;
use serde::Serialize;

use crate::error::{IngestError, Result};
use crate::utils::format_file_size;
use crate::{IngestAction, MediaClass};

/// Tally of one media pass
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub class: MediaClass,
    pub candidates: usize,
    pub copied: usize,
    pub renamed: usize,
    pub previous_renamed: usize,
    pub skipped_seen: usize,
    pub skipped_duplicate: usize,
    pub same_content: usize,
    pub bytes_copied: u64,
}

impl PassSummary {
    pub fn new(class: MediaClass) -> Self {
        Self {
            class,
            candidates: 0,
            copied: 0,
            renamed: 0,
            previous_renamed: 0,
            skipped_seen: 0,
            skipped_duplicate: 0,
            same_content: 0,
            bytes_copied: 0,
        }
    }

    pub fn record(&mut self, action: &IngestAction) {
        self.candidates += 1;
        match action {
            IngestAction::SkipSeen => self.skipped_seen += 1,
            IngestAction::SkipDuplicate { .. } => self.skipped_duplicate += 1,
            IngestAction::SameContent { .. } => self.same_content += 1,
            IngestAction::Copied { bytes, .. } => {
                self.copied += 1;
                self.bytes_copied += bytes;
            }
            IngestAction::Renamed {
                bytes, previous, ..
            } => {
                self.renamed += 1;
                self.bytes_copied += bytes;
                if previous.is_some() {
                    self.previous_renamed += 1;
                }
            }
        }
    }

    /// Files written to the destination in this pass
    pub fn files_written(&self) -> usize {
        self.copied + self.renamed
    }

    pub fn print_summary(&self) {
        println!();
        println!(
            "{}",
            style(format!("📊 {} summary", capitalize(&self.class.to_string()))).green().bold()
        );
        println!("{}", style("-".repeat(20)).green());
        println!("Candidates: {}", self.candidates);
        println!("Copied: {}", self.copied);
        println!(
            "Renamed on collision: {} (earlier copies renamed: {})",
            self.renamed, self.previous_renamed
        );
        println!("Already processed: {}", self.skipped_seen);
        println!("Duplicates skipped: {}", self.skipped_duplicate);
        if matches!(self.class, MediaClass::Image) {
            println!("Same photo, different name: {}", self.same_content);
        }
        println!("Data copied: {}", format_file_size(self.bytes_copied));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub passes: Vec<PassSummary>,
    pub conflicts: Vec<String>,
    pub ledger_entries: usize,
}

impl RunReport {
    pub fn files_written(&self) -> usize {
        self.passes.iter().map(PassSummary::files_written).sum()
    }
}

/// Write the conflict log, one line per event, replacing any earlier log.
///
/// Nothing is written when there are no conflicts; returns whether a file was
/// written.
pub fn write_conflict_log(path: &Path, conflicts: &[String]) -> Result<bool> {
    if conflicts.is_empty() {
        return Ok(false);
    }

    fs::write(path, conflicts.join("\n")).map_err(|source| IngestError::ConflictLog {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}
