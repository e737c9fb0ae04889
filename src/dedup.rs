use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::capture_date::{CaptureDateResolver, ExifDateResolver, ModifiedTimeResolver};
use crate::config::IngestConfig;
use crate::engine::IngestEngine;
use crate::error::Result;
use crate::ledger::ProcessedLedger;
use crate::report::{write_conflict_log, PassSummary, RunReport};
use crate::scanner::Scanner;
use crate::MediaClass;

/// Run every candidate through the engine, in order.
///
/// The ledger is written when the pass completes and also when it aborts, so
/// a retried run resumes after the last completed candidate.
pub fn perform_ingestion<R: CaptureDateResolver>(
    engine: &mut IngestEngine<R>,
    candidates: &[PathBuf],
    show_progress: bool,
) -> Result<PassSummary> {
    let progress = if show_progress {
        ProgressBar::new(candidates.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut summary = PassSummary::new(engine.class());

    for candidate in candidates {
        progress.set_message(candidate.display().to_string());

        match engine.ingest(candidate) {
            Ok(action) => summary.record(&action),
            Err(e) => {
                progress.abandon_with_message("aborted");
                error!(source = %candidate.display(), error = %e, "ingestion aborted");

                if let Err(flush) = engine.ledger().persist() {
                    error!(error = %flush, "could not save ledger after abort");
                }
                return Err(e);
            }
        }

        progress.inc(1);
    }

    progress.finish_with_message("done");
    engine.ledger().persist()?;

    info!(
        class = %engine.class(),
        candidates = summary.candidates,
        written = summary.files_written(),
        "pass complete"
    );
    Ok(summary)
}

/// Image pass, then video pass, sharing one ledger. The conflict log is
/// written as soon as a pass that found conflicts ends, whether it completed
/// or aborted.
pub fn run_ingestion(config: &IngestConfig, show_progress: bool) -> Result<RunReport> {
    let mut ledger = ProcessedLedger::load(&config.ledger_path)?;
    let mut passes = Vec::new();
    let mut conflicts = Vec::new();

    if config.images {
        let candidates = Scanner::new(&config.image_extensions).scan_directories(&config.sources);
        info!(count = candidates.len(), "starting image pass");

        let mut engine = IngestEngine::new(
            MediaClass::Image,
            &config.image_dest,
            ExifDateResolver,
            ledger,
        );
        let pass = perform_ingestion(&mut engine, &candidates, show_progress);
        let (returned, found) = engine.into_parts();
        ledger = returned;
        conflicts.extend(found);

        // Sources behind these lines are already in the ledger; keep the lines
        // even if this or the next pass fails.
        let saved = save_conflicts(config, &conflicts);
        passes.push(pass?);
        saved?;
    }

    if config.videos {
        let candidates = Scanner::new(&config.video_extensions).scan_directories(&config.sources);
        info!(count = candidates.len(), "starting video pass");

        let mut engine = IngestEngine::new(
            MediaClass::Video,
            &config.video_dest,
            ModifiedTimeResolver,
            ledger,
        );
        let pass = perform_ingestion(&mut engine, &candidates, show_progress);
        let (returned, found) = engine.into_parts();
        ledger = returned;

        let saved = if found.is_empty() {
            Ok(())
        } else {
            conflicts.extend(found);
            save_conflicts(config, &conflicts)
        };
        passes.push(pass?);
        saved?;
    }

    Ok(RunReport {
        passes,
        conflicts,
        ledger_entries: ledger.len(),
    })
}

fn save_conflicts(config: &IngestConfig, conflicts: &[String]) -> Result<()> {
    match write_conflict_log(&config.conflict_log_path, conflicts) {
        Ok(true) => {
            info!(
                log = %config.conflict_log_path.display(),
                count = conflicts.len(),
                "conflicts logged"
            );
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(e) => {
            error!(error = %e, "could not save conflict log");
            Err(e)
        }
    }
}
