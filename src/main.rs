use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use media_ingest::config::{
    DEFAULT_CONFLICT_LOG_PATH, DEFAULT_IMAGE_EXTENSIONS, DEFAULT_LEDGER_PATH,
    DEFAULT_VIDEO_EXTENSIONS,
};
use media_ingest::utils::is_dir_empty;
use media_ingest::{logging, run_ingestion, IngestConfig, RunReport};

#[derive(Parser)]
#[command(
    name = "ingest",
    version,
    about = "Copy photos and videos from camera dumps into one backup folder, without duplicates",
    long_about = "Walk one or more source trees and copy every photo and video into a single flat \
                  destination. Byte-identical photos are copied once; different files that share \
                  a name are both kept under date-prefixed names. Processed sources are remembered \
                  in a ledger so an interrupted run can simply be started again."
)]
struct Cli {
    /// Source directories to ingest from
    #[arg(
        short,
        long,
        value_name = "PATH",
        required = true,
        help = "Source directories (can be specified multiple times)"
    )]
    source: Vec<PathBuf>,

    /// Destination directory for photos
    #[arg(short, long, value_name = "PATH", help = "Destination directory for photos")]
    dest: PathBuf,

    /// Destination directory for videos
    #[arg(
        long,
        value_name = "PATH",
        help = "Destination directory for videos (defaults to --dest)"
    )]
    video_dest: Option<PathBuf>,

    /// Processed-source ledger
    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_LEDGER_PATH,
        help = "File listing sources already ingested"
    )]
    ledger: PathBuf,

    /// Conflict log
    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_CONFLICT_LOG_PATH,
        help = "Where to log photos found under more than one name"
    )]
    conflict_log: PathBuf,

    /// Photo extensions
    #[arg(
        long,
        value_delimiter = ',',
        help = "Photo file extensions (comma-separated)"
    )]
    image_ext: Vec<String>,

    /// Video extensions
    #[arg(
        long,
        value_delimiter = ',',
        help = "Video file extensions (comma-separated)"
    )]
    video_ext: Vec<String>,

    /// Skip the photo pass
    #[arg(long, help = "Do not ingest photos")]
    skip_images: bool,

    /// Skip the video pass
    #[arg(long, help = "Do not ingest videos")]
    skip_videos: bool,

    /// JSON report
    #[arg(long, value_name = "PATH", help = "Write a JSON run report to this file")]
    report: Option<PathBuf>,

    /// Skip confirmation prompts
    #[arg(short, long, help = "Skip the confirmation prompt")]
    yes: bool,

    /// Verbose output
    #[arg(short, long, help = "Log every file decision")]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> IngestConfig {
        let mut config = IngestConfig::new(self.source, self.dest);
        if let Some(video_dest) = self.video_dest {
            config.video_dest = video_dest;
        }
        config.ledger_path = self.ledger;
        config.conflict_log_path = self.conflict_log;
        config.image_extensions = or_default(self.image_ext, DEFAULT_IMAGE_EXTENSIONS);
        config.video_extensions = or_default(self.video_ext, DEFAULT_VIDEO_EXTENSIONS);
        config.images = !self.skip_images;
        config.videos = !self.skip_videos;
        config
    }
}

fn or_default(extensions: Vec<String>, defaults: &[&str]) -> Vec<String> {
    if extensions.is_empty() {
        defaults.iter().map(|ext| ext.to_string()).collect()
    } else {
        extensions
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    logging::init(args.verbose);

    let yes = args.yes;
    let report_path = args.report.clone();
    let config = args.into_config();

    if !config.images && !config.videos {
        eprintln!("{}", style("Error: nothing to do, both passes are skipped").red());
        std::process::exit(1);
    }

    if let Err(e) = config.validate() {
        eprintln!("{}", style(format!("Error: {}. Aborting.", e)).red());
        std::process::exit(1);
    }

    display_status(&config);

    if !yes {
        let proceed = dialoguer::Confirm::new()
            .with_prompt("Proceed?")
            .interact()?;

        if !proceed {
            println!("{}", style("Operation cancelled").yellow());
            return Ok(());
        }
    }

    println!("{}", style("📥 Ingesting media...").cyan().bold());

    let report = run_ingestion(&config, true).context("ingestion aborted")?;

    for pass in &report.passes {
        pass.print_summary();
    }
    display_outcome(&config, &report);

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn display_status(config: &IngestConfig) {
    println!("{}", style("========== Status ==========").cyan().bold());

    for (i, source) in config.sources.iter().enumerate() {
        println!("Source {}: {}", i + 1, source.display());
    }

    if config.images {
        println!("Photo destination: {}", describe_dest(&config.image_dest));
    }
    if config.videos {
        println!("Video destination: {}", describe_dest(&config.video_dest));
    }

    if config.ledger_path.exists() {
        println!(
            "{}",
            style(format!(
                "Previously processed sources found. To ingest everything again, delete {}.",
                config.ledger_path.display()
            ))
            .yellow()
        );
    }

    println!("{}", style("============================").cyan().bold());
}

fn describe_dest(dest: &Path) -> String {
    if is_dir_empty(dest) {
        format!("{} (empty)", dest.display())
    } else {
        format!("{} {}", dest.display(), style("**not empty**").yellow())
    }
}

fn display_outcome(config: &IngestConfig, report: &RunReport) {
    println!();
    if !report.conflicts.is_empty() {
        println!(
            "{} same-content conflicts logged to {}",
            report.conflicts.len(),
            config.conflict_log_path.display()
        );
    }
    println!(
        "{} processed sources recorded in {}",
        report.ledger_entries,
        config.ledger_path.display()
    );
    println!("{}", style("✅ All done!").green().bold());
}
