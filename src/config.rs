use std::path::PathBuf;

use crate::error::{IngestError, Result};

pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "cr2", "heic", "heif"];
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];
pub const DEFAULT_LEDGER_PATH: &str = "seen_sources.txt";
pub const DEFAULT_CONFLICT_LOG_PATH: &str = "conflict_log.txt";

/// Settings for one ingestion run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub sources: Vec<PathBuf>,
    pub image_dest: PathBuf,
    pub video_dest: PathBuf,
    pub ledger_path: PathBuf,
    pub conflict_log_path: PathBuf,
    pub image_extensions: Vec<String>,
    pub video_extensions: Vec<String>,
    pub images: bool,
    pub videos: bool,
}

impl IngestConfig {
    /// Config with default paths and extension lists; videos share the image destination.
    pub fn new(sources: Vec<PathBuf>, dest: PathBuf) -> Self {
        Self {
            sources,
            video_dest: dest.clone(),
            image_dest: dest,
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            conflict_log_path: PathBuf::from(DEFAULT_CONFLICT_LOG_PATH),
            image_extensions: to_owned(DEFAULT_IMAGE_EXTENSIONS),
            video_extensions: to_owned(DEFAULT_VIDEO_EXTENSIONS),
            images: true,
            videos: true,
        }
    }

    /// Pre-flight checks; nothing is ingested unless these pass.
    pub fn validate(&self) -> Result<()> {
        for source in &self.sources {
            if !source.exists() {
                return Err(IngestError::MissingSource(source.clone()));
            }
            if !source.is_dir() {
                return Err(IngestError::NotADirectory(source.clone()));
            }
        }

        let mut dests = Vec::new();
        if self.images {
            dests.push(&self.image_dest);
        }
        if self.videos {
            dests.push(&self.video_dest);
        }

        for dest in dests {
            if !dest.exists() {
                return Err(IngestError::MissingDestination(dest.clone()));
            }
            if !dest.is_dir() {
                return Err(IngestError::NotADirectory(dest.clone()));
            }
        }

        Ok(())
    }
}

fn to_owned(extensions: &[&str]) -> Vec<String> {
    extensions.iter().map(|ext| ext.to_string()).collect()
}
