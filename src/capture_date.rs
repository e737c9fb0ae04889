use std::fs;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};
use exif::{In, Reader, Tag, Value};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Maps a file to the calendar day it was captured, formatted `YYYYMMDD`.
///
/// Implementations must not fail on unreadable metadata; the only error left
/// to the caller is a file whose modification time cannot be read at all.
pub trait CaptureDateResolver {
    fn capture_date(&self, path: &Path) -> Result<String>;
}

/// Uses the filesystem modification time, in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModifiedTimeResolver;

impl CaptureDateResolver for ModifiedTimeResolver {
    fn capture_date(&self, path: &Path) -> Result<String> {
        modified_date(path)
    }
}

/// Reads `DateTimeOriginal`, then `DateTime`, from embedded EXIF and falls
/// back to the modification time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifDateResolver;

impl CaptureDateResolver for ExifDateResolver {
    fn capture_date(&self, path: &Path) -> Result<String> {
        if let Some(date) = read_exif_date(path) {
            return Ok(date);
        }

        debug!(path = %path.display(), "no usable EXIF date, using modification time");
        modified_date(path)
    }
}

fn modified_date(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| IngestError::ModifiedTime {
            path: path.to_path_buf(),
            source,
        })?;

    let local: DateTime<Local> = modified.into();
    Ok(local.format("%Y%m%d").to_string())
}

fn read_exif_date(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;

    [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
        .find_map(|field| match &field.value {
            Value::Ascii(values) => values.first().and_then(|raw| parse_exif_date(raw)),
            _ => None,
        })
}

/// Parse an EXIF `YYYY:MM:DD HH:MM:SS` stamp into `YYYYMMDD`.
///
/// Cameras write `0000:00:00 00:00:00` when the clock was never set, so the
/// day is validated before it is trusted.
fn parse_exif_date(raw: &[u8]) -> Option<String> {
    let stamp = exif::DateTime::from_ascii(raw).ok()?;
    let date = NaiveDate::from_ymd_opt(
        i32::from(stamp.year),
        u32::from(stamp.month),
        u32::from(stamp.day),
    )?;
    Some(date.format("%Y%m%d").to_string())
}
