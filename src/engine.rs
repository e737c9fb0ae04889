use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::actions::{copy_preserving, rename_in_place};
use crate::capture_date::CaptureDateResolver;
use crate::error::Result;
use crate::fingerprint::{fingerprint_file, Fingerprint};
use crate::ledger::ProcessedLedger;
use crate::utils::{date_prefixed_name, file_name_of, unique_destination};
use crate::{IngestAction, MediaClass};

/// What currently occupies a destination file name.
///
/// `fingerprint` is absent for videos; `dest` is absent when the name was
/// registered without a copy being written, or its file has since been renamed.
#[derive(Debug, Clone)]
struct NameEntry {
    fingerprint: Option<Fingerprint>,
    dest: Option<PathBuf>,
}

/// Decides, one candidate at a time, whether a source file is copied, skipped
/// or renamed, and keeps the run-scoped indexes that decision depends on.
///
/// The name and content indexes live only as long as the engine. The ledger
/// is the one piece of state that outlives a run.
pub struct IngestEngine<R> {
    class: MediaClass,
    dest_dir: PathBuf,
    resolver: R,
    ledger: ProcessedLedger,
    names: HashMap<String, NameEntry>,
    hashes: HashMap<Fingerprint, Vec<String>>,
    conflicts: Vec<String>,
}

impl<R: CaptureDateResolver> IngestEngine<R> {
    pub fn new(
        class: MediaClass,
        dest_dir: impl Into<PathBuf>,
        resolver: R,
        ledger: ProcessedLedger,
    ) -> Self {
        Self {
            class,
            dest_dir: dest_dir.into(),
            resolver,
            ledger,
            names: HashMap::new(),
            hashes: HashMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn class(&self) -> MediaClass {
        self.class
    }

    pub fn ledger(&self) -> &ProcessedLedger {
        &self.ledger
    }

    /// "Different filename, same photo" lines gathered so far
    pub fn conflicts(&self) -> &[String] {
        &self.conflicts
    }

    /// Hand back the ledger and conflict lines once the pass is over
    pub fn into_parts(self) -> (ProcessedLedger, Vec<String>) {
        (self.ledger, self.conflicts)
    }

    /// Process one candidate source file.
    ///
    /// Any I/O failure is returned as-is; filesystem changes already made for
    /// this candidate are not rolled back and the source is not recorded.
    pub fn ingest(&mut self, source: &Path) -> Result<IngestAction> {
        if self.ledger.contains(source) {
            debug!(source = %source.display(), "already processed, skipping");
            return Ok(IngestAction::SkipSeen);
        }

        let name = file_name_of(source)?;
        let fingerprint = if self.class.fingerprints() {
            Some(fingerprint_file(source)?)
        } else {
            None
        };

        if !self.names.contains_key(&name) {
            if let Some(action) = self.adopt_existing(source, &name)? {
                self.ledger.record(source);
                return Ok(action);
            }
        }

        let action = match self.names.get(&name).cloned() {
            Some(previous) => self.resolve_collision(source, &name, fingerprint, previous)?,
            None => self.place_new(source, &name, fingerprint)?,
        };

        self.ledger.record(source);
        Ok(action)
    }

    /// Register a file an earlier run left under `name`, so it is compared
    /// against instead of overwritten.
    ///
    /// Videos carry no fingerprint in the index, so the two files are compared
    /// here: a byte-identical video is skipped on the spot.
    fn adopt_existing(&mut self, source: &Path, name: &str) -> Result<Option<IngestAction>> {
        let on_disk = self.dest_dir.join(name);
        if !on_disk.is_file() {
            return Ok(None);
        }

        let on_disk_hash = fingerprint_file(&on_disk)?;
        let identical_video =
            !self.class.fingerprints() && fingerprint_file(source)? == on_disk_hash;

        let fingerprint = if self.class.fingerprints() {
            self.hashes
                .entry(on_disk_hash)
                .or_default()
                .push(name.to_string());
            Some(on_disk_hash)
        } else {
            None
        };

        debug!(dest = %on_disk.display(), "destination already holds this name");
        self.names.insert(
            name.to_string(),
            NameEntry {
                fingerprint,
                dest: Some(on_disk.clone()),
            },
        );

        if identical_video {
            debug!(source = %source.display(), "identical video already in destination, skipping");
            return Ok(Some(IngestAction::SkipDuplicate {
                existing: Some(on_disk),
            }));
        }
        Ok(None)
    }

    fn resolve_collision(
        &mut self,
        source: &Path,
        name: &str,
        fingerprint: Option<Fingerprint>,
        previous: NameEntry,
    ) -> Result<IngestAction> {
        if let (Some(hash), Some(prev_hash)) = (fingerprint, previous.fingerprint) {
            if hash == prev_hash {
                let existing = previous.dest.or_else(|| self.existing_copy(&hash));
                debug!(source = %source.display(), "same name, same content, skipping");
                return Ok(IngestAction::SkipDuplicate { existing });
            }

            if let Some(names) = self.hashes.get(&hash) {
                let line = format!(
                    "Same filename, photo already stored under another name: {} matches {}",
                    source.display(),
                    names.join(", ")
                );
                info!("{}", line);
                self.conflicts.push(line);
                let existing = self.existing_copy(&hash);
                return Ok(IngestAction::SkipDuplicate { existing });
            }
        }

        let date = self.resolver.capture_date(source)?;

        let moved = match previous.dest {
            Some(prev_path) if prev_path.exists() => {
                Some(self.move_aside(name, &prev_path, previous.fingerprint)?)
            }
            _ => None,
        };

        let dest = unique_destination(&self.dest_dir, &date_prefixed_name(&date, name));
        let bytes = copy_preserving(source, &dest)?;
        let dest_name = file_name_of(&dest)?;

        info!(source = %source.display(), dest = %dest.display(), "name collision, copied under dated name");

        self.index(dest_name, fingerprint, dest.clone());

        Ok(IngestAction::Renamed {
            dest,
            previous: moved,
            bytes,
        })
    }

    /// Give the file currently holding `name` its own dated name.
    fn move_aside(
        &mut self,
        name: &str,
        prev_path: &Path,
        fingerprint: Option<Fingerprint>,
    ) -> Result<PathBuf> {
        let prev_date = self.resolver.capture_date(prev_path)?;
        let prev_name = date_prefixed_name(&prev_date, &file_name_of(prev_path)?);
        let target = unique_destination(&self.dest_dir, &prev_name);

        rename_in_place(prev_path, &target)?;
        info!(from = %prev_path.display(), to = %target.display(), "renamed previous occupant");

        if let Some(entry) = self.names.get_mut(name) {
            entry.dest = None;
        }
        let target_name = file_name_of(&target)?;
        self.index(target_name, fingerprint, target.clone());

        Ok(target)
    }

    fn place_new(
        &mut self,
        source: &Path,
        name: &str,
        fingerprint: Option<Fingerprint>,
    ) -> Result<IngestAction> {
        if let Some(hash) = fingerprint {
            if let Some(names) = self.hashes.get_mut(&hash) {
                let matches = names.clone();
                let line = format!(
                    "Different filename, same photo: {} matches {}",
                    source.display(),
                    matches.join(", ")
                );
                info!("{}", line);
                self.conflicts.push(line);
                names.push(name.to_string());

                self.names.insert(
                    name.to_string(),
                    NameEntry {
                        fingerprint: Some(hash),
                        dest: None,
                    },
                );
                return Ok(IngestAction::SameContent { matches });
            }
        }

        let dest = self.dest_dir.join(name);
        let bytes = copy_preserving(source, &dest)?;
        debug!(source = %source.display(), dest = %dest.display(), "copied");

        self.index(name.to_string(), fingerprint, dest.clone());
        Ok(IngestAction::Copied { dest, bytes })
    }

    fn index(&mut self, name: String, fingerprint: Option<Fingerprint>, dest: PathBuf) {
        if let Some(hash) = fingerprint {
            self.hashes.entry(hash).or_default().push(name.clone());
        }
        self.names.insert(
            name,
            NameEntry {
                fingerprint,
                dest: Some(dest),
            },
        );
    }

    /// A destination file known to hold `hash`, if any is still on disk
    fn existing_copy(&self, hash: &Fingerprint) -> Option<PathBuf> {
        self.hashes.get(hash)?.iter().find_map(|name| {
            let entry = self.names.get(name)?;
            match (&entry.fingerprint, &entry.dest) {
                (Some(h), Some(dest)) if h == hash && dest.exists() => Some(dest.clone()),
                _ => None,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::ModifiedTimeResolver;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    /// Dates keyed on file contents, so a file keeps its date after being
    /// copied or renamed.
    struct ContentDates(HashMap<Vec<u8>, &'static str>);

    impl ContentDates {
        fn new(entries: &[(&[u8], &'static str)]) -> Self {
            Self(entries.iter().map(|(k, v)| (k.to_vec(), *v)).collect())
        }
    }

    impl CaptureDateResolver for ContentDates {
        fn capture_date(&self, path: &Path) -> Result<String> {
            let bytes = fs::read(path).map_err(|source| IngestError::ModifiedTime {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(self.0.get(&bytes).copied().unwrap_or("19700101").to_string())
        }
    }

    struct Fixture {
        _root: TempDir,
        src: PathBuf,
        dest: PathBuf,
        ledger_path: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempdir().unwrap();
            let src = root.path().join("src");
            let dest = root.path().join("dest");
            fs::create_dir_all(&src).unwrap();
            fs::create_dir_all(&dest).unwrap();
            let ledger_path = root.path().join("seen_sources.txt");
            Self {
                _root: root,
                src,
                dest,
                ledger_path,
            }
        }

        fn source(&self, rel: &str, contents: &[u8]) -> PathBuf {
            let path = self.src.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, contents).unwrap();
            path
        }

        fn engine<R: CaptureDateResolver>(&self, class: MediaClass, resolver: R) -> IngestEngine<R> {
            let ledger = ProcessedLedger::load(&self.ledger_path).unwrap();
            IngestEngine::new(class, &self.dest, resolver, ledger)
        }

        fn dest_names(&self) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(&self.dest)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    fn scenario_dates() -> ContentDates {
        ContentDates::new(&[(b"H1", "20230501"), (b"H2", "20230610")])
    }

    #[test]
    fn test_new_name_is_copied_unchanged() {
        let fx = Fixture::new();
        let a = fx.source("a/img_1.jpg", b"H1");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        let action = engine.ingest(&a).unwrap();

        assert_eq!(
            action,
            IngestAction::Copied {
                dest: fx.dest.join("img_1.jpg"),
                bytes: 2
            }
        );
        assert_eq!(fx.dest_names(), vec!["img_1.jpg"]);
        assert!(engine.ledger().contains(&a));
    }

    #[test]
    fn test_same_name_different_content_renames_both() {
        let fx = Fixture::new();
        let a = fx.source("a/img_1.jpg", b"H1");
        let b = fx.source("b/img_1.jpg", b"H2");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        engine.ingest(&a).unwrap();
        let action = engine.ingest(&b).unwrap();

        assert_eq!(
            action,
            IngestAction::Renamed {
                dest: fx.dest.join("20230610_img_1.jpg"),
                previous: Some(fx.dest.join("20230501_img_1.jpg")),
                bytes: 2,
            }
        );
        assert_eq!(
            fx.dest_names(),
            vec!["20230501_img_1.jpg", "20230610_img_1.jpg"]
        );
        assert_eq!(fs::read(fx.dest.join("20230501_img_1.jpg")).unwrap(), b"H1");
        assert_eq!(fs::read(fx.dest.join("20230610_img_1.jpg")).unwrap(), b"H2");
    }

    #[test]
    fn test_same_name_same_content_is_skipped() {
        let fx = Fixture::new();
        let a = fx.source("a/img_1.jpg", b"H1");
        let b = fx.source("b/img_1.jpg", b"H1");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        engine.ingest(&a).unwrap();
        let action = engine.ingest(&b).unwrap();

        assert_eq!(
            action,
            IngestAction::SkipDuplicate {
                existing: Some(fx.dest.join("img_1.jpg"))
            }
        );
        assert_eq!(fx.dest_names(), vec!["img_1.jpg"]);
        assert!(engine.ledger().contains(&b));
    }

    #[test]
    fn test_different_name_same_content_is_logged_not_copied() {
        let fx = Fixture::new();
        let x = fx.source("a/x.jpg", b"same");
        let y = fx.source("b/y.jpg", b"same");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        engine.ingest(&x).unwrap();
        let action = engine.ingest(&y).unwrap();

        assert_eq!(
            action,
            IngestAction::SameContent {
                matches: vec!["x.jpg".to_string()]
            }
        );
        assert_eq!(fx.dest_names(), vec!["x.jpg"]);
        assert_eq!(engine.conflicts().len(), 1);
        assert!(engine.conflicts()[0].contains("y.jpg"));
        assert!(engine.conflicts()[0].ends_with("matches x.jpg"));
        assert!(engine.ledger().contains(&y));
    }

    #[test]
    fn test_name_registered_without_copy_is_never_renamed() {
        let fx = Fixture::new();
        let x = fx.source("a/x.jpg", b"same");
        let y = fx.source("b/y.jpg", b"same");
        let y2 = fx.source("c/y.jpg", b"H2");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        engine.ingest(&x).unwrap();
        engine.ingest(&y).unwrap();
        let action = engine.ingest(&y2).unwrap();

        assert_eq!(
            action,
            IngestAction::Renamed {
                dest: fx.dest.join("20230610_y.jpg"),
                previous: None,
                bytes: 2,
            }
        );
        assert_eq!(fx.dest_names(), vec!["20230610_y.jpg", "x.jpg"]);
    }

    #[test]
    fn test_dated_name_collision_takes_smallest_free_suffix() {
        let fx = Fixture::new();
        fs::write(fx.dest.join("20230610_img_1.jpg"), b"older").unwrap();
        fs::write(fx.dest.join("20230610_img_1_1.jpg"), b"older too").unwrap();

        let a = fx.source("a/img_1.jpg", b"H1");
        let b = fx.source("b/img_1.jpg", b"H2");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        engine.ingest(&a).unwrap();
        let action = engine.ingest(&b).unwrap();

        match action {
            IngestAction::Renamed { dest, .. } => {
                assert_eq!(dest, fx.dest.join("20230610_img_1_0.jpg"))
            }
            other => panic!("unexpected action {:?}", other),
        }
        assert_eq!(fs::read(fx.dest.join("20230610_img_1.jpg")).unwrap(), b"older");
    }

    #[test]
    fn test_collision_with_same_day_does_not_overwrite() {
        let fx = Fixture::new();
        let a = fx.source("a/img_1.jpg", b"H1");
        let b = fx.source("b/img_1.jpg", b"H1b");
        let dates = ContentDates::new(&[(b"H1", "20230501"), (b"H1b", "20230501")]);
        let mut engine = fx.engine(MediaClass::Image, dates);

        engine.ingest(&a).unwrap();
        engine.ingest(&b).unwrap();

        assert_eq!(
            fx.dest_names(),
            vec!["20230501_img_1.jpg", "20230501_img_1_0.jpg"]
        );
        assert_eq!(fs::read(fx.dest.join("20230501_img_1.jpg")).unwrap(), b"H1");
        assert_eq!(fs::read(fx.dest.join("20230501_img_1_0.jpg")).unwrap(), b"H1b");
    }

    #[test]
    fn test_known_content_under_colliding_name_is_not_copied_twice() {
        let fx = Fixture::new();
        let a = fx.source("a/img_1.jpg", b"H1");
        let b = fx.source("b/img_1.jpg", b"H2");
        let c = fx.source("c/img_1.jpg", b"H2");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        engine.ingest(&a).unwrap();
        engine.ingest(&b).unwrap();
        let action = engine.ingest(&c).unwrap();

        assert_eq!(
            action,
            IngestAction::SkipDuplicate {
                existing: Some(fx.dest.join("20230610_img_1.jpg"))
            }
        );
        assert_eq!(
            fx.dest_names(),
            vec!["20230501_img_1.jpg", "20230610_img_1.jpg"]
        );
        assert_eq!(engine.conflicts().len(), 1);
        assert!(engine.conflicts()[0]
            .starts_with("Same filename, photo already stored under another name:"));
        assert!(engine.conflicts()[0].ends_with("matches 20230610_img_1.jpg"));
    }

    #[test]
    fn test_third_identical_to_first_is_skipped_after_rename() {
        let fx = Fixture::new();
        let a = fx.source("a/img_1.jpg", b"H1");
        let b = fx.source("b/img_1.jpg", b"H2");
        let c = fx.source("c/img_1.jpg", b"H1");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        engine.ingest(&a).unwrap();
        engine.ingest(&b).unwrap();
        let action = engine.ingest(&c).unwrap();

        assert_eq!(
            action,
            IngestAction::SkipDuplicate {
                existing: Some(fx.dest.join("20230501_img_1.jpg"))
            }
        );
        assert_eq!(fx.dest_names().len(), 2);
    }

    #[test]
    fn test_seen_source_is_not_read() {
        let fx = Fixture::new();
        let gone = fx.src.join("a/deleted.jpg");
        let mut ledger = ProcessedLedger::new(&fx.ledger_path);
        ledger.record(&gone);

        let mut engine = IngestEngine::new(MediaClass::Image, &fx.dest, scenario_dates(), ledger);

        assert_eq!(engine.ingest(&gone).unwrap(), IngestAction::SkipSeen);
        assert!(fx.dest_names().is_empty());
    }

    #[test]
    fn test_file_left_by_earlier_run_is_compared_not_overwritten() {
        let fx = Fixture::new();
        fs::write(fx.dest.join("img_1.jpg"), b"H1").unwrap();
        let same = fx.source("a/img_1.jpg", b"H1");
        let different = fx.source("b/img_1.jpg", b"H2");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        assert_eq!(
            engine.ingest(&same).unwrap(),
            IngestAction::SkipDuplicate {
                existing: Some(fx.dest.join("img_1.jpg"))
            }
        );
        engine.ingest(&different).unwrap();

        assert_eq!(
            fx.dest_names(),
            vec!["20230501_img_1.jpg", "20230610_img_1.jpg"]
        );
    }

    #[test]
    fn test_fingerprint_failure_leaves_ledger_untouched() {
        let fx = Fixture::new();
        let a = fx.source("a/img_1.jpg", b"H1");
        let missing = fx.src.join("b/missing.jpg");
        let mut engine = fx.engine(MediaClass::Image, scenario_dates());

        engine.ingest(&a).unwrap();
        let err = engine.ingest(&missing).unwrap_err();

        assert!(matches!(err, IngestError::Fingerprint { .. }));
        assert!(engine.ledger().contains(&a));
        assert!(!engine.ledger().contains(&missing));
    }

    #[test]
    fn test_video_collisions_always_rename() {
        let fx = Fixture::new();
        let a = fx.source("a/clip.mp4", b"H1");
        let b = fx.source("b/clip.mp4", b"H1");
        let mut engine = fx.engine(MediaClass::Video, scenario_dates());

        engine.ingest(&a).unwrap();
        let action = engine.ingest(&b).unwrap();

        assert!(matches!(action, IngestAction::Renamed { .. }));
        assert_eq!(
            fx.dest_names(),
            vec!["20230501_clip.mp4", "20230501_clip_0.mp4"]
        );
        assert!(engine.conflicts().is_empty());
    }

    #[test]
    fn test_video_left_by_earlier_run_is_not_copied_again() {
        let fx = Fixture::new();
        fs::write(fx.dest.join("clip.mp4"), b"H1").unwrap();
        let same = fx.source("a/clip.mp4", b"H1");
        let mut engine = fx.engine(MediaClass::Video, scenario_dates());

        assert_eq!(
            engine.ingest(&same).unwrap(),
            IngestAction::SkipDuplicate {
                existing: Some(fx.dest.join("clip.mp4"))
            }
        );
        assert_eq!(fx.dest_names(), vec!["clip.mp4"]);
        assert!(engine.ledger().contains(&same));
    }

    #[test]
    fn test_different_video_left_by_earlier_run_is_not_overwritten() {
        let fx = Fixture::new();
        fs::write(fx.dest.join("clip.mp4"), b"H1").unwrap();
        let different = fx.source("a/clip.mp4", b"H2");
        let mut engine = fx.engine(MediaClass::Video, scenario_dates());

        assert!(matches!(
            engine.ingest(&different).unwrap(),
            IngestAction::Renamed { .. }
        ));
        assert_eq!(
            fx.dest_names(),
            vec!["20230501_clip.mp4", "20230610_clip.mp4"]
        );
    }

    #[test]
    fn test_video_uses_modification_time() {
        let fx = Fixture::new();
        let a = fx.source("a/clip.mov", b"one");
        let b = fx.source("b/clip.mov", b"two");
        let mut engine = fx.engine(MediaClass::Video, ModifiedTimeResolver);

        engine.ingest(&a).unwrap();
        engine.ingest(&b).unwrap();

        let names = fx.dest_names();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.len() > 9 && n.as_bytes()[8] == b'_'));
        assert!(!names.contains(&"clip.mov".to_string()));
    }
}
