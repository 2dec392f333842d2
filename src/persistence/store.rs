//! Save directory management
//!
//! Autosaves are named after the local time they were written, so sorting
//! names sorts them chronologically. Named saves and replays are never
//! rotated.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local};

use super::{PersistenceError, ReplayData, SaveData};
use crate::consts::{AUTOSAVE_EXTENSION, REPLAY_EXTENSION, SAVE_EXTENSION};
use crate::settings::Settings;

const AUTOSAVE_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S-%3f";

#[derive(Debug, Clone)]
pub struct SaveStore {
    dir: PathBuf,
    max_autosaves: usize,
}

impl SaveStore {
    pub fn new(dir: impl Into<PathBuf>, max_autosaves: usize) -> Self {
        Self {
            dir: dir.into(),
            max_autosaves,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.save_dir, settings.max_autosaves)
    }

    fn path_for(&self, name: &str, extension: &str) -> PathBuf {
        self.dir.join(format!("{name}.{extension}"))
    }

    fn autosave_path(&self, stamp: DateTime<Local>) -> PathBuf {
        let name = stamp.format(AUTOSAVE_TIME_FORMAT).to_string();
        self.path_for(&name, AUTOSAVE_EXTENSION)
    }

    fn write(&self, path: &Path, text: &str) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Write an autosave stamped with `now`, then delete the oldest
    /// autosaves beyond the retention cap. A taken stamp moves forward a
    /// millisecond at a time, so names keep sorting in write order.
    pub fn autosave(
        &self,
        data: &SaveData,
        now: DateTime<Local>,
    ) -> Result<PathBuf, PersistenceError> {
        let mut stamp = now;
        let mut path = self.autosave_path(stamp);
        while path.exists() {
            stamp = stamp + Duration::milliseconds(1);
            path = self.autosave_path(stamp);
        }

        self.write(&path, &data.to_text())?;
        log::info!("Autosaved level {} to {}", data.level, path.display());
        self.rotate()?;
        Ok(path)
    }

    pub fn autosave_now(&self, data: &SaveData) -> Result<PathBuf, PersistenceError> {
        self.autosave(data, Local::now())
    }

    fn rotate(&self) -> Result<(), PersistenceError> {
        let autosaves = self.autosaves()?;
        let excess = autosaves.len().saturating_sub(self.max_autosaves);
        for old in &autosaves[..excess] {
            fs::remove_file(old)?;
            log::debug!("Removed old autosave {}", old.display());
        }
        Ok(())
    }

    pub fn save(&self, name: &str, data: &SaveData) -> Result<PathBuf, PersistenceError> {
        let path = self.path_for(name, SAVE_EXTENSION);
        self.write(&path, &data.to_text())?;
        log::info!("Saved level {} to {}", data.level, path.display());
        Ok(path)
    }

    pub fn save_replay(&self, name: &str, data: &ReplayData) -> Result<PathBuf, PersistenceError> {
        let path = self.path_for(name, REPLAY_EXTENSION);
        self.write(&path, &data.to_text())?;
        log::info!(
            "Saved replay of level {} ({} ticks) to {}",
            data.save.level,
            data.stream.ticks,
            path.display()
        );
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<SaveData, PersistenceError> {
        let text = fs::read_to_string(path)?;
        SaveData::parse(&text)
    }

    pub fn load_replay(&self, path: &Path) -> Result<ReplayData, PersistenceError> {
        let text = fs::read_to_string(path)?;
        ReplayData::parse(&text)
    }

    /// Autosave files, oldest first
    pub fn autosaves(&self) -> Result<Vec<PathBuf>, PersistenceError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == AUTOSAVE_EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn latest_autosave(&self) -> Result<Option<PathBuf>, PersistenceError> {
        Ok(self.autosaves()?.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn data(level: u32) -> SaveData {
        SaveData {
            level,
            players: 1,
            difficulty: 1,
            seed: 9,
            items: vec![Default::default()],
        }
    }

    fn base_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_autosave_rotation_keeps_cap() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path(), 20);
        let start = base_time();

        for i in 0..20 {
            store
                .autosave(&data(i + 1), start + Duration::seconds(i as i64))
                .unwrap();
        }
        let before = store.autosaves().unwrap();
        assert_eq!(before.len(), 20);

        store.autosave(&data(21), start + Duration::seconds(20)).unwrap();
        let after = store.autosaves().unwrap();
        assert_eq!(after.len(), 20);
        // Exactly the oldest one went away
        assert!(!after.contains(&before[0]));
        assert_eq!(&after[..19], &before[1..]);
        assert_eq!(store.load(&after[19]).unwrap().level, 21);
    }

    #[test]
    fn test_same_instant_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path(), 5);
        let a = store.autosave(&data(1), base_time()).unwrap();
        let b = store.autosave(&data(2), base_time()).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.autosaves().unwrap().len(), 2);
        let latest = store.latest_autosave().unwrap().unwrap();
        assert_eq!(latest, b);
        assert_eq!(store.load(&latest).unwrap().level, 2);
    }

    #[test]
    fn test_same_instant_rotation_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path(), 1);
        store.autosave(&data(1), base_time()).unwrap();
        let newest = store.autosave(&data(2), base_time()).unwrap();

        let remaining = store.autosaves().unwrap();
        assert_eq!(remaining, vec![newest]);
        assert_eq!(store.load(&remaining[0]).unwrap().level, 2);
    }

    #[test]
    fn test_many_same_instant_saves_sort_in_write_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path(), 20);
        for level in 1..=12 {
            store.autosave(&data(level), base_time()).unwrap();
        }
        let levels: Vec<u32> = store
            .autosaves()
            .unwrap()
            .iter()
            .map(|path| store.load(path).unwrap().level)
            .collect();
        assert_eq!(levels, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn test_named_saves_are_never_rotated() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path(), 1);
        store.save("first", &data(1)).unwrap();
        store.save("second", &data(2)).unwrap();
        store.autosave(&data(3), base_time()).unwrap();
        store.autosave(&data(4), base_time() + Duration::seconds(1)).unwrap();

        assert_eq!(store.autosaves().unwrap().len(), 1);
        assert!(dir.path().join("first.nebula").exists());
        assert!(dir.path().join("second.nebula").exists());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SaveStore::new(dir.path(), 5);
        let err = store.load(&dir.path().join("nope.nebula")).unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
        assert!(store.latest_autosave().unwrap().is_none());
    }
}
