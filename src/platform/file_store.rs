//! One JSON file per key in a directory

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::PersistenceError;
use crate::persistence::KeyValueStore;

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        log::debug!("File store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(self.path(key)) {
            Ok(json) => Ok(Some(json)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        fs::write(self.path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("atomix-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_get_set_remove() {
        let dir = scratch("kv");
        let mut store = FileStore::open(&dir).unwrap();
        assert_eq!(store.get("missing").unwrap(), None);

        store.set("record", "{\"a\":1}").unwrap();
        assert_eq!(store.get("record").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.join("record.json").exists());

        store.remove("record").unwrap();
        store.remove("record").unwrap();
        assert_eq!(store.get("record").unwrap(), None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_settings_survive_reopen() {
        let dir = scratch("settings");
        let mut store = FileStore::open(&dir).unwrap();
        let mut settings = Settings::default();
        settings.set_level_completed(5, 2500);
        settings.save(&mut store).unwrap();

        let reopened = FileStore::open(&dir).unwrap();
        assert_eq!(Settings::load(&reopened).level_score(5), 2500);

        fs::remove_dir_all(&dir).unwrap();
    }
}
