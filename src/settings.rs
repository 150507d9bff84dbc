//! Player settings and progress
//!
//! Persisted as one record: sound flag, hi score, best score per level and the
//! level the menu points at.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::{FIRST_LEVEL, LAST_LEVEL};
use crate::persistence::{KeyValueStore, read_record, write_record};

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Sound effects and music on
    pub sound_enabled: bool,
    hi_score: u32,
    /// Best score per completed level
    level_scores: BTreeMap<u8, u32>,
    current_level: u8,
    /// Unsaved changes
    #[serde(skip)]
    dirty: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            hi_score: 0,
            level_scores: BTreeMap::new(),
            current_level: FIRST_LEVEL,
            dirty: false,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "atomix_settings";

    pub fn current_level(&self) -> u8 {
        self.current_level
    }

    /// Point at a level; stepping past either end wraps around
    pub fn set_current_level(&mut self, level: i32) {
        let level = if level < FIRST_LEVEL as i32 {
            LAST_LEVEL
        } else if level > LAST_LEVEL as i32 {
            FIRST_LEVEL
        } else {
            level as u8
        };
        if level != self.current_level {
            self.current_level = level;
            self.dirty = true;
        }
    }

    pub fn level_score(&self, level: u8) -> u32 {
        self.level_scores.get(&level).copied().unwrap_or(0)
    }

    pub fn is_level_completed(&self, level: u8) -> bool {
        self.level_score(level) > 0
    }

    /// Record a level score if it beats the stored one
    pub fn set_level_completed(&mut self, level: u8, score: u32) {
        if self.level_score(level) < score {
            self.level_scores.insert(level, score);
            self.dirty = true;
        }
    }

    /// Number of levels with a stored score
    pub fn completed_levels(&self) -> usize {
        self.level_scores.values().filter(|&&s| s > 0).count()
    }

    pub fn hi_score(&self) -> u32 {
        self.hi_score
    }

    /// Raise the hi score; lower values are ignored
    pub fn set_hi_score(&mut self, score: u32) {
        if score > self.hi_score {
            self.hi_score = score;
            self.dirty = true;
        }
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        if enabled != self.sound_enabled {
            self.sound_enabled = enabled;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Load settings, falling back to defaults on missing or unreadable data
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        match read_record::<_, Settings>(store, Self::STORAGE_KEY) {
            Ok(Some(mut settings)) => {
                log::info!(
                    "Loaded settings ({} levels completed, hi score {})",
                    settings.completed_levels(),
                    settings.hi_score
                );
                settings.current_level = settings.current_level.clamp(FIRST_LEVEL, LAST_LEVEL);
                settings
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Discarding unreadable settings: {}", e);
                Self::default()
            }
        }
    }

    /// Write settings if anything changed since the last save
    pub fn save<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &mut S,
    ) -> Result<(), crate::PersistenceError> {
        if !self.dirty {
            return Ok(());
        }
        write_record(store, Self::STORAGE_KEY, &*self)?;
        self.dirty = false;
        log::info!("Settings saved");
        Ok(())
    }
}

/// Progress collaborator used by the session
pub trait ProgressStore {
    fn level_score(&self, level: u8) -> u32;
    fn set_level_completed(&mut self, level: u8, score: u32);
    fn is_level_completed(&self, level: u8) -> bool {
        self.level_score(level) > 0
    }
    fn hi_score(&self) -> u32;
    fn set_hi_score(&mut self, score: u32);
    fn current_level(&self) -> u8;
    fn set_current_level(&mut self, level: u8);
    fn sound_enabled(&self) -> bool;
    /// Persist pending changes; failures are logged, never raised
    fn save(&mut self);
}

/// Settings bound to the store they are saved in
#[derive(Debug, Clone)]
pub struct Profile<S: KeyValueStore> {
    pub settings: Settings,
    store: S,
}

impl<S: KeyValueStore> Profile<S> {
    pub fn load(store: S) -> Self {
        let settings = Settings::load(&store);
        Self { settings, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> ProgressStore for Profile<S> {
    fn level_score(&self, level: u8) -> u32 {
        self.settings.level_score(level)
    }

    fn set_level_completed(&mut self, level: u8, score: u32) {
        self.settings.set_level_completed(level, score);
    }

    fn hi_score(&self) -> u32 {
        self.settings.hi_score()
    }

    fn set_hi_score(&mut self, score: u32) {
        self.settings.set_hi_score(score);
    }

    fn current_level(&self) -> u8 {
        self.settings.current_level()
    }

    fn set_current_level(&mut self, level: u8) {
        self.settings.set_current_level(level as i32);
    }

    fn sound_enabled(&self) -> bool {
        self.settings.sound_enabled
    }

    fn save(&mut self) {
        if let Err(e) = self.settings.save(&mut self.store) {
            log::warn!("Failed to save settings: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_current_level_wraps() {
        let mut settings = Settings::default();
        settings.set_current_level(0);
        assert_eq!(settings.current_level(), LAST_LEVEL);
        settings.set_current_level(31);
        assert_eq!(settings.current_level(), FIRST_LEVEL);
        settings.set_current_level(12);
        assert_eq!(settings.current_level(), 12);
    }

    #[test]
    fn test_level_scores_only_improve() {
        let mut settings = Settings::default();
        assert!(!settings.is_level_completed(3));
        settings.set_level_completed(3, 2000);
        settings.set_level_completed(3, 1500);
        assert_eq!(settings.level_score(3), 2000);
        assert!(settings.is_level_completed(3));
        assert_eq!(settings.completed_levels(), 1);
    }

    #[test]
    fn test_hi_score_is_monotonic() {
        let mut settings = Settings::default();
        settings.set_hi_score(900);
        settings.set_hi_score(100);
        assert_eq!(settings.hi_score(), 900);
    }

    #[test]
    fn test_save_only_when_dirty() {
        let mut store = MemoryStore::new();
        let mut settings = Settings::default();
        settings.save(&mut store).unwrap();
        assert!(store.is_empty());

        settings.set_sound_enabled(false);
        settings.set_level_completed(1, 800);
        assert!(settings.is_dirty());
        settings.save(&mut store).unwrap();
        assert!(!settings.is_dirty());

        let loaded = Settings::load(&store);
        assert!(!loaded.sound_enabled);
        assert_eq!(loaded.level_score(1), 800);
        assert!(!loaded.is_dirty());
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, "{broken").unwrap();
        let settings = Settings::load(&store);
        assert!(settings.sound_enabled);
        assert_eq!(settings.current_level(), FIRST_LEVEL);
    }

    #[test]
    fn test_profile_saves_through_store() {
        let mut profile = Profile::load(MemoryStore::new());
        profile.set_level_completed(2, 1234);
        profile.set_hi_score(1234);
        ProgressStore::save(&mut profile);

        let reloaded = Profile::load(profile.store().clone());
        assert_eq!(reloaded.level_score(2), 1234);
        assert_eq!(reloaded.hi_score(), 1234);
        assert!(reloaded.is_level_completed(2));
        assert!(!reloaded.is_level_completed(3));
    }
}
