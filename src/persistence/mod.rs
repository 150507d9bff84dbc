//! Save/load of versioned records
//!
//! Features:
//! - Versioned JSON envelope (`{"version": 1, "payload": ...}`)
//! - Pluggable key-value backends (memory, files, LocalStorage)
//! - Saved game snapshot of a running level

mod saved_game;

pub use saved_game::SavedGame;

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

/// Version written into every envelope
pub const RECORD_VERSION: u32 = 1;

/// Durable string store keyed by record name
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

/// In-memory backend (tests, headless runs)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    payload: T,
}

/// Serialize `value` into a versioned envelope under `key`
pub fn write_record<S, T>(store: &mut S, key: &str, value: &T) -> Result<(), PersistenceError>
where
    S: KeyValueStore + ?Sized,
    T: Serialize,
{
    let json = serde_json::to_string(&Envelope {
        version: RECORD_VERSION,
        payload: value,
    })?;
    store.set(key, &json)
}

/// Read the record under `key`; `Ok(None)` when nothing is stored
pub fn read_record<S, T>(store: &S, key: &str) -> Result<Option<T>, PersistenceError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let Some(json) = store.get(key)? else {
        return Ok(None);
    };
    let envelope: Envelope<serde_json::Value> = serde_json::from_str(&json)?;
    if envelope.version != RECORD_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: envelope.version,
            expected: RECORD_VERSION,
        });
    }
    Ok(Some(serde_json::from_value(envelope.payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        level: u8,
        score: u32,
    }

    #[test]
    fn test_record_roundtrip() {
        let mut store = MemoryStore::new();
        let sample = Sample {
            level: 4,
            score: 1200,
        };
        write_record(&mut store, "sample", &sample).unwrap();
        let raw = store.get("sample").unwrap().unwrap();
        assert!(raw.contains("\"version\":1"));
        assert_eq!(read_record::<_, Sample>(&store, "sample").unwrap(), Some(sample));
        assert_eq!(read_record::<_, Sample>(&store, "missing").unwrap(), None);
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let mut store = MemoryStore::new();
        store
            .set("sample", r#"{"version":7,"payload":{"level":1,"score":0}}"#)
            .unwrap();
        let err = read_record::<_, Sample>(&store, "sample").unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedVersion {
                found: 7,
                expected: RECORD_VERSION
            }
        ));
    }

    #[test]
    fn test_corrupt_record_is_an_error() {
        let mut store = MemoryStore::new();
        store.set("sample", "not json").unwrap();
        assert!(matches!(
            read_record::<_, Sample>(&store, "sample"),
            Err(PersistenceError::Json(_))
        ));
    }
}
