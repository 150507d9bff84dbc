//! Error types
//!
//! Level and persistence failures are returned to the caller; gameplay
//! conditions such as a blocked drag are not errors.

use glam::IVec2;
use thiserror::Error;

use crate::sim::Signal;

/// Failure to produce a level from its static blob
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("level {0} is outside 1..=30")]
    InvalidLevelNumber(u8),
    #[error("level {level} data is truncated: needed {needed} bytes, {available} available")]
    MalformedLevelData {
        level: u8,
        needed: usize,
        available: usize,
    },
}

/// Failure to read or write a persisted record
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("record version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("no storage backend available")]
    Unavailable,
}

/// Misuse of the session API by the host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no level is loaded")]
    NoLevel,
    #[error("unknown atom {0}")]
    UnknownAtom(String),
    #[error("{atom} cannot rest on cell {cell}")]
    BlockedCell { atom: String, cell: IVec2 },
    #[error("signal {0:?} is not being awaited")]
    UnknownSignal(Signal),
    #[error(transparent)]
    Level(#[from] LevelError),
}
