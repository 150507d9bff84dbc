//! Sound effects requested by the simulation
//!
//! Playback belongs to the host: the session pushes `GameEvent::PlaySound`
//! and never waits for it.

use serde::{Deserialize, Serialize};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Atom starts sliding
    AtomSlide,
    /// Atom settles against an obstacle
    AtomStop,
    /// An atom of the finished molecule explodes
    AtomExplode,
    /// Molecule completed
    LevelComplete,
    /// Remaining time converted to points
    CountdownTick,
    /// Clock ran out
    TimeUp,
}

impl SoundEffect {
    /// Asset name of the effect
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundEffect::AtomSlide => "slide",
            SoundEffect::AtomStop => "stop",
            SoundEffect::AtomExplode => "explode",
            SoundEffect::LevelComplete => "complete",
            SoundEffect::CountdownTick => "tick",
            SoundEffect::TimeUp => "timeout",
        }
    }
}
