//! Session state and the events handed to the host
//!
//! The session owns the loaded level, the movement engine and the shared
//! movement lock. Anything the host has to animate or play is pushed onto an
//! event queue; anything the session has to wait for is named by a `Signal`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::grid::AtomId;
use super::movement::{MoveLock, MovementEngine};
use crate::audio::SoundEffect;
use crate::level::Level;
use crate::settings::ProgressStore;

/// Single-shot completion token for an animation the session waits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal(pub u64);

/// Where the session is in a level's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// No level loaded yet
    Starting,
    /// Player may drag atoms, clock is running
    Running,
    /// Molecule complete, atoms exploding
    Success,
    /// Remaining time being converted to points
    CountingDown,
    /// Clock ran out; waiting for retry or exit
    TimedOut,
    /// Left to the menu, or the last level was completed
    Finished,
}

/// Requests from the simulation to the host, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    LevelStarted {
        level: u8,
        name: String,
        duration: u32,
    },
    /// Slide `atom` to `to` over `duration` seconds, then complete `signal`
    AnimateMove {
        signal: Signal,
        atom: AtomId,
        to: Vec2,
        duration: f32,
    },
    /// Play the explosion of `atom`, then complete `signal`
    AnimateExplosion { signal: Signal, atom: AtomId },
    /// Atom jumped to a position without animation
    AtomPlaced { atom: AtomId, position: Vec2 },
    PlaySound(SoundEffect),
    ScoreChanged(u32),
    HiScoreChanged(u32),
    TimeChanged(u32),
    LevelCompleted { level: u8, score: u32 },
    TimedOut { level: u8 },
    /// Last level done
    GameFinished { score: u32 },
}

/// What the session is suspended on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Awaiting {
    Slide { signal: Signal },
    Explosion { signal: Signal, index: usize },
}

/// One player's run through the levels
pub struct Session<P: ProgressStore> {
    pub(crate) level: Option<Level>,
    pub(crate) movement: MovementEngine,
    pub(crate) lock: MoveLock,
    pub(crate) status: Status,
    pub(crate) paused: bool,
    pub(crate) score: u32,
    /// Score when the current level started (retry resets to it)
    pub(crate) start_score: u32,
    /// Seconds left on the level clock
    pub(crate) remaining_time: u32,
    /// Accumulated time not yet converted into clock steps
    pub(crate) clock: f64,
    pub(crate) awaiting: Option<Awaiting>,
    next_signal: u64,
    events: Vec<GameEvent>,
    pub(crate) progress: P,
}

impl<P: ProgressStore> Session<P> {
    pub fn new(progress: P) -> Self {
        Self {
            level: None,
            movement: MovementEngine::new(),
            lock: MoveLock::default(),
            status: Status::Starting,
            paused: false,
            score: 0,
            start_score: 0,
            remaining_time: 0,
            clock: 0.0,
            awaiting: None,
            next_signal: 1,
            events: Vec::new(),
            progress,
        }
    }

    pub fn level(&self) -> Option<&Level> {
        self.level.as_ref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn start_score(&self) -> u32 {
        self.start_score
    }

    pub fn remaining_time(&self) -> u32 {
        self.remaining_time
    }

    pub fn lock(&self) -> &MoveLock {
        &self.lock
    }

    pub fn movement(&self) -> &MovementEngine {
        &self.movement
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut P {
        &mut self.progress
    }

    /// Signal the session is currently suspended on, if any
    pub fn awaited_signal(&self) -> Option<Signal> {
        self.awaiting.map(|a| match a {
            Awaiting::Slide { signal } | Awaiting::Explosion { signal, .. } => signal,
        })
    }

    /// Take every event pushed since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub(crate) fn play(&mut self, sound: SoundEffect) {
        if self.progress.sound_enabled() {
            self.events.push(GameEvent::PlaySound(sound));
        }
    }

    pub(crate) fn allocate_signal(&mut self) -> Signal {
        let signal = Signal(self.next_signal);
        self.next_signal += 1;
        signal
    }

    pub(crate) fn set_score(&mut self, score: u32) {
        self.score = score;
        self.emit(GameEvent::ScoreChanged(score));
    }

    /// Add points, raising the hi score when it is beaten
    pub(crate) fn increment_score(&mut self, points: u32) {
        self.set_score(self.score.saturating_add(points));
        if self.score > self.progress.hi_score() {
            self.progress.set_hi_score(self.score);
            self.emit(GameEvent::HiScoreChanged(self.score));
        }
    }

    pub(crate) fn set_remaining_time(&mut self, seconds: u32) {
        self.remaining_time = seconds;
        self.emit(GameEvent::TimeChanged(seconds));
    }
}
