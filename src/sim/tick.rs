//! Advancing a session: level loads, clock ticks, touches and animation
//! completions
//!
//! The success sequence is a chain of suspensions. Each step pushes an
//! animation request carrying a `Signal` and returns; `complete` resumes it.

use glam::Vec2;

use super::grid::AtomId;
use super::movement::{DragState, MoveOutcome};
use super::state::{Awaiting, GameEvent, Session, Signal, Status};
use crate::audio::SoundEffect;
use crate::consts::{CLOCK_STEP, COUNTDOWN_POINTS, COUNTDOWN_STEP, EXPLOSION_BONUS, FIRST_LEVEL};
use crate::error::{LevelError, SessionError};
use crate::is_valid_level;
use crate::level::Level;
use crate::settings::ProgressStore;

impl<P: ProgressStore> Session<P> {
    /// Begin a game at `level`, seeding the score from the level before it
    pub fn start(&mut self, level: u8) -> Result<(), SessionError> {
        if !is_valid_level(level) {
            return Err(LevelError::InvalidLevelNumber(level).into());
        }
        let seed = if level > FIRST_LEVEL {
            self.progress.level_score(level - 1)
        } else {
            0
        };
        self.set_score(seed);
        self.load_level(level)
    }

    /// Replace the current level and start its clock
    pub fn load_level(&mut self, number: u8) -> Result<(), SessionError> {
        let level = Level::load(number)?;
        self.install_level(level);
        Ok(())
    }

    /// Make an already decoded level the one in play
    pub(crate) fn install_level(&mut self, level: Level) {
        log::info!(
            "Level {} '{}' loaded: {} atoms, {}s",
            level.number,
            level.name,
            level.grid.atom_count(),
            level.duration
        );

        self.movement.reset();
        self.lock.unlock();
        self.awaiting = None;
        self.paused = false;
        self.clock = 0.0;
        self.start_score = self.score;
        self.progress.set_current_level(level.number);

        self.emit(GameEvent::LevelStarted {
            level: level.number,
            name: level.name.clone(),
            duration: level.duration,
        });
        self.set_remaining_time(level.duration);
        self.level = Some(level);
        self.status = Status::Running;
    }

    /// Advance the level clock or the countdown by `dt` seconds
    pub fn tick(&mut self, dt: f64) {
        if self.paused || self.level.is_none() {
            return;
        }
        match self.status {
            Status::Running => {
                self.clock += dt;
                while self.clock >= CLOCK_STEP && self.remaining_time > 0 {
                    self.clock -= CLOCK_STEP;
                    self.set_remaining_time(self.remaining_time - 1);
                }
                if self.remaining_time == 0 {
                    self.timeout();
                }
            }
            Status::CountingDown => {
                self.clock += dt;
                while self.clock >= COUNTDOWN_STEP && self.remaining_time > 0 {
                    self.clock -= COUNTDOWN_STEP;
                    self.set_remaining_time(self.remaining_time - 1);
                    self.increment_score(COUNTDOWN_POINTS);
                    self.play(SoundEffect::CountdownTick);
                }
                if self.remaining_time == 0 {
                    self.finish_level();
                }
            }
            _ => {}
        }
    }

    /// Touch down; starts dragging the atom under `point`
    pub fn touch_began(&mut self, point: Vec2) -> Option<AtomId> {
        if self.status != Status::Running || self.paused {
            return None;
        }
        let level = self.level.as_ref()?;
        let atom = level.grid.atom_at_point(point)?;
        self.movement
            .begin(&level.grid, &self.lock, atom, point)
            .then_some(atom)
    }

    /// Touch moved; returns where the dragged atom should be drawn
    pub fn touch_moved(&mut self, point: Vec2) -> Option<Vec2> {
        if self.paused {
            return None;
        }
        self.movement.drag_to(&self.lock, point)
    }

    /// Touch up; commits the move or starts its slide animation
    pub fn touch_ended(&mut self) -> Option<MoveOutcome> {
        if self.paused {
            return None;
        }
        let level = self.level.as_mut()?;
        let outcome = self.movement.end(&mut level.grid, &mut self.lock)?;
        match outcome {
            MoveOutcome::Settled { atom, position } => {
                self.emit(GameEvent::AtomPlaced { atom, position });
                self.check_for_success();
            }
            MoveOutcome::Sliding {
                atom, to, duration, ..
            } => {
                let signal = self.allocate_signal();
                self.awaiting = Some(Awaiting::Slide { signal });
                self.emit(GameEvent::AnimateMove {
                    signal,
                    atom,
                    to,
                    duration,
                });
                self.play(SoundEffect::AtomSlide);
            }
        }
        Some(outcome)
    }

    /// Gesture aborted; the atom goes back to where the drag started
    pub fn touch_cancelled(&mut self) -> Option<(AtomId, Vec2)> {
        let (atom, position) = self.movement.cancel()?;
        self.emit(GameEvent::AtomPlaced { atom, position });
        Some((atom, position))
    }

    /// Report that the animation behind `signal` has finished
    pub fn complete(&mut self, signal: Signal) -> Result<(), SessionError> {
        match self.awaiting {
            Some(Awaiting::Slide { signal: awaited }) if awaited == signal => {
                self.awaiting = None;
                let level = self.level.as_mut().ok_or(SessionError::NoLevel)?;
                self.movement.settle(&mut level.grid, &mut self.lock);
                self.play(SoundEffect::AtomStop);
                self.check_for_success();
                Ok(())
            }
            Some(Awaiting::Explosion {
                signal: awaited,
                index,
            }) if awaited == signal => {
                self.awaiting = None;
                self.increment_score(EXPLOSION_BONUS);
                self.explode(index + 1);
                Ok(())
            }
            _ => Err(SessionError::UnknownSignal(signal)),
        }
    }

    /// Freeze the clocks; a drag in progress snaps back
    pub fn pause(&mut self) {
        if matches!(self.status, Status::Running | Status::CountingDown) {
            self.paused = true;
            self.touch_cancelled();
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Reload the current level with the score it started with
    pub fn retry(&mut self) -> Result<(), SessionError> {
        let number = self.level.as_ref().ok_or(SessionError::NoLevel)?.number;
        log::info!("Retrying level {}", number);
        self.set_score(self.start_score);
        self.load_level(number)
    }

    /// Abandon the level; the board stays loaded but inert
    pub fn exit_to_menu(&mut self) {
        self.lock.lock();
        self.interrupt_move();
        self.paused = false;
        self.status = Status::Finished;
    }

    fn check_for_success(&mut self) {
        let solved = self.level.as_ref().is_some_and(Level::is_solved);
        if self.status == Status::Running && solved {
            self.success();
        }
    }

    fn success(&mut self) {
        if let Some(level) = &self.level {
            log::info!("Level {} solved with {}s left", level.number, self.remaining_time);
        }
        self.lock.lock();
        self.status = Status::Success;
        self.play(SoundEffect::LevelComplete);
        self.explode(0);
    }

    /// Explode the atom at `index` in placement order, or move on to the
    /// countdown once every atom is gone
    fn explode(&mut self, index: usize) {
        let atom = self
            .level
            .as_ref()
            .and_then(|l| l.grid.atoms().nth(index))
            .and_then(|o| o.atom_id());
        match atom {
            Some(atom) => {
                let signal = self.allocate_signal();
                self.awaiting = Some(Awaiting::Explosion { signal, index });
                self.emit(GameEvent::AnimateExplosion { signal, atom });
                self.play(SoundEffect::AtomExplode);
            }
            None => {
                self.status = Status::CountingDown;
                self.clock = 0.0;
                if self.remaining_time == 0 {
                    self.finish_level();
                }
            }
        }
    }

    fn finish_level(&mut self) {
        let Some(level) = &self.level else {
            return;
        };
        let (number, is_last) = (level.number, level.is_last());

        self.progress.set_level_completed(number, self.score);
        self.progress.save();
        log::info!("Level {} completed with score {}", number, self.score);
        self.emit(GameEvent::LevelCompleted {
            level: number,
            score: self.score,
        });

        if is_last {
            self.status = Status::Finished;
            self.emit(GameEvent::GameFinished { score: self.score });
            return;
        }
        if let Err(e) = self.load_level(number + 1) {
            log::error!("Could not load level {}: {}", number + 1, e);
            self.status = Status::Finished;
        }
    }

    /// Drop any drag or pending slide, telling the host where the atom
    /// really rests
    fn interrupt_move(&mut self) {
        let snapping = match self.movement.state() {
            DragState::Snapping { atom, .. } => Some(*atom),
            _ => None,
        };
        if let Some(atom) = snapping {
            self.movement.reset();
            let committed = self
                .level
                .as_ref()
                .and_then(|l| l.grid.atom(atom))
                .map(|o| o.position);
            if let Some(position) = committed {
                self.emit(GameEvent::AtomPlaced { atom, position });
            }
        } else {
            self.touch_cancelled();
        }
        self.awaiting = None;
    }

    fn timeout(&mut self) {
        self.lock.lock();
        self.interrupt_move();
        self.status = Status::TimedOut;
        if let Some(level) = &self.level {
            let number = level.number;
            log::info!("Level {} timed out", number);
            self.emit(GameEvent::TimedOut { level: number });
        }
        self.play(SoundEffect::TimeUp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::LAST_LEVEL;
    use crate::persistence::MemoryStore;
    use crate::settings::Profile;

    fn session() -> Session<Profile<MemoryStore>> {
        Session::new(Profile::load(MemoryStore::new()))
    }

    fn atom_position(session: &Session<Profile<MemoryStore>>, id: u16) -> Vec2 {
        session
            .level()
            .and_then(|l| l.grid.atom(AtomId(id)))
            .map(|o| o.position)
            .unwrap()
    }

    /// Drag from `from` by `delta`, release and let the slide animation finish
    fn slide(session: &mut Session<Profile<MemoryStore>>, from: Vec2, delta: Vec2) {
        assert!(session.touch_began(from).is_some(), "no atom at {}", from);
        session.touch_moved(from + delta);
        let outcome = session.touch_ended().unwrap();
        assert!(matches!(outcome, MoveOutcome::Sliding { .. }));
        let signal = session.awaited_signal().unwrap();
        session.complete(signal).unwrap();
    }

    #[test]
    fn test_start_level_one() {
        let mut session = session();
        assert_eq!(session.status(), Status::Starting);
        session.start(1).unwrap();

        assert_eq!(session.status(), Status::Running);
        assert_eq!(session.score(), 0);
        assert_eq!(session.remaining_time(), 300);
        let events = session.drain_events();
        assert!(matches!(
            &events[1],
            GameEvent::LevelStarted { level: 1, name, duration: 300 } if name == "WATER"
        ));
        assert!(events.contains(&GameEvent::TimeChanged(300)));
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn test_start_rejects_invalid_level() {
        let mut session = session();
        assert_eq!(
            session.start(0),
            Err(SessionError::Level(LevelError::InvalidLevelNumber(0)))
        );
        assert_eq!(session.status(), Status::Starting);
    }

    #[test]
    fn test_start_seeds_score_from_previous_level() {
        let mut profile = Profile::load(MemoryStore::new());
        profile.set_level_completed(6, 4200);
        let mut session = Session::new(profile);
        session.start(7).unwrap();
        assert_eq!(session.score(), 4200);
        assert_eq!(session.start_score(), 4200);
        assert_eq!(session.progress().current_level(), 7);
    }

    #[test]
    fn test_clock_counts_whole_seconds() {
        let mut session = session();
        session.start(1).unwrap();
        session.tick(0.6);
        assert_eq!(session.remaining_time(), 300);
        session.tick(0.6);
        assert_eq!(session.remaining_time(), 299);
        session.tick(10.0);
        assert_eq!(session.remaining_time(), 289);
    }

    #[test]
    fn test_pause_freezes_clock_and_drags() {
        let mut session = session();
        session.start(4).unwrap();
        session.pause();
        session.tick(5.0);
        assert_eq!(session.remaining_time(), 240);
        assert_eq!(session.touch_began(Vec2::new(72.0, 136.0)), None);

        session.resume();
        session.tick(5.0);
        assert_eq!(session.remaining_time(), 235);
        assert_eq!(session.touch_began(Vec2::new(72.0, 136.0)), Some(AtomId(0)));
    }

    #[test]
    fn test_timeout_locks_and_retry_restores() {
        let mut session = session();
        session.start(1).unwrap();
        session.tick(300.0);
        assert_eq!(session.status(), Status::TimedOut);
        assert!(session.lock().is_locked());
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::TimedOut { level: 1 }));
        assert!(events.contains(&GameEvent::PlaySound(SoundEffect::TimeUp)));

        // Nothing moves while timed out
        assert_eq!(session.touch_began(Vec2::new(72.0, 104.0)), None);

        session.retry().unwrap();
        assert_eq!(session.status(), Status::Running);
        assert_eq!(session.remaining_time(), 300);
        assert_eq!(session.score(), 0);
        assert!(!session.lock().is_locked());
    }

    #[test]
    fn test_short_drag_settles_in_place() {
        let mut session = session();
        session.start(4).unwrap();
        session.drain_events();

        let start = atom_position(&session, 0);
        session.touch_began(Vec2::new(72.0, 136.0)).unwrap();
        session.touch_moved(Vec2::new(72.0, 138.0));
        let outcome = session.touch_ended().unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Settled {
                atom: AtomId(0),
                position: start
            }
        );
        assert_eq!(atom_position(&session, 0), start);
        assert_eq!(session.awaited_signal(), None);
        assert!(!session.lock().is_locked());
    }

    #[test]
    fn test_slide_waits_for_signal() {
        let mut session = session();
        session.start(4).unwrap();
        session.drain_events();

        session.touch_began(Vec2::new(72.0, 136.0)).unwrap();
        assert_eq!(session.touch_moved(Vec2::new(72.0, 142.0)), Some(Vec2::new(64.0, 134.0)));
        session.touch_ended().unwrap();

        let signal = session.awaited_signal().unwrap();
        let events = session.drain_events();
        assert!(matches!(
            events[0],
            GameEvent::AnimateMove { atom: AtomId(0), to, .. } if to == Vec2::new(64.0, 144.0)
        ));
        // Not committed until the animation reports back, and no new drags
        assert_eq!(atom_position(&session, 0), Vec2::new(64.0, 128.0));
        assert!(session.lock().is_locked());
        assert_eq!(session.touch_began(Vec2::new(40.0, 120.0)), None);

        session.complete(signal).unwrap();
        assert_eq!(atom_position(&session, 0), Vec2::new(64.0, 144.0));
        assert!(!session.lock().is_locked());
        assert_eq!(session.complete(signal), Err(SessionError::UnknownSignal(signal)));
    }

    #[test]
    fn test_cancel_restores_start() {
        let mut session = session();
        session.start(4).unwrap();
        session.drain_events();

        session.touch_began(Vec2::new(72.0, 136.0)).unwrap();
        session.touch_moved(Vec2::new(72.0, 150.0));
        assert_eq!(
            session.touch_cancelled(),
            Some((AtomId(0), Vec2::new(64.0, 128.0)))
        );
        assert_eq!(atom_position(&session, 0), Vec2::new(64.0, 128.0));
        assert!(session.movement().is_idle());
    }

    #[test]
    fn test_solving_level_four() {
        let mut session = session();
        session.start(4).unwrap();

        // ATOM-0 up, ATOM-1 up, ATOM-0 left against ATOM-1
        slide(&mut session, Vec2::new(72.0, 136.0), Vec2::new(0.0, 6.0));
        slide(&mut session, Vec2::new(40.0, 120.0), Vec2::new(0.0, 6.0));
        assert_eq!(session.status(), Status::Running);
        slide(&mut session, Vec2::new(72.0, 152.0), Vec2::new(-6.0, 0.0));

        assert_eq!(atom_position(&session, 0), Vec2::new(48.0, 144.0));
        assert_eq!(atom_position(&session, 1), Vec2::new(32.0, 144.0));
        assert_eq!(session.status(), Status::Success);
        assert!(session.lock().is_locked());

        // One explosion per atom, in placement order
        for id in 0..2 {
            let signal = session.awaited_signal().unwrap();
            let events = session.drain_events();
            assert!(events.contains(&GameEvent::AnimateExplosion {
                signal,
                atom: AtomId(id)
            }));
            session.complete(signal).unwrap();
        }
        assert_eq!(session.status(), Status::CountingDown);
        assert_eq!(session.score(), 2 * EXPLOSION_BONUS);

        // 240 seconds left, 10 points each
        session.tick(10.0);
        let total = 2 * EXPLOSION_BONUS + 240 * COUNTDOWN_POINTS;
        let events = session.drain_events();
        assert!(events.contains(&GameEvent::LevelCompleted {
            level: 4,
            score: total
        }));
        assert!(events.contains(&GameEvent::HiScoreChanged(total)));
        assert_eq!(session.progress().level_score(4), total);
        assert_eq!(session.progress().hi_score(), total);

        // Next level is up with the carried score
        assert_eq!(session.status(), Status::Running);
        assert_eq!(session.level().map(|l| l.number), Some(5));
        assert_eq!(session.start_score(), total);
    }

    #[test]
    fn test_countdown_converts_at_fixed_rate() {
        let mut session = session();
        session.start(4).unwrap();
        session.status = Status::CountingDown;
        session.clock = 0.0;
        session.tick(COUNTDOWN_STEP * 4.0 + 0.001);
        assert_eq!(session.remaining_time(), 236);
        assert_eq!(session.score(), 4 * COUNTDOWN_POINTS);
    }

    #[test]
    fn test_last_level_finishes_game() {
        let mut session = session();
        session.start(LAST_LEVEL).unwrap();
        session.status = Status::CountingDown;
        session.tick(1000.0);
        assert_eq!(session.status(), Status::Finished);
        let events = session.drain_events();
        assert!(matches!(events.last(), Some(GameEvent::GameFinished { .. })));
        assert!(session.progress().is_level_completed(LAST_LEVEL));
    }

    #[test]
    fn test_sound_suppressed_when_disabled() {
        let mut profile = Profile::load(MemoryStore::new());
        profile.settings.set_sound_enabled(false);
        let mut session = Session::new(profile);
        session.start(1).unwrap();
        session.tick(300.0);
        assert!(
            !session
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::PlaySound(_)))
        );
    }

    #[test]
    fn test_pause_snaps_drag_back() {
        let mut session = session();
        session.start(4).unwrap();
        session.drain_events();

        session.touch_began(Vec2::new(72.0, 136.0)).unwrap();
        session.touch_moved(Vec2::new(72.0, 142.0));
        session.pause();
        assert!(session.movement().is_idle());
        assert_eq!(
            session.drain_events(),
            vec![GameEvent::AtomPlaced {
                atom: AtomId(0),
                position: Vec2::new(64.0, 128.0)
            }]
        );

        // Releasing while paused commits nothing
        assert_eq!(session.touch_ended(), None);
        session.resume();
        assert_eq!(session.touch_ended(), None);
        assert_eq!(atom_position(&session, 0), Vec2::new(64.0, 128.0));
        assert_eq!(session.awaited_signal(), None);
    }

    #[test]
    fn test_timeout_returns_dragged_atom() {
        let mut session = session();
        session.start(4).unwrap();
        session.drain_events();

        session.touch_began(Vec2::new(72.0, 136.0)).unwrap();
        session.touch_moved(Vec2::new(72.0, 142.0));
        session.tick(1000.0);

        assert_eq!(session.status(), Status::TimedOut);
        assert!(session.movement().is_idle());
        assert!(session.drain_events().contains(&GameEvent::AtomPlaced {
            atom: AtomId(0),
            position: Vec2::new(64.0, 128.0)
        }));
        assert_eq!(session.touch_ended(), None);
    }

    #[test]
    fn test_exit_during_slide_keeps_committed_position() {
        let mut session = session();
        session.start(4).unwrap();
        session.touch_began(Vec2::new(72.0, 136.0)).unwrap();
        session.touch_moved(Vec2::new(72.0, 142.0));
        session.touch_ended().unwrap();
        let signal = session.awaited_signal().unwrap();
        session.drain_events();

        session.exit_to_menu();
        assert_eq!(session.awaited_signal(), None);
        assert!(session.movement().is_idle());
        assert_eq!(
            session.drain_events(),
            vec![GameEvent::AtomPlaced {
                atom: AtomId(0),
                position: Vec2::new(64.0, 128.0)
            }]
        );
        assert_eq!(session.complete(signal), Err(SessionError::UnknownSignal(signal)));
        assert_eq!(atom_position(&session, 0), Vec2::new(64.0, 128.0));
    }

    #[test]
    fn test_exit_to_menu() {
        let mut session = session();
        session.start(2).unwrap();
        session.exit_to_menu();
        assert_eq!(session.status(), Status::Finished);
        session.tick(1000.0);
        assert_eq!(session.remaining_time(), session.level().unwrap().duration);
    }
}
