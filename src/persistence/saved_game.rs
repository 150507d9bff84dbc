//! In-progress level snapshot

use std::collections::{BTreeMap, HashMap, HashSet};

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use super::{KeyValueStore, read_record, write_record};
use crate::consts::FIRST_LEVEL;
use crate::error::{PersistenceError, SessionError};
use crate::level::Level;
use crate::settings::ProgressStore;
use crate::sim::{AtomId, GameEvent, Grid, Session, Status};
use crate::{cell_to_pixel, pixel_to_cell};

/// Everything needed to resume a running level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub level_number: u8,
    pub score: u32,
    pub remaining_time: u32,
    /// Atom name ("ATOM-N") to pixel position
    pub atoms: BTreeMap<String, (f32, f32)>,
}

impl SavedGame {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "atomix_saved_game";

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<Self>, PersistenceError> {
        read_record(store, Self::STORAGE_KEY)
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), PersistenceError> {
        write_record(store, Self::STORAGE_KEY, self)?;
        log::info!("Saved game at level {}", self.level_number);
        Ok(())
    }

    pub fn clear<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<(), PersistenceError> {
        store.remove(Self::STORAGE_KEY)
    }

    /// Store the session if a level is running, otherwise drop any old snapshot
    pub fn sync<P, S>(session: &Session<P>, store: &mut S) -> Result<(), PersistenceError>
    where
        P: ProgressStore,
        S: KeyValueStore + ?Sized,
    {
        match session.snapshot() {
            Some(saved) => saved.save(store),
            None => Self::clear(store),
        }
    }
}

impl<P: ProgressStore> Session<P> {
    /// Snapshot of the running level; `None` in any other state
    pub fn snapshot(&self) -> Option<SavedGame> {
        if self.status != Status::Running {
            return None;
        }
        let level = self.level.as_ref()?;
        let atoms = level
            .grid
            .atoms()
            .filter_map(|o| {
                let id = o.atom_id()?;
                Some((id.to_string(), (o.position.x, o.position.y)))
            })
            .collect();
        Some(SavedGame {
            level_number: level.number,
            score: self.score,
            remaining_time: self.remaining_time,
            atoms,
        })
    }

    /// Reload the saved level and put time, score and atoms back
    ///
    /// The snapshot is checked against a freshly decoded level first; on any
    /// error the session is left untouched.
    pub fn restore(&mut self, saved: &SavedGame) -> Result<(), SessionError> {
        let mut level = Level::load(saved.level_number)?;
        let placed = saved.place_atoms(&mut level.grid)?;

        let seed = if saved.level_number > FIRST_LEVEL {
            self.progress.level_score(saved.level_number - 1)
        } else {
            0
        };
        self.set_score(seed);
        self.install_level(level);
        self.set_remaining_time(saved.remaining_time);
        self.set_score(saved.score);
        for (atom, position) in placed {
            self.emit(GameEvent::AtomPlaced { atom, position });
        }
        log::info!("Restored level {}", saved.level_number);
        Ok(())
    }
}

impl SavedGame {
    /// Move atoms to their saved cells, snapped to the tile grid
    ///
    /// Every atom must land on floor and alone in its cell.
    fn place_atoms(&self, grid: &mut Grid) -> Result<Vec<(AtomId, Vec2)>, SessionError> {
        let mut placed = Vec::with_capacity(self.atoms.len());
        for (name, &(x, y)) in &self.atoms {
            let atom = name
                .parse::<AtomId>()
                .ok()
                .filter(|&id| grid.atom(id).is_some())
                .ok_or_else(|| SessionError::UnknownAtom(name.clone()))?;
            let position = cell_to_pixel(pixel_to_cell(Vec2::new(x, y)));
            grid.set_atom_position(atom, position);
            placed.push((atom, position));
        }

        let floor: HashSet<IVec2> = grid.floor().iter().map(|&p| pixel_to_cell(p)).collect();
        let mut occupied: HashMap<IVec2, usize> = HashMap::new();
        for obstacle in grid.obstacles() {
            *occupied.entry(obstacle.cell()).or_default() += 1;
        }
        for &(atom, position) in &placed {
            let cell = pixel_to_cell(position);
            if !floor.contains(&cell) || occupied.get(&cell).copied().unwrap_or(0) > 1 {
                return Err(SessionError::BlockedCell {
                    atom: atom.to_string(),
                    cell,
                });
            }
        }
        debug_assert!(grid.is_consistent());
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LevelError;
    use crate::persistence::MemoryStore;
    use crate::settings::Profile;

    fn running_session() -> Session<Profile<MemoryStore>> {
        let mut session = Session::new(Profile::load(MemoryStore::new()));
        session.start(4).unwrap();
        session.tick(12.0);
        session
    }

    #[test]
    fn test_snapshot_of_running_level() {
        let session = running_session();
        let saved = session.snapshot().unwrap();
        assert_eq!(saved.level_number, 4);
        assert_eq!(saved.remaining_time, 228);
        assert_eq!(saved.atoms.len(), 2);
        assert_eq!(saved.atoms["ATOM-0"], (64.0, 128.0));
        assert_eq!(saved.atoms["ATOM-1"], (32.0, 112.0));
    }

    #[test]
    fn test_sync_removes_snapshot_when_not_running() {
        let mut store = MemoryStore::new();
        let mut session = running_session();
        SavedGame::sync(&session, &mut store).unwrap();
        assert!(SavedGame::load(&store).unwrap().is_some());

        session.exit_to_menu();
        SavedGame::sync(&session, &mut store).unwrap();
        assert_eq!(SavedGame::load(&store).unwrap(), None);
    }

    #[test]
    fn test_restore_applies_snapshot() {
        let mut saved = running_session().snapshot().unwrap();
        saved.score = 750;
        saved.atoms.insert("ATOM-0".into(), (64.0, 144.0));
        // Off the tile grid: snapped to the nearest cell
        saved.atoms.insert("ATOM-1".into(), (37.3, 101.9));

        let mut store = MemoryStore::new();
        saved.save(&mut store).unwrap();
        let loaded = SavedGame::load(&store).unwrap().unwrap();

        let mut session = Session::new(Profile::load(MemoryStore::new()));
        session.restore(&loaded).unwrap();
        assert_eq!(session.status(), Status::Running);
        assert_eq!(session.score(), 750);
        assert_eq!(session.remaining_time(), 228);
        let grid = &session.level().unwrap().grid;
        assert_eq!(grid.atom(AtomId(0)).unwrap().position, Vec2::new(64.0, 144.0));
        assert_eq!(grid.atom(AtomId(1)).unwrap().position, Vec2::new(32.0, 96.0));
        assert!(grid.is_consistent());
        assert!(session.drain_events().contains(&GameEvent::AtomPlaced {
            atom: AtomId(1),
            position: Vec2::new(32.0, 96.0)
        }));
    }

    #[test]
    fn test_restore_rejects_wall_cell() {
        let mut saved = running_session().snapshot().unwrap();
        saved.atoms.insert("ATOM-0".into(), (0.0, 160.0));

        let mut session = Session::new(Profile::load(MemoryStore::new()));
        assert_eq!(
            session.restore(&saved),
            Err(SessionError::BlockedCell {
                atom: "ATOM-0".into(),
                cell: IVec2::new(0, 10)
            })
        );
        assert_eq!(session.status(), Status::Starting);
        assert!(session.level().is_none());
    }

    #[test]
    fn test_restore_rejects_shared_cell() {
        let mut saved = running_session().snapshot().unwrap();
        saved.atoms.insert("ATOM-0".into(), (32.0, 112.0));

        let mut session = Session::new(Profile::load(MemoryStore::new()));
        assert_eq!(
            session.restore(&saved),
            Err(SessionError::BlockedCell {
                atom: "ATOM-0".into(),
                cell: IVec2::new(2, 7)
            })
        );
    }

    #[test]
    fn test_restore_rejects_unknown_atom() {
        let mut saved = running_session().snapshot().unwrap();
        saved.atoms.insert("ATOM-9".into(), (64.0, 144.0));

        let mut session = Session::new(Profile::load(MemoryStore::new()));
        assert_eq!(
            session.restore(&saved),
            Err(SessionError::UnknownAtom("ATOM-9".into()))
        );
    }

    #[test]
    fn test_failed_restore_keeps_current_level() {
        let mut session = running_session();
        session.set_score(1234);
        let mut saved = session.snapshot().unwrap();
        saved.level_number = 31;
        saved.score = 9999;

        assert_eq!(
            session.restore(&saved),
            Err(SessionError::Level(LevelError::InvalidLevelNumber(31)))
        );
        assert_eq!(session.score(), 1234);
        assert_eq!(session.remaining_time(), 228);
        assert_eq!(session.level().map(|l| l.number), Some(4));
        assert_eq!(session.status(), Status::Running);
    }
}
