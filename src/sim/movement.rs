//! Atom dragging: travel bounds, axis locking and the committed end position
//!
//! A drag moves one atom along one axis. It always ends against the nearest
//! obstacle in the chosen direction, or back at its start when the gesture was
//! too short. Nothing is written to the grid until the move settles.

use glam::Vec2;

use super::grid::{AtomId, Grid};
use crate::consts::{MAX_SLIDE_SPEED, MIN_DRAG_DISTANCE, TILE_SIZE};

/// Global gate for starting new drags
///
/// `locked` belongs to the session (pause, success, timeout); `sliding` is held
/// by the movement engine while a slide animation runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveLock {
    locked: bool,
    sliding: bool,
}

impl MoveLock {
    /// Stop all atom interaction until `unlock`
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Clear both flags (new level)
    pub fn unlock(&mut self) {
        self.locked = false;
        self.sliding = false;
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked || self.sliding
    }

    #[inline]
    pub fn is_sliding(&self) -> bool {
        self.sliding
    }

    fn hold_for_slide(&mut self) {
        self.sliding = true;
    }

    fn release_slide(&mut self) {
        self.sliding = false;
    }
}

/// Axis a drag is locked to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Legal resting range of an atom on both axes (pixels, inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn clamp(&self, pos: Vec2) -> Vec2 {
        pos.clamp(self.min, self.max)
    }
}

/// Travel bounds of an atom from the obstacles sharing its row and column
///
/// An obstacle found in a direction stops the atom one tile short of it. With
/// no obstacle in a direction the atom cannot move that way.
pub fn compute_bounds(grid: &Grid, atom: AtomId) -> Option<Bounds> {
    let pos = grid.atom(atom)?.position;

    let mut right: Option<f32> = None;
    let mut left: Option<f32> = None;
    let mut up: Option<f32> = None;
    let mut down: Option<f32> = None;

    for obstacle in grid.obstacles() {
        if obstacle.atom_id() == Some(atom) {
            continue;
        }
        let other = obstacle.position;

        // Same row
        if other.y == pos.y {
            if other.x > pos.x {
                right = Some(right.map_or(other.x, |r| r.min(other.x)));
            } else if other.x < pos.x {
                left = Some(left.map_or(other.x, |l| l.max(other.x)));
            }
        }

        // Same column
        if other.x == pos.x {
            if other.y > pos.y {
                up = Some(up.map_or(other.y, |u| u.min(other.y)));
            } else if other.y < pos.y {
                down = Some(down.map_or(other.y, |d| d.max(other.y)));
            }
        }
    }

    Some(Bounds {
        min: Vec2::new(
            left.map_or(pos.x, |x| x + TILE_SIZE),
            down.map_or(pos.y, |y| y + TILE_SIZE),
        ),
        max: Vec2::new(
            right.map_or(pos.x, |x| x - TILE_SIZE),
            up.map_or(pos.y, |y| y - TILE_SIZE),
        ),
    })
}

/// An in-progress drag
#[derive(Debug, Clone, PartialEq)]
pub struct Drag {
    pub atom: AtomId,
    pub start_position: Vec2,
    start_touch: Vec2,
    last_touch: Vec2,
    axis: Option<Axis>,
    pub bounds: Bounds,
    /// On-screen position, not yet committed
    pub position: Vec2,
}

impl Drag {
    pub fn axis(&self) -> Option<Axis> {
        self.axis
    }
}

/// Per-session drag state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(Drag),
    /// Slide animation to `to` is running
    Snapping { atom: AtomId, to: Vec2 },
}

/// Result of releasing a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Atom is at rest and committed
    Settled { atom: AtomId, position: Vec2 },
    /// Atom must animate from its on-screen position to `to` over `duration`
    /// seconds; call `MovementEngine::settle` once the animation completes.
    Sliding {
        atom: AtomId,
        from: Vec2,
        to: Vec2,
        duration: f32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct MovementEngine {
    state: DragState,
}

impl MovementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DragState::Idle)
    }

    /// Current drag, if any
    pub fn drag(&self) -> Option<&Drag> {
        match &self.state {
            DragState::Dragging(drag) => Some(drag),
            _ => None,
        }
    }

    /// Drop any drag or pending slide (level teardown)
    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }

    /// Start dragging `atom` if interaction is unlocked and `touch` is on it
    pub fn begin(&mut self, grid: &Grid, lock: &MoveLock, atom: AtomId, touch: Vec2) -> bool {
        if lock.is_locked() || !self.is_idle() {
            return false;
        }
        let Some(obstacle) = grid.atom(atom) else {
            return false;
        };
        if !obstacle.frame_contains(touch) {
            return false;
        }
        let Some(bounds) = compute_bounds(grid, atom) else {
            return false;
        };

        let start_position = obstacle.position;
        self.state = DragState::Dragging(Drag {
            atom,
            start_position,
            start_touch: touch,
            last_touch: touch,
            axis: None,
            bounds,
            position: start_position,
        });
        true
    }

    /// Follow the touch along the locked axis; returns the on-screen position
    pub fn drag_to(&mut self, lock: &MoveLock, touch: Vec2) -> Option<Vec2> {
        if lock.is_locked() {
            return None;
        }
        let DragState::Dragging(drag) = &mut self.state else {
            return None;
        };

        drag.last_touch = touch;
        let delta = touch - drag.start_touch;

        if drag.axis.is_none() && delta != Vec2::ZERO {
            drag.axis = Some(if delta.x.abs() >= delta.y.abs() {
                Axis::Horizontal
            } else {
                Axis::Vertical
            });
        }

        // Keep the touch on the atom's center
        let origin = drag.start_position;
        let proposed = match drag.axis {
            Some(Axis::Horizontal) => Vec2::new(touch.x - TILE_SIZE / 2.0, origin.y),
            Some(Axis::Vertical) => Vec2::new(origin.x, touch.y - TILE_SIZE / 2.0),
            None => origin,
        };

        drag.position = drag.bounds.clamp(proposed);
        Some(drag.position)
    }

    /// Release the drag and decide where the atom comes to rest
    ///
    /// Zero-distance results are committed at once; anything else takes the
    /// slide lock and waits for `settle`.
    pub fn end(&mut self, grid: &mut Grid, lock: &mut MoveLock) -> Option<MoveOutcome> {
        if !matches!(self.state, DragState::Dragging(_)) {
            return None;
        }
        let DragState::Dragging(drag) = std::mem::take(&mut self.state) else {
            return None;
        };
        // Locked mid-gesture: the drag is dropped, nothing was committed
        if lock.is_locked() {
            return None;
        }

        let delta = drag.last_touch - drag.start_touch;
        let size = grid.size();
        let mut end = drag.start_position;
        let mut speed = 0.0;

        match drag.axis {
            Some(Axis::Horizontal) if delta.x.abs() >= MIN_DRAG_DISTANCE => {
                end.x = if delta.x > 0.0 {
                    drag.bounds.max.x
                } else {
                    drag.bounds.min.x
                };
                if size.x > 0.0 {
                    speed = (end.x - drag.position.x).abs() / size.x;
                }
            }
            Some(Axis::Vertical) if delta.y.abs() >= MIN_DRAG_DISTANCE => {
                end.y = if delta.y > 0.0 {
                    drag.bounds.max.y
                } else {
                    drag.bounds.min.y
                };
                if size.y > 0.0 {
                    speed = (end.y - drag.position.y).abs() / size.y;
                }
            }
            _ => {}
        }

        if speed > 0.0 {
            if speed > MAX_SLIDE_SPEED {
                log::warn!(
                    "Slide of {} took {:.2}s, clamping to {}",
                    drag.atom,
                    speed,
                    MAX_SLIDE_SPEED
                );
                speed = MAX_SLIDE_SPEED;
            }
            lock.hold_for_slide();
            self.state = DragState::Snapping {
                atom: drag.atom,
                to: end,
            };
            Some(MoveOutcome::Sliding {
                atom: drag.atom,
                from: drag.position,
                to: end,
                duration: speed,
            })
        } else {
            grid.set_atom_position(drag.atom, end);
            Some(MoveOutcome::Settled {
                atom: drag.atom,
                position: end,
            })
        }
    }

    /// Commit a finished slide and release the slide lock
    pub fn settle(&mut self, grid: &mut Grid, lock: &mut MoveLock) -> Option<AtomId> {
        let DragState::Snapping { atom, to } = self.state else {
            return None;
        };
        grid.set_atom_position(atom, to);
        lock.release_slide();
        self.state = DragState::Idle;
        Some(atom)
    }

    /// Abort the drag; the atom stays at its start position
    pub fn cancel(&mut self) -> Option<(AtomId, Vec2)> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(drag) => Some((drag.atom, drag.start_position)),
            other => {
                self.state = other;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Walled room of `w` x `h` cells (border included), one atom, extra walls
    fn room(w: i32, h: i32, atom: (i32, i32), walls: &[(i32, i32)]) -> (Grid, AtomId) {
        let mut grid = Grid::new();
        let mut id = None;
        for y in 0..h {
            for x in 0..w {
                if x == 0 || y == 0 || x == w - 1 || y == h - 1 || walls.contains(&(x, y)) {
                    grid.add_wall(1, x, y);
                } else if (x, y) == atom {
                    grid.add_floor(x, y);
                    id = Some(grid.add_atom(5, x, y));
                } else {
                    grid.add_floor(x, y);
                }
            }
        }
        grid.seal();
        (grid, id.unwrap())
    }

    fn center(grid: &Grid, atom: AtomId) -> Vec2 {
        grid.atom(atom).unwrap().position + Vec2::splat(TILE_SIZE / 2.0)
    }

    #[test]
    fn test_bounds_stop_one_tile_short() {
        // Atom at (2,2) in a 10x10 room, wall at (6,2)
        let (grid, atom) = room(10, 10, (2, 2), &[(6, 2)]);
        let pos = grid.atom(atom).unwrap().position;
        let bounds = compute_bounds(&grid, atom).unwrap();

        assert_eq!(bounds.max.x, pos.x + 3.0 * TILE_SIZE);
        assert_eq!(bounds.min.x, pos.x - TILE_SIZE);
        // Authored row 0 is the top wall after the flip
        assert_eq!(bounds.max.y, pos.y + TILE_SIZE);
        assert_eq!(bounds.min.y, pos.y - 6.0 * TILE_SIZE);
    }

    #[test]
    fn test_bounds_collapse_without_obstacles() {
        let mut grid = Grid::new();
        let atom = grid.add_atom(5, 3, 3);
        grid.seal();
        let pos = grid.atom(atom).unwrap().position;
        let bounds = compute_bounds(&grid, atom).unwrap();
        assert_eq!(bounds.min, pos);
        assert_eq!(bounds.max, pos);
    }

    #[test]
    fn test_wall_three_tiles_right() {
        // Nothing else in the atom's row except the wall
        let mut grid = Grid::new();
        let atom = grid.add_atom(5, 2, 5);
        grid.add_wall(1, 5, 5);
        grid.seal();
        let start = grid.atom(atom).unwrap().position;
        let mut lock = MoveLock::default();
        let mut engine = MovementEngine::new();

        let touch = center(&grid, atom);
        assert!(engine.begin(&grid, &lock, atom, touch));
        engine.drag_to(&lock, touch + Vec2::new(10.0, 0.0));
        let outcome = engine.end(&mut grid, &mut lock).unwrap();

        let MoveOutcome::Sliding { to, duration, .. } = outcome else {
            panic!("expected a slide, got {:?}", outcome);
        };
        assert_eq!(to, start + Vec2::new(2.0 * TILE_SIZE, 0.0));
        assert!(duration > 0.0 && duration <= MAX_SLIDE_SPEED);
        assert!(lock.is_sliding());
        // Not committed until the animation completes
        assert_eq!(grid.atom(atom).unwrap().position, start);

        assert_eq!(engine.settle(&mut grid, &mut lock), Some(atom));
        assert_eq!(grid.atom(atom).unwrap().position, to);
        assert!(!lock.is_locked());
        assert!(engine.is_idle());
    }

    #[test]
    fn test_axis_locks_on_first_deviation() {
        let (grid, atom) = room(10, 10, (4, 4), &[]);
        let lock = MoveLock::default();
        let mut engine = MovementEngine::new();
        let start = grid.atom(atom).unwrap().position;
        let touch = center(&grid, atom);

        assert!(engine.begin(&grid, &lock, atom, touch));
        // No deviation yet: stays put, no axis
        assert_eq!(engine.drag_to(&lock, touch), Some(start));
        assert_eq!(engine.drag().unwrap().axis(), None);

        // Mostly vertical first
        let pos = engine.drag_to(&lock, touch + Vec2::new(1.0, -20.0)).unwrap();
        assert_eq!(engine.drag().unwrap().axis(), Some(Axis::Vertical));
        assert_eq!(pos, Vec2::new(start.x, start.y - 20.0));

        // Later horizontal motion is ignored
        let pos = engine.drag_to(&lock, touch + Vec2::new(40.0, -20.0)).unwrap();
        assert_eq!(pos.x, start.x);
    }

    #[test]
    fn test_drag_is_clamped_to_bounds() {
        let (grid, atom) = room(8, 8, (3, 3), &[]);
        let lock = MoveLock::default();
        let mut engine = MovementEngine::new();
        let bounds = compute_bounds(&grid, atom).unwrap();
        let touch = center(&grid, atom);

        engine.begin(&grid, &lock, atom, touch);
        let pos = engine.drag_to(&lock, touch + Vec2::new(500.0, 0.0)).unwrap();
        assert_eq!(pos.x, bounds.max.x);
        let pos = engine.drag_to(&lock, touch - Vec2::new(500.0, 0.0)).unwrap();
        assert_eq!(pos.x, bounds.min.x);
    }

    #[test]
    fn test_short_drag_snaps_back() {
        let (mut grid, atom) = room(8, 8, (3, 3), &[]);
        let mut lock = MoveLock::default();
        let mut engine = MovementEngine::new();
        let start = grid.atom(atom).unwrap().position;
        let touch = center(&grid, atom);

        engine.begin(&grid, &lock, atom, touch);
        engine.drag_to(&lock, touch + Vec2::new(3.0, 0.0));
        let outcome = engine.end(&mut grid, &mut lock).unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Settled {
                atom,
                position: start
            }
        );
        assert!(!lock.is_locked());
        assert_eq!(grid.atom(atom).unwrap().position, start);
    }

    #[test]
    fn test_drag_already_at_target_commits_immediately() {
        let (mut grid, atom) = room(8, 8, (3, 3), &[]);
        let mut lock = MoveLock::default();
        let mut engine = MovementEngine::new();
        let bounds = compute_bounds(&grid, atom).unwrap();
        let touch = center(&grid, atom);

        engine.begin(&grid, &lock, atom, touch);
        engine.drag_to(&lock, touch + Vec2::new(500.0, 0.0));
        let outcome = engine.end(&mut grid, &mut lock).unwrap();
        let expected = Vec2::new(bounds.max.x, grid.atom(atom).unwrap().position.y);
        assert_eq!(
            outcome,
            MoveOutcome::Settled {
                atom,
                position: expected
            }
        );
        assert_eq!(grid.atom(atom).unwrap().position, expected);
    }

    #[test]
    fn test_cancel_reverts() {
        let (grid, atom) = room(8, 8, (3, 3), &[]);
        let lock = MoveLock::default();
        let mut engine = MovementEngine::new();
        let start = grid.atom(atom).unwrap().position;
        let touch = center(&grid, atom);

        engine.begin(&grid, &lock, atom, touch);
        engine.drag_to(&lock, touch + Vec2::new(30.0, 0.0));
        assert_eq!(engine.cancel(), Some((atom, start)));
        assert!(engine.is_idle());
        assert_eq!(grid.atom(atom).unwrap().position, start);
        assert_eq!(engine.cancel(), None);
    }

    #[test]
    fn test_lock_blocks_drags() {
        let (grid, atom) = room(8, 8, (3, 3), &[]);
        let mut lock = MoveLock::default();
        let mut engine = MovementEngine::new();
        let touch = center(&grid, atom);

        lock.lock();
        assert!(!engine.begin(&grid, &lock, atom, touch));
        lock.unlock();
        // Touch outside the atom's frame
        assert!(!engine.begin(&grid, &lock, atom, touch + Vec2::splat(TILE_SIZE)));
        assert!(engine.begin(&grid, &lock, atom, touch));
    }

    #[test]
    fn test_slide_lock_blocks_second_drag() {
        let (mut grid, atom) = room(8, 8, (3, 3), &[]);
        let mut lock = MoveLock::default();
        let mut engine = MovementEngine::new();
        let touch = center(&grid, atom);

        engine.begin(&grid, &lock, atom, touch);
        engine.drag_to(&lock, touch + Vec2::new(6.0, 0.0));
        assert!(matches!(
            engine.end(&mut grid, &mut lock),
            Some(MoveOutcome::Sliding { .. })
        ));
        assert!(lock.is_locked());
        assert!(!engine.begin(&grid, &lock, atom, touch));
        // A session lock taken mid-slide survives the slide release
        lock.lock();
        engine.settle(&mut grid, &mut lock);
        assert!(lock.is_locked());
    }

    proptest! {
        #[test]
        fn prop_bounds_reach_the_room_walls(
            w in 4i32..=16, h in 4i32..=16, ax in 1i32..15, ay in 1i32..15,
        ) {
            prop_assume!(ax < w - 1 && ay < h - 1);
            let (grid, atom) = room(w, h, (ax, ay), &[]);
            let bounds = compute_bounds(&grid, atom).unwrap();
            // Inner edge of the border walls
            prop_assert_eq!(bounds.min.x, TILE_SIZE);
            prop_assert_eq!(bounds.max.x, (w - 2) as f32 * TILE_SIZE);
            prop_assert_eq!(bounds.max.y, grid.size().y - TILE_SIZE);
            prop_assert_eq!(bounds.min.y, grid.size().y - (h - 2) as f32 * TILE_SIZE);
        }

        #[test]
        fn prop_bounds_stop_before_nearest_obstacle(
            ax in 2i32..8, ay in 2i32..8, d in 1i32..6, far in 1i32..4,
        ) {
            // Wall d tiles right of the atom and another one further out
            let near = (ax + d, ay);
            let (grid, atom) = room(16, 16, (ax, ay), &[near, (ax + d + far, ay)]);
            let pos = grid.atom(atom).unwrap().position;
            let bounds = compute_bounds(&grid, atom).unwrap();
            prop_assert_eq!(bounds.max.x, pos.x + (d - 1) as f32 * TILE_SIZE);
            prop_assert_eq!(crate::pixel_to_cell(bounds.max).x, ax + d - 1);
        }
    }
}
