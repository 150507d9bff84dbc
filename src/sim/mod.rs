//! Deterministic puzzle simulation
//!
//! All gameplay logic lives here:
//! - Grid of walls, floor and atoms
//! - Drag bounds and slide commits
//! - Solution matching against the target molecule
//! - The session state machine and its event queue
//!
//! No rendering or platform dependencies. Time only advances through
//! `Session::tick`.

pub mod grid;
pub mod movement;
pub mod solution;
pub mod state;
pub mod tick;

pub use grid::{AtomId, Grid, Obstacle, ObstacleKind};
pub use movement::{Axis, Bounds, DragState, MoveLock, MoveOutcome, MovementEngine, compute_bounds};
pub use solution::check_solution;
pub use state::{GameEvent, Session, Signal, Status};
