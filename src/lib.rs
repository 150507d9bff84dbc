//! Atomix - slide atoms around a walled grid until they form the target molecule
//!
//! Core modules:
//! - `level`: Static level blobs, the blob decoder and the solution preview
//! - `sim`: Deterministic puzzle simulation (grid, movement, solution check, session)
//! - `settings`: Persisted preferences and per-level progress
//! - `persistence`: Versioned key-value records (settings, saved game)
//! - `platform`: Logging and storage backends per target
//! - `atlas`: Texture ids and render lists handed to the renderer
//! - `audio`: Sound effects the host plays on request

pub mod atlas;
pub mod audio;
pub mod error;
pub mod level;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::{LevelError, PersistenceError, SessionError};
pub use level::{Level, TargetSolution};
pub use settings::{Profile, ProgressStore, Settings};
pub use sim::{GameEvent, Session, Signal, Status};

use glam::{IVec2, Vec2};

/// Game configuration constants
pub mod consts {
    /// Tile size in pixels (tiles are square)
    pub const TILE_SIZE: f32 = 16.0;
    /// Preview atoms are drawn at half size
    pub const SMALL_ATOM_SIZE: f32 = 8.0;

    /// Logical grid is 16x16 cells
    pub const GRID_SIZE: usize = 16;
    /// Bytes per grid layer
    pub const LAYER_LEN: usize = GRID_SIZE * GRID_SIZE;
    /// Fixed string fields in the level header
    pub const NAME_LEN: usize = 15;
    /// Two layers + duration + name + description + cursor + background
    pub const LEVEL_BLOB_LEN: usize = 2 * LAYER_LEN + 2 + 2 * NAME_LEN + 2;

    pub const FIRST_LEVEL: u8 = 1;
    pub const LAST_LEVEL: u8 = 30;

    /// A drag shorter than this (pixels) snaps back
    pub const MIN_DRAG_DISTANCE: f32 = 4.0;
    /// Upper bound for slide animation duration (seconds)
    pub const MAX_SLIDE_SPEED: f32 = 2.0;

    /// Points per exploded atom on success
    pub const EXPLOSION_BONUS: u32 = 500;
    /// Points per remaining second during the countdown
    pub const COUNTDOWN_POINTS: u32 = 10;
    /// Seconds between countdown steps
    pub const COUNTDOWN_STEP: f64 = 0.025;
    /// Seconds per gameplay clock tick
    pub const CLOCK_STEP: f64 = 1.0;

    /// Draw order
    pub const BACKGROUND_Z: f32 = 0.0;
    pub const PREVIEW_Z: f32 = 10.0;
    pub const FREE_Z: f32 = 20.0;
    pub const WALL_Z: f32 = 30.0;
    pub const ATOM_Z: f32 = 40.0;
}

/// Pixel position of the lower-left corner of a grid cell
#[inline]
pub fn cell_to_pixel(cell: IVec2) -> Vec2 {
    cell.as_vec2() * consts::TILE_SIZE
}

/// Grid cell containing a grid-aligned pixel position
#[inline]
pub fn pixel_to_cell(pos: Vec2) -> IVec2 {
    (pos / consts::TILE_SIZE).round().as_ivec2()
}

/// Whether a level number is playable
#[inline]
pub fn is_valid_level(level: u8) -> bool {
    (consts::FIRST_LEVEL..=consts::LAST_LEVEL).contains(&level)
}
