//! Levels: static blobs, decoding and the target molecule
//!
//! Each level is a fixed 546-byte blob:
//! - 256 bytes target-solution layer (row-major, top row first)
//! - 256 bytes playfield layer (same order)
//! - big-endian u16 duration in seconds
//! - two 15-byte zero-padded ASCII strings (name, description)
//! - cursor type byte, background index byte

mod data;
mod loader;
pub mod preview;

pub use loader::{LevelReader, blob};

use serde::{Deserialize, Serialize};

use crate::consts::LAST_LEVEL;
use crate::error::LevelError;
use crate::sim::Grid;

/// Decoded cell byte: top 2 bits select the type, low 6 bits the variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Background, nothing placed
    Empty,
    /// Floor an atom may slide over
    Free,
    Atom(u8),
    Wall(u8),
}

impl Field {
    pub const TYPE_MASK: u8 = 0xC0;
    pub const INDEX_MASK: u8 = 0x3F;

    pub const FREE: u8 = 0x80;
    pub const ATOM: u8 = 0x40;
    pub const WALL: u8 = 0xC0;

    pub fn from_byte(byte: u8) -> Self {
        let variant = byte & Self::INDEX_MASK;
        match byte & Self::TYPE_MASK {
            Self::WALL => Field::Wall(variant),
            Self::ATOM => Field::Atom(variant),
            Self::FREE => Field::Free,
            _ => Field::Empty,
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Field::Empty => 0,
            Field::Free => Self::FREE,
            Field::Atom(v) => Self::ATOM | (v & Self::INDEX_MASK),
            Field::Wall(v) => Self::WALL | (v & Self::INDEX_MASK),
        }
    }
}

/// Target molecule cropped to its bounding box
///
/// Row 0 is the top row as authored. Cells hold the atom variant, 0 = no atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSolution {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl TargetSolution {
    /// Build from row-major cells; panics if `cells.len() != width * height`
    pub fn new(width: usize, height: usize, cells: Vec<u8>) -> Self {
        assert_eq!(cells.len(), width * height, "cell count must match dimensions");
        Self {
            width,
            height,
            cells,
        }
    }

    /// Build from rows of variants (tests and tools)
    pub fn from_rows(rows: &[&[u8]]) -> Self {
        let width = rows.first().map_or(0, |r| r.len());
        let cells: Vec<u8> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(width, rows.len(), cells)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            0
        }
    }

    /// Non-empty cells as (x, y, variant), row by row
    pub fn atoms(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0)
            .map(|(i, &v)| (i % self.width, i / self.width, v))
    }

    pub fn atom_count(&self) -> usize {
        self.cells.iter().filter(|&&v| v != 0).count()
    }
}

/// A decoded level, owned by the session until the next load
#[derive(Debug, Clone)]
pub struct Level {
    pub number: u8,
    /// Seconds allowed
    pub duration: u32,
    pub name: String,
    pub description: String,
    pub cursor_type: u8,
    pub background: u8,
    /// Live board
    pub grid: Grid,
    pub solution: TargetSolution,
}

impl Level {
    /// Decode the built-in level `number` (1..=30)
    pub fn load(number: u8) -> Result<Self, LevelError> {
        let data = blob(number)?;
        LevelReader::new(number, data).read_level()
    }

    /// Whether the atoms currently form the target molecule
    pub fn is_solved(&self) -> bool {
        crate::sim::check_solution(&self.grid, &self.solution)
    }

    pub fn is_last(&self) -> bool {
        self.number >= LAST_LEVEL
    }

    /// Board sprites, back to front
    pub fn render_list(&self) -> Vec<crate::atlas::Sprite> {
        crate::atlas::render_list(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FIRST_LEVEL;

    #[test]
    fn test_field_type_bits() {
        assert_eq!(Field::from_byte(0x80), Field::Free);
        assert_eq!(Field::from_byte(0x45), Field::Atom(5));
        assert_eq!(Field::from_byte(0xC3), Field::Wall(3));
        assert_eq!(Field::from_byte(0x00), Field::Empty);
        assert_eq!(Field::from_byte(0x3F), Field::Empty);
        assert_eq!(Field::Atom(5).to_byte(), 0x45);
        assert_eq!(Field::Wall(3).to_byte(), 0xC3);
    }

    #[test]
    fn test_target_solution_accessors() {
        let target = TargetSolution::from_rows(&[&[0, 3, 0], &[1, 6, 2]]);
        assert_eq!(target.width(), 3);
        assert_eq!(target.height(), 2);
        assert_eq!(target.get(1, 0), 3);
        assert_eq!(target.get(5, 5), 0);
        assert_eq!(target.atom_count(), 4);
        let cells: Vec<_> = target.atoms().collect();
        assert_eq!(cells[0], (1, 0, 3));
        assert_eq!(cells[3], (2, 1, 2));
    }

    #[test]
    fn test_load_rejects_out_of_range() {
        assert_eq!(Level::load(0).unwrap_err(), LevelError::InvalidLevelNumber(0));
        assert_eq!(Level::load(31).unwrap_err(), LevelError::InvalidLevelNumber(31));
    }

    #[test]
    fn test_levels_start_unsolved() {
        for n in FIRST_LEVEL..=LAST_LEVEL {
            let level = Level::load(n).unwrap();
            assert!(!level.is_solved(), "level {} is solved before any move", n);
        }
    }
}
