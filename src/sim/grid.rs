//! Live board: floor tiles, walls and atoms of the level in play
//!
//! Cells are added in authoring order (top row first) and then flipped once so
//! that pixel y grows upward. After `seal` every node sits on a 16-pixel
//! boundary; only committed moves change atom positions.

use std::fmt;
use std::str::FromStr;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::consts::TILE_SIZE;
use crate::{cell_to_pixel, pixel_to_cell};

/// Stable atom identifier, numbered in placement order ("ATOM-0", "ATOM-1", ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomId(pub u16);

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ATOM-{}", self.0)
    }
}

impl FromStr for AtomId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("ATOM-").unwrap_or(s).parse().map(AtomId)
    }
}

/// What an obstacle is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Immovable
    Wall,
    /// Movable by the player
    Atom(AtomId),
}

/// A wall or atom occupying one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    /// Texture/shape index (low 6 bits of the cell byte)
    pub variant: u8,
    /// Lower-left corner in level pixels
    pub position: Vec2,
}

impl Obstacle {
    pub fn atom_id(&self) -> Option<AtomId> {
        match self.kind {
            ObstacleKind::Atom(id) => Some(id),
            ObstacleKind::Wall => None,
        }
    }

    #[inline]
    pub fn is_atom(&self) -> bool {
        matches!(self.kind, ObstacleKind::Atom(_))
    }

    /// Grid cell of the committed position
    #[inline]
    pub fn cell(&self) -> IVec2 {
        pixel_to_cell(self.position)
    }

    /// Whether a point lies inside this obstacle's tile frame
    pub fn frame_contains(&self, point: Vec2) -> bool {
        let rel = point - self.position;
        rel.x >= 0.0 && rel.y >= 0.0 && rel.x < TILE_SIZE && rel.y < TILE_SIZE
    }
}

/// The board of one level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Grid {
    /// Free floor markers (drawn under atoms, never block movement)
    floor: Vec<Vec2>,
    /// Walls and atoms in insertion order
    obstacles: Vec<Obstacle>,
    /// Obstacle index of each atom, indexed by `AtomId`
    atoms: Vec<usize>,
    /// Largest occupied cell seen while placing
    max_cell: IVec2,
    /// Level size in pixels, set by `seal`
    size: Vec2,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&mut self, x: i32, y: i32) -> Vec2 {
        self.max_cell = self.max_cell.max(IVec2::new(x, y));
        cell_to_pixel(IVec2::new(x, y))
    }

    /// Place a floor marker at a grid cell
    pub fn add_floor(&mut self, x: i32, y: i32) {
        let pos = self.track(x, y);
        self.floor.push(pos);
    }

    /// Register a wall or atom at a grid cell
    pub fn add_obstacle(&mut self, kind: ObstacleKind, variant: u8, x: i32, y: i32) {
        let position = self.track(x, y);
        if let ObstacleKind::Atom(id) = kind {
            let slot = id.0 as usize;
            if self.atoms.len() <= slot {
                self.atoms.resize(slot + 1, usize::MAX);
            }
            self.atoms[slot] = self.obstacles.len();
        }
        self.obstacles.push(Obstacle {
            kind,
            variant,
            position,
        });
    }

    pub fn add_wall(&mut self, variant: u8, x: i32, y: i32) {
        self.add_obstacle(ObstacleKind::Wall, variant, x, y);
    }

    /// Add an atom with the next sequential id
    pub fn add_atom(&mut self, variant: u8, x: i32, y: i32) -> AtomId {
        let id = AtomId(self.atoms.len() as u16);
        self.add_obstacle(ObstacleKind::Atom(id), variant, x, y);
        id
    }

    /// Fix the level size from the occupied bounding box and flip every node
    /// so y grows upward: `new_y = height - old_y`.
    pub fn seal(&mut self) {
        self.size = (self.max_cell + IVec2::ONE).as_vec2() * TILE_SIZE;
        let height = self.size.y;
        for pos in &mut self.floor {
            pos.y = height - pos.y;
        }
        for obstacle in &mut self.obstacles {
            obstacle.position.y = height - obstacle.position.y;
        }
    }

    /// Level size in pixels
    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn floor(&self) -> &[Vec2] {
        &self.floor
    }

    /// All walls and atoms in insertion order
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Atoms in placement order
    pub fn atoms(&self) -> impl Iterator<Item = &Obstacle> {
        self.atoms.iter().filter_map(|&i| self.obstacles.get(i))
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Obstacle> {
        self.atoms
            .get(id.0 as usize)
            .and_then(|&i| self.obstacles.get(i))
    }

    /// Commit an atom's resting position
    pub fn set_atom_position(&mut self, id: AtomId, position: Vec2) -> bool {
        match self.atoms.get(id.0 as usize).copied() {
            Some(i) if i < self.obstacles.len() => {
                self.obstacles[i].position = position;
                true
            }
            _ => false,
        }
    }

    /// Atom whose tile frame contains the point
    pub fn atom_at_point(&self, point: Vec2) -> Option<AtomId> {
        self.atoms()
            .find(|a| a.frame_contains(point))
            .and_then(Obstacle::atom_id)
    }

    /// Every obstacle is tile-aligned and no two share a position
    pub fn is_consistent(&self) -> bool {
        let aligned = self
            .obstacles
            .iter()
            .all(|o| o.position.x % TILE_SIZE == 0.0 && o.position.y % TILE_SIZE == 0.0);
        let mut cells: Vec<IVec2> = self.obstacles.iter().map(Obstacle::cell).collect();
        cells.sort_by_key(|c| (c.x, c.y));
        cells.dedup();
        aligned && cells.len() == self.obstacles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_ids_are_sequential() {
        let mut grid = Grid::new();
        grid.add_wall(1, 0, 0);
        let a = grid.add_atom(5, 1, 0);
        let b = grid.add_atom(6, 2, 0);
        assert_eq!(a, AtomId(0));
        assert_eq!(b, AtomId(1));
        assert_eq!(a.to_string(), "ATOM-0");
        assert_eq!("ATOM-1".parse::<AtomId>().unwrap(), b);
        assert_eq!(grid.atom_count(), 2);
        assert_eq!(grid.obstacles().len(), 3);
    }

    #[test]
    fn test_seal_sizes_and_flips() {
        let mut grid = Grid::new();
        grid.add_wall(1, 0, 0);
        grid.add_floor(3, 1);
        let atom = grid.add_atom(5, 3, 1);
        grid.seal();

        // Occupied box is 4x2 cells
        assert_eq!(grid.size(), Vec2::new(64.0, 32.0));
        // Row 0 lands on top, row 1 below it
        assert_eq!(grid.obstacles()[0].position, Vec2::new(0.0, 32.0));
        assert_eq!(grid.atom(atom).unwrap().position, Vec2::new(48.0, 16.0));
        assert_eq!(grid.floor()[0], Vec2::new(48.0, 16.0));
        assert!(grid.is_consistent());
    }

    #[test]
    fn test_atom_hit_testing() {
        let mut grid = Grid::new();
        let atom = grid.add_atom(5, 2, 2);
        grid.seal();
        let pos = grid.atom(atom).unwrap().position;

        assert_eq!(grid.atom_at_point(pos + Vec2::splat(8.0)), Some(atom));
        assert_eq!(grid.atom_at_point(pos + Vec2::new(16.0, 8.0)), None);
        assert_eq!(grid.atom_at_point(pos - Vec2::splat(0.5)), None);
    }

    #[test]
    fn test_overlapping_atoms_are_inconsistent() {
        let mut grid = Grid::new();
        let a = grid.add_atom(5, 1, 1);
        grid.add_atom(5, 2, 1);
        grid.seal();
        let target = grid.obstacles()[1].position;
        assert!(grid.set_atom_position(a, target));
        assert!(!grid.is_consistent());
        assert!(!grid.set_atom_position(AtomId(7), target));
    }
}
