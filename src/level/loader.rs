//! Sequential decoder for level blobs

use crate::consts::{GRID_SIZE, LAST_LEVEL, LEVEL_BLOB_LEN, NAME_LEN};
use crate::error::LevelError;
use crate::is_valid_level;
use crate::sim::Grid;

use super::data::LEVELS;
use super::{Field, Level, TargetSolution};

/// Raw blob of a built-in level
pub fn blob(number: u8) -> Result<&'static [u8], LevelError> {
    if !is_valid_level(number) {
        return Err(LevelError::InvalidLevelNumber(number));
    }
    debug_assert_eq!(LEVELS.len(), LAST_LEVEL as usize);
    Ok(LEVELS[number as usize - 1])
}

/// Cursor over a level blob
pub struct LevelReader<'a> {
    level: u8,
    data: &'a [u8],
    index: usize,
}

impl<'a> LevelReader<'a> {
    pub fn new(level: u8, data: &'a [u8]) -> Self {
        Self {
            level,
            data,
            index: 0,
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.index
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LevelError> {
        let end = self.index + n;
        if end > self.data.len() {
            return Err(LevelError::MalformedLevelData {
                level: self.level,
                needed: end,
                available: self.data.len(),
            });
        }
        let bytes = &self.data[self.index..end];
        self.index = end;
        Ok(bytes)
    }

    pub fn byte(&mut self) -> Result<u8, LevelError> {
        Ok(self.take(1)?[0])
    }

    /// Big-endian u16
    pub fn integer(&mut self) -> Result<u32, LevelError> {
        let bytes = self.take(2)?;
        Ok(((bytes[0] as u32) << 8) + bytes[1] as u32)
    }

    /// Fixed 15-byte ASCII field; zero bytes are skipped
    pub fn string(&mut self) -> Result<String, LevelError> {
        let bytes = self.take(NAME_LEN)?;
        Ok(bytes
            .iter()
            .filter(|&&b| b != 0)
            .map(|&b| b as char)
            .collect())
    }

    /// Target layer, cropped to the bounding box of its atom cells
    pub fn read_solution(&mut self) -> Result<TargetSolution, LevelError> {
        let layer = self.take(GRID_SIZE * GRID_SIZE)?;

        let mut min = (GRID_SIZE, GRID_SIZE);
        let mut max = (0, 0);
        let mut found = false;
        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                if let Field::Atom(_) = Field::from_byte(layer[y * GRID_SIZE + x]) {
                    found = true;
                    min = (min.0.min(x), min.1.min(y));
                    max = (max.0.max(x), max.1.max(y));
                }
            }
        }

        if !found {
            return Ok(TargetSolution::new(1, 1, vec![0]));
        }

        let width = max.0 - min.0 + 1;
        let height = max.1 - min.1 + 1;
        let mut cells = Vec::with_capacity(width * height);
        for y in min.1..=max.1 {
            for x in min.0..=max.0 {
                let variant = match Field::from_byte(layer[y * GRID_SIZE + x]) {
                    Field::Atom(v) => v,
                    _ => 0,
                };
                cells.push(variant);
            }
        }
        Ok(TargetSolution::new(width, height, cells))
    }

    /// Playfield layer: walls, floor and atoms, sealed and flipped
    pub fn read_playfield(&mut self) -> Result<Grid, LevelError> {
        let layer = self.take(GRID_SIZE * GRID_SIZE)?;
        let mut grid = Grid::new();

        for y in 0..GRID_SIZE as i32 {
            for x in 0..GRID_SIZE as i32 {
                match Field::from_byte(layer[(y as usize) * GRID_SIZE + x as usize]) {
                    Field::Wall(variant) => grid.add_wall(variant, x, y),
                    Field::Atom(variant) => {
                        grid.add_floor(x, y);
                        grid.add_atom(variant, x, y);
                    }
                    Field::Free => grid.add_floor(x, y),
                    Field::Empty => {}
                }
            }
        }

        grid.seal();
        Ok(grid)
    }

    /// Decode a whole level
    pub fn read_level(mut self) -> Result<Level, LevelError> {
        if self.data.len() < LEVEL_BLOB_LEN {
            return Err(LevelError::MalformedLevelData {
                level: self.level,
                needed: LEVEL_BLOB_LEN,
                available: self.data.len(),
            });
        }

        let solution = self.read_solution()?;
        let grid = self.read_playfield()?;
        let duration = self.integer()?;
        let name = self.string()?;
        let description = self.string()?;
        let cursor_type = self.byte()?;
        let background = self.byte()?;

        log::debug!(
            "Decoded level {} '{}': {} atoms, {}s",
            self.level,
            name,
            grid.atom_count(),
            duration
        );

        Ok(Level {
            number: self.level,
            duration,
            name,
            description,
            cursor_type,
            background,
            grid,
            solution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{FIRST_LEVEL, LAYER_LEN};
    use glam::Vec2;

    fn empty_blob() -> Vec<u8> {
        vec![0; LEVEL_BLOB_LEN]
    }

    #[test]
    fn test_level_one_header() {
        let data = blob(1).unwrap();
        let level = Level::load(1).unwrap();
        assert_eq!(level.duration, ((data[512] as u32) << 8) + data[513] as u32);
        assert_eq!((data[512], data[513]), (0x01, 0x2C));
        assert_eq!(level.duration, 300);
        assert_eq!(level.name, "WATER");
        assert_eq!(level.description, "H2O");
        assert_eq!(level.cursor_type, data[544]);
        assert_eq!(level.background, data[545]);
    }

    #[test]
    fn test_level_one_layout() {
        let level = Level::load(1).unwrap();
        // H-O-H in a single row
        assert_eq!(level.solution.width(), 3);
        assert_eq!(level.solution.height(), 1);
        assert_eq!(level.grid.atom_count(), 3);
        // 11x8 walled room
        assert_eq!(level.grid.size(), Vec2::new(176.0, 128.0));
    }

    #[test]
    fn test_every_level_decodes_consistently() {
        for n in FIRST_LEVEL..=LAST_LEVEL {
            let data = blob(n).unwrap();
            assert_eq!(data.len(), LEVEL_BLOB_LEN, "level {} blob length", n);

            let level = Level::load(n).unwrap();
            let target = &level.solution;
            assert!(target.width() >= 1 && target.width() <= GRID_SIZE);
            assert!(target.height() >= 1 && target.height() <= GRID_SIZE);
            assert_eq!(
                level.grid.atom_count(),
                target.atom_count(),
                "level {} atom count",
                n
            );
            assert!(level.grid.is_consistent(), "level {} grid", n);
            assert!(level.duration > 0);
            assert!(!level.name.is_empty() && level.name.len() <= NAME_LEN);
        }
    }

    #[test]
    fn test_atom_variants_match_target() {
        for n in FIRST_LEVEL..=LAST_LEVEL {
            let level = Level::load(n).unwrap();
            let mut placed: Vec<u8> = level.grid.atoms().map(|a| a.variant).collect();
            let mut wanted: Vec<u8> = level.solution.atoms().map(|(_, _, v)| v).collect();
            placed.sort_unstable();
            wanted.sort_unstable();
            assert_eq!(placed, wanted, "level {} variants", n);
        }
    }

    #[test]
    fn test_solution_crop() {
        let mut data = empty_blob();
        // Atoms at (4,2) and (4,3), a wall byte at (9,9) that must be ignored
        data[2 * 16 + 4] = 0x45;
        data[3 * 16 + 4] = 0x45;
        data[9 * 16 + 9] = 0xC1;
        let target = LevelReader::new(1, &data).read_solution().unwrap();
        assert_eq!((target.width(), target.height()), (1, 2));
        assert_eq!(target.get(0, 0), 5);
        assert_eq!(target.get(0, 1), 5);
    }

    #[test]
    fn test_empty_solution_is_single_zero_cell() {
        let data = empty_blob();
        let target = LevelReader::new(1, &data).read_solution().unwrap();
        assert_eq!((target.width(), target.height()), (1, 1));
        assert_eq!(target.get(0, 0), 0);
        assert_eq!(target.atom_count(), 0);
    }

    #[test]
    fn test_playfield_cells() {
        let mut data = empty_blob();
        let pf = LAYER_LEN;
        data[pf] = 0xC2; // wall (0,0)
        data[pf + 1] = 0x80; // free (1,0)
        data[pf + 16 + 1] = 0x47; // atom (1,1)
        data[pf + 16 + 2] = 0x43; // atom (2,1)
        let mut reader = LevelReader::new(1, &data);
        reader.read_solution().unwrap();
        let grid = reader.read_playfield().unwrap();

        assert_eq!(reader.position(), 2 * LAYER_LEN);
        assert_eq!(grid.obstacles().len(), 3);
        assert_eq!(grid.floor().len(), 3);
        assert_eq!(grid.size(), Vec2::new(48.0, 32.0));
        let ids: Vec<String> = grid
            .atoms()
            .map(|a| a.atom_id().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["ATOM-0", "ATOM-1"]);
        // Row 1 sits below row 0 after the flip
        assert_eq!(grid.obstacles()[0].position, Vec2::new(0.0, 32.0));
        assert_eq!(grid.obstacles()[1].position, Vec2::new(16.0, 16.0));
    }

    #[test]
    fn test_strings_skip_zero_bytes() {
        let mut data = vec![0u8; NAME_LEN * 2];
        data[0] = b'H';
        data[3] = b'2';
        data[14] = b'O';
        data[NAME_LEN] = b'X';
        let mut reader = LevelReader::new(1, &data);
        assert_eq!(reader.string().unwrap(), "H2O");
        assert_eq!(reader.position(), NAME_LEN);
        assert_eq!(reader.string().unwrap(), "X");
    }

    #[test]
    fn test_truncated_blob_is_malformed() {
        let data = vec![0u8; 100];
        let err = LevelReader::new(3, &data).read_level().unwrap_err();
        assert_eq!(
            err,
            LevelError::MalformedLevelData {
                level: 3,
                needed: LEVEL_BLOB_LEN,
                available: 100
            }
        );
        let mut reader = LevelReader::new(3, &data[..1]);
        assert!(reader.integer().is_err());
    }

    #[test]
    fn test_blob_rejects_invalid_numbers() {
        assert_eq!(blob(0).unwrap_err(), LevelError::InvalidLevelNumber(0));
        assert_eq!(blob(31).unwrap_err(), LevelError::InvalidLevelNumber(31));
        assert!(blob(30).is_ok());
    }
}
