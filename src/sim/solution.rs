//! Solution check: do the atoms form the target molecule?
//!
//! Matching is relative to the bounding box of the atoms, so the molecule may
//! be assembled anywhere on the board. The target is stored top row first while
//! the live grid grows upward, hence the mirrored row lookup.

use std::collections::HashMap;

use glam::IVec2;

use super::grid::Grid;
use crate::level::TargetSolution;

/// True when every target cell is covered by an atom of the same variant and
/// the atoms' bounding box has exactly the target's dimensions.
pub fn check_solution(grid: &Grid, target: &TargetSolution) -> bool {
    let atoms: HashMap<IVec2, u8> = grid.atoms().map(|a| (a.cell(), a.variant)).collect();
    if atoms.is_empty() {
        return false;
    }

    let mut min = IVec2::MAX;
    let mut max = IVec2::MIN;
    for cell in atoms.keys() {
        min = min.min(*cell);
        max = max.max(*cell);
    }

    let size = max - min + IVec2::ONE;
    if size.x as usize != target.width() || size.y as usize != target.height() {
        return false;
    }

    target.atoms().all(|(x, y, variant)| {
        let cell = IVec2::new(x as i32 + min.x, max.y - y as i32);
        atoms.get(&cell) == Some(&variant)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell_to_pixel;
    use crate::sim::grid::AtomId;
    use proptest::prelude::*;

    const A: u8 = 5;
    const B: u8 = 6;

    /// Grid with atoms at live cells (already bottom-up, no flip applied)
    fn grid_with(atoms: &[(i32, i32, u8)]) -> (Grid, Vec<AtomId>) {
        let mut grid = Grid::new();
        let ids = atoms
            .iter()
            .map(|&(x, y, v)| grid.add_atom(v, x, y))
            .collect();
        (grid, ids)
    }

    #[test]
    fn test_vertical_pair() {
        let target = TargetSolution::from_rows(&[&[A], &[A]]);
        let (mut grid, ids) = grid_with(&[(5, 5, A), (5, 6, A)]);
        assert!(check_solution(&grid, &target));

        grid.set_atom_position(ids[1], cell_to_pixel(IVec2::new(5, 7)));
        assert!(!check_solution(&grid, &target));
    }

    #[test]
    fn test_rows_are_mirrored() {
        // Target: A on top, B below
        let target = TargetSolution::from_rows(&[&[A], &[B]]);
        let (grid, _) = grid_with(&[(3, 4, B), (3, 5, A)]);
        assert!(check_solution(&grid, &target));

        let (grid, _) = grid_with(&[(3, 4, A), (3, 5, B)]);
        assert!(!check_solution(&grid, &target));
    }

    #[test]
    fn test_wrong_variant() {
        let target = TargetSolution::from_rows(&[&[A, B]]);
        let (grid, _) = grid_with(&[(1, 1, B), (2, 1, A)]);
        assert!(!check_solution(&grid, &target));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let target = TargetSolution::from_rows(&[&[A, 0, A]]);
        // Too narrow
        let (grid, _) = grid_with(&[(1, 1, A), (2, 1, A)]);
        assert!(!check_solution(&grid, &target));
        // Right width, but spread over two rows
        let (grid, _) = grid_with(&[(1, 1, A), (3, 2, A)]);
        assert!(!check_solution(&grid, &target));
        // Exact footprint
        let (grid, _) = grid_with(&[(1, 1, A), (3, 1, A)]);
        assert!(check_solution(&grid, &target));
    }

    #[test]
    fn test_empty_cells_are_unconstrained() {
        let target = TargetSolution::from_rows(&[&[0, A], &[A, 0]]);
        let (grid, _) = grid_with(&[(4, 4, A), (5, 5, A)]);
        assert!(check_solution(&grid, &target));
    }

    #[test]
    fn test_no_atoms_never_match() {
        let target = TargetSolution::new(1, 1, vec![0]);
        let grid = Grid::new();
        assert!(!check_solution(&grid, &target));
    }

    #[test]
    fn test_check_is_idempotent() {
        let target = TargetSolution::from_rows(&[&[A, B]]);
        let (grid, _) = grid_with(&[(2, 2, A), (3, 2, B)]);
        let first = check_solution(&grid, &target);
        assert_eq!(first, check_solution(&grid, &target));
        assert!(first);
    }

    proptest! {
        #[test]
        fn prop_translation_invariant(
            cells in proptest::collection::btree_set((0i32..4, 0i32..4), 1..6),
            variants in proptest::collection::vec(prop_oneof![Just(A), Just(B)], 6),
            dx in 0i32..8, dy in 0i32..8,
            solved in any::<bool>(),
        ) {
            // Target built from the atoms themselves (optionally corrupted)
            let atoms: Vec<(i32, i32, u8)> = cells
                .iter()
                .zip(&variants)
                .map(|(&(x, y), &v)| (x, y, v))
                .collect();
            let min_x = atoms.iter().map(|a| a.0).min().unwrap();
            let min_y = atoms.iter().map(|a| a.1).min().unwrap();
            let max_x = atoms.iter().map(|a| a.0).max().unwrap();
            let max_y = atoms.iter().map(|a| a.1).max().unwrap();
            let width = (max_x - min_x + 1) as usize;
            let height = (max_y - min_y + 1) as usize;
            let mut rows = vec![0u8; width * height];
            for &(x, y, v) in &atoms {
                let row = (max_y - y) as usize;
                rows[row * width + (x - min_x) as usize] = v;
            }
            if !solved {
                let first = rows.iter().position(|&v| v != 0).unwrap();
                rows[first] = if rows[first] == A { B } else { A };
            }
            let target = TargetSolution::new(width, height, rows);

            let (grid, _) = grid_with(&atoms);
            let shifted: Vec<(i32, i32, u8)> =
                atoms.iter().map(|&(x, y, v)| (x + dx, y + dy, v)).collect();
            let (moved, _) = grid_with(&shifted);

            let here = check_solution(&grid, &target);
            prop_assert_eq!(here, solved);
            prop_assert_eq!(check_solution(&moved, &target), here);
        }
    }
}
