//! Molecule preview: the target solution drawn with half-size atoms

use glam::Vec2;

use super::Level;
use crate::atlas::{Sprite, SpriteOwner, TextureId};
use crate::consts::{PREVIEW_Z, SMALL_ATOM_SIZE};

/// Room left above the molecule for its title
pub const TITLE_OFFSET: f32 = 8.0;

impl Level {
    /// Small-atom sprites of the target molecule, centered in a panel of
    /// `panel` pixels and lowered by `title_offset`.
    ///
    /// Sprites are anchored at their top-left corner; row 0 of the target is
    /// the top row, so later rows step downward.
    pub fn preview(&self, panel: Vec2, title_offset: f32) -> Vec<Sprite> {
        let width = self.solution.width() as f32 * SMALL_ATOM_SIZE;
        let height = self.solution.height() as f32 * SMALL_ATOM_SIZE;
        let origin = Vec2::new(
            (panel.x - width) / 2.0,
            (panel.y + height) / 2.0 - title_offset,
        );

        self.solution
            .atoms()
            .map(|(x, y, variant)| Sprite {
                owner: SpriteOwner::Preview,
                texture: TextureId::SmallAtom(variant),
                position: origin + Vec2::new(x as f32, -(y as f32)) * SMALL_ATOM_SIZE,
                z: PREVIEW_Z,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_water_preview_layout() {
        let level = Level::load(1).unwrap();
        assert_eq!(level.solution.width(), 3);
        let sprites = level.preview(Vec2::new(120.0, 80.0), TITLE_OFFSET);
        assert_eq!(sprites.len(), 3);

        // 24x8 molecule in a 120x80 panel
        assert_eq!(sprites[0].position, Vec2::new(48.0, 36.0));
        assert_eq!(sprites[1].position, Vec2::new(56.0, 36.0));
        assert_eq!(sprites[2].position, Vec2::new(64.0, 36.0));
        assert!(sprites.iter().all(|s| s.owner == SpriteOwner::Preview));
        assert!(matches!(sprites[0].texture, TextureId::SmallAtom(_)));
    }

    #[test]
    fn test_rows_step_downward() {
        for n in crate::consts::FIRST_LEVEL..=crate::consts::LAST_LEVEL {
            let level = Level::load(n).unwrap();
            let sprites = level.preview(Vec2::splat(128.0), 0.0);
            let cells: Vec<_> = level.solution.atoms().collect();
            assert_eq!(sprites.len(), cells.len());

            // Each sprite sits at its cell offset from the first, with y
            // falling one small atom per target row
            let (x0, y0, _) = cells[0];
            for (sprite, &(x, y, variant)) in sprites.iter().zip(&cells) {
                let dx = x as f32 - x0 as f32;
                let dy = y as f32 - y0 as f32;
                assert_eq!(
                    sprite.position - sprites[0].position,
                    Vec2::new(dx, -dy) * SMALL_ATOM_SIZE,
                    "level {} cell ({}, {})",
                    n,
                    x,
                    y
                );
                assert_eq!(sprite.texture, TextureId::SmallAtom(variant));
            }

            if level.solution.height() > 1 {
                let last = sprites.last().unwrap();
                assert!(last.position.y < sprites[0].position.y, "level {}", n);
            }
        }
    }
}
