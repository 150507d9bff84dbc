//! Texture ids and render lists
//!
//! The simulation never touches textures. It names them by id and the host's
//! atlas turns an id into whatever handle its renderer uses.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{ATOM_Z, BACKGROUND_Z, FREE_Z, WALL_Z};
use crate::level::Level;
use crate::sim::ObstacleKind;

/// A texture in one of the game atlases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureId {
    /// Floor tile
    Free,
    Wall(u8),
    Atom(u8),
    /// Half-size atom for the molecule preview
    SmallAtom(u8),
    Background(u8),
}

impl TextureId {
    /// Atlas the texture lives in
    pub fn atlas(&self) -> &'static str {
        match self {
            TextureId::Free | TextureId::Wall(_) => "Walls",
            TextureId::Atom(_) => "Atoms",
            TextureId::SmallAtom(_) => "SmallAtoms",
            TextureId::Background(_) => "Backgrounds",
        }
    }

    /// Texture name inside its atlas
    pub fn name(&self) -> String {
        match self {
            TextureId::Free => "free".to_string(),
            TextureId::Wall(v) | TextureId::Atom(v) | TextureId::SmallAtom(v) => format!("f{}", v),
            TextureId::Background(i) => format!("background{}", i),
        }
    }
}

/// Host-side texture lookup
pub trait Atlas {
    type Handle;

    fn get(&self, texture: TextureId) -> Option<Self::Handle>;

    fn wall(&self, variant: u8) -> Option<Self::Handle> {
        self.get(TextureId::Wall(variant))
    }

    fn atom(&self, variant: u8) -> Option<Self::Handle> {
        self.get(TextureId::Atom(variant))
    }

    fn background(&self, index: u8) -> Option<Self::Handle> {
        self.get(TextureId::Background(index))
    }
}

/// Which node a sprite belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpriteOwner {
    Background,
    Floor,
    Wall,
    /// Atom name ("ATOM-N")
    Atom(String),
    Preview,
}

/// One textured quad, anchored at its lower-left corner unless noted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub owner: SpriteOwner,
    pub texture: TextureId,
    pub position: Vec2,
    pub z: f32,
}

/// Everything needed to draw a level board, sorted back to front
pub fn render_list(level: &Level) -> Vec<Sprite> {
    let grid = &level.grid;
    let mut sprites = Vec::with_capacity(1 + grid.floor().len() + grid.obstacles().len());

    sprites.push(Sprite {
        owner: SpriteOwner::Background,
        texture: TextureId::Background(level.background),
        position: Vec2::ZERO,
        z: BACKGROUND_Z,
    });

    sprites.extend(grid.floor().iter().map(|&position| Sprite {
        owner: SpriteOwner::Floor,
        texture: TextureId::Free,
        position,
        z: FREE_Z,
    }));

    sprites.extend(grid.obstacles().iter().map(|o| match o.kind {
        ObstacleKind::Wall => Sprite {
            owner: SpriteOwner::Wall,
            texture: TextureId::Wall(o.variant),
            position: o.position,
            z: WALL_Z,
        },
        ObstacleKind::Atom(id) => Sprite {
            owner: SpriteOwner::Atom(id.to_string()),
            texture: TextureId::Atom(o.variant),
            position: o.position,
            z: ATOM_Z,
        },
    }));

    sprites.sort_by(|a, b| a.z.total_cmp(&b.z));
    sprites
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_texture_names() {
        assert_eq!(TextureId::Wall(3).name(), "f3");
        assert_eq!(TextureId::Atom(12).atlas(), "Atoms");
        assert_eq!(TextureId::Background(2).name(), "background2");
    }

    #[test]
    fn test_render_list_covers_every_node() {
        let level = Level::load(1).unwrap();
        let sprites = render_list(&level);
        let grid = &level.grid;
        assert_eq!(sprites.len(), 1 + grid.floor().len() + grid.obstacles().len());
        assert_eq!(sprites[0].owner, SpriteOwner::Background);
        assert!(sprites.windows(2).all(|w| w[0].z <= w[1].z));

        let atoms: Vec<_> = sprites
            .iter()
            .filter(|s| matches!(s.owner, SpriteOwner::Atom(_)))
            .collect();
        assert_eq!(atoms.len(), grid.atom_count());
        assert_eq!(atoms[0].owner, SpriteOwner::Atom("ATOM-0".into()));
    }

    struct Names(HashMap<TextureId, String>);

    impl Atlas for Names {
        type Handle = String;

        fn get(&self, texture: TextureId) -> Option<String> {
            self.0.get(&texture).cloned()
        }
    }

    #[test]
    fn test_atlas_lookup_by_variant() {
        let atlas = Names(HashMap::from([(TextureId::Atom(5), "oxygen".to_string())]));
        assert_eq!(atlas.atom(5).as_deref(), Some("oxygen"));
        assert_eq!(atlas.wall(5), None);
    }
}
