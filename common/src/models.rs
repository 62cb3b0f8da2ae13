use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Triangle indices and UVs shared by every tile quad, referring to the
/// corner order (x, y), (x, y+1), (x+1, y), (x+1, y+1).
pub const TILE_TRIANGLES: [u16; 6] = [0, 1, 2, 1, 3, 2];
pub const TILE_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Checkerboard parity of a cell. Mapping a shade to an actual material or
/// tint is the view's business.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Shade {
    #[serde(rename = "light")]
    Light,
    #[serde(rename = "dark")]
    Dark,
}

impl Shade {
    pub fn of(pos: Pos) -> Self {
        if (pos.x + pos.y) % 2 == 0 {
            Shade::Light
        } else {
            Shade::Dark
        }
    }
}

/// Opaque identity the board hands out for each tile at creation. Views tag
/// their scene objects with it and report it back in picks.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct TileId(Uuid);

impl TileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct BoardParams {
    pub width: usize,
    pub height: usize,
    pub tile_size: f32,
    pub center: Vec3,
}

impl Default for BoardParams {
    fn default() -> Self {
        Self {
            width: 8,
            height: 8,
            tile_size: 1.0,
            center: Vec3::ZERO,
        }
    }
}

/// Axis-aligned box descriptor: where something sits and how big it is.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Block {
    pub center: Vec3,
    pub size: Vec3,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum BorderSide {
    #[serde(rename = "top")]
    Top,
    #[serde(rename = "bottom")]
    Bottom,
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "right")]
    Right,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct Border {
    pub side: BorderSide,
    pub block: Block,
}

/// One tile as a view needs it: identity, coordinate, parity, and the
/// geometry for the quad plus the solid block underneath.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub pos: Pos,
    pub shade: Shade,
    pub corners: [Vec3; 4],
    pub plinth: Block,
}

/// Everything a view needs to rebuild its scene, tiles in row-major order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BoardLayout {
    pub params: BoardParams,
    pub tiles: Vec<Tile>,
    pub ground: Block,
    pub borders: Vec<Border>,
}

#[derive(Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_default_to_a_unit_chessboard() {
        let params: BoardParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.width, 8);
        assert_eq!(params.height, 8);
        assert_eq!(params.tile_size, 1.0);
        assert_eq!(params.center, Vec3::ZERO);
    }

    #[test]
    fn shade_alternates_like_a_chessboard() {
        assert_eq!(Shade::of(Pos { x: 0, y: 0 }), Shade::Light);
        assert_eq!(Shade::of(Pos { x: 1, y: 0 }), Shade::Dark);
        assert_eq!(Shade::of(Pos { x: 0, y: 1 }), Shade::Dark);
        assert_eq!(Shade::of(Pos { x: 1, y: 1 }), Shade::Light);
    }

    #[test]
    fn quad_triangles_index_into_the_corners() {
        assert!(
            TILE_TRIANGLES
                .iter()
                .all(|&i| (i as usize) < TILE_UVS.len())
        );
    }
}
