use std::collections::HashMap;

use thiserror::Error;

use warboard_common::models::{BoardParams, Pos, TileId, Vec3};

#[derive(Debug, Error, PartialEq)]
pub enum BoardError {
    #[error("invalid board dimensions: {width}x{height} with tile size {tile_size}")]
    InvalidDimension {
        width: usize,
        height: usize,
        tile_size: f32,
    },
    #[error("position {pos:?} is outside the board")]
    OutOfBounds { pos: Pos },
}

#[derive(Debug)]
pub struct Board {
    pub params: BoardParams,
    pub bounds: Vec3,
    pub tiles: Vec<TileId>,
    pub index: HashMap<TileId, Pos>,
    pub hovered: Option<Pos>,
}
