use warboard_common::models::{Block, BoardLayout, Border, BorderSide, Pos, Shade, Tile, Vec3};

use super::TILE_ELEVATION;
use crate::data::Board;

/// Ground extends this far past the playable area on every side.
const GROUND_MARGIN: f32 = 10.0;
const BORDER_WIDTH: f32 = 1.0;
const BORDER_THICKNESS: f32 = 0.1;

pub fn build_layout(board: &Board) -> BoardLayout {
    BoardLayout {
        params: board.params,
        tiles: build_tiles(board),
        ground: ground(board),
        borders: borders(board),
    }
}

fn build_tiles(board: &Board) -> Vec<Tile> {
    board
        .tiles
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let pos = Pos {
                x: i % board.params.width,
                y: i / board.params.width,
            };
            Tile {
                id: *id,
                pos,
                shade: Shade::of(pos),
                corners: board.tile_corners(&pos),
                plinth: plinth(board, &pos),
            }
        })
        .collect()
}

/// Solid block filling the space between the ground and the tile quad.
fn plinth(board: &Board, pos: &Pos) -> Block {
    let ts = board.params.tile_size;

    Block {
        center: Vec3::new(
            pos.x as f32 * ts + ts / 2.0,
            TILE_ELEVATION - TILE_ELEVATION / 2.0,
            pos.y as f32 * ts + ts / 2.0,
        ) - board.bounds,
        size: Vec3::new(ts, TILE_ELEVATION, ts),
    }
}

fn ground(board: &Board) -> Block {
    let ts = board.params.tile_size;
    let board_width = board.params.width as f32 * ts;
    let board_height = board.params.height as f32 * ts;

    Block {
        center: Vec3::new((board_width - ts) / 2.0, -0.01, (board_height - ts) / 2.0)
            - board.bounds,
        size: Vec3::new(
            board_width + GROUND_MARGIN * 2.0,
            0.0,
            board_height + GROUND_MARGIN * 2.0,
        ),
    }
}

// Four rails: top, bottom, left, right. The bottom rail runs a tile wider
// than the top one and anchors on the column centers instead.
fn borders(board: &Board) -> Vec<Border> {
    let ts = board.params.tile_size;
    let board_width = board.params.width as f32 * ts;
    let board_height = board.params.height as f32 * ts;
    let rail_y = TILE_ELEVATION + 0.05;

    vec![
        Border {
            side: BorderSide::Top,
            block: Block {
                center: Vec3::new((board_width - ts) / 2.0, rail_y, -BORDER_WIDTH / 2.0)
                    - board.bounds,
                size: Vec3::new(board_width + 1.0, BORDER_THICKNESS, BORDER_WIDTH),
            },
        },
        Border {
            side: BorderSide::Bottom,
            block: Block {
                center: Vec3::new(
                    board_width / 2.0,
                    rail_y,
                    board_height + BORDER_WIDTH / 2.0,
                ) - board.bounds,
                size: Vec3::new(board_width + 2.0, BORDER_THICKNESS, BORDER_WIDTH),
            },
        },
        Border {
            side: BorderSide::Left,
            block: Block {
                center: Vec3::new(-BORDER_WIDTH / 2.0, rail_y, (board_height - ts) / 2.0)
                    - board.bounds,
                size: Vec3::new(BORDER_WIDTH, BORDER_THICKNESS, board_height + 1.0),
            },
        },
        Border {
            side: BorderSide::Right,
            block: Block {
                center: Vec3::new(
                    board_width + BORDER_WIDTH / 2.0,
                    rail_y,
                    (board_height - ts) / 2.0,
                ) - board.bounds,
                size: Vec3::new(BORDER_WIDTH, BORDER_THICKNESS, board_height + 1.0),
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use warboard_common::models::BoardParams;

    #[test]
    fn tiles_come_out_row_major_with_plinths_underneath() {
        let board = Board::new(BoardParams::default()).unwrap();
        let layout = build_layout(&board);

        assert_eq!(layout.tiles.len(), 64);

        let tile = &layout.tiles[2 + 3 * 8];
        assert_eq!(tile.id, board.tiles[2 + 3 * 8]);
        assert_eq!(tile.pos, Pos { x: 2, y: 3 });
        assert_eq!(tile.shade, Shade::Dark);
        assert_eq!(tile.corners, board.tile_corners(&tile.pos));
        assert_eq!(tile.plinth.center, Vec3::new(-1.5, 0.1, -0.5));
        assert_eq!(tile.plinth.size, Vec3::new(1.0, 0.2, 1.0));
    }

    #[test]
    fn ground_extends_past_the_board() {
        let board = Board::new(BoardParams::default()).unwrap();
        let layout = build_layout(&board);

        assert_eq!(layout.ground.size, Vec3::new(28.0, 0.0, 28.0));
        assert_eq!(layout.ground.center, Vec3::new(-0.5, -0.01, -0.5));
    }

    #[test]
    fn rails_frame_the_board() {
        let board = Board::new(BoardParams::default()).unwrap();
        let layout = build_layout(&board);

        let sides: Vec<_> = layout.borders.iter().map(|border| border.side).collect();
        assert_eq!(
            sides,
            vec![
                BorderSide::Top,
                BorderSide::Bottom,
                BorderSide::Left,
                BorderSide::Right,
            ]
        );

        let top = &layout.borders[0].block;
        assert_eq!(top.center, Vec3::new(-0.5, 0.25, -4.5));
        assert_eq!(top.size, Vec3::new(9.0, 0.1, 1.0));

        let bottom = &layout.borders[1].block;
        assert_eq!(bottom.center, Vec3::new(0.0, 0.25, 4.5));
        assert_eq!(bottom.size, Vec3::new(10.0, 0.1, 1.0));

        let left = &layout.borders[2].block;
        assert_eq!(left.center, Vec3::new(-4.5, 0.25, -0.5));
        assert_eq!(left.size, Vec3::new(1.0, 0.1, 9.0));
    }
}
