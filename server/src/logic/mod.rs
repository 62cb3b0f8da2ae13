use std::{cmp::min, collections::HashMap, sync::Arc, time::Instant};

use dashmap::DashMap;
use rocket::futures::{SinkExt, future::join_all, stream::SplitSink};
use rocket_ws::{Message, stream::DuplexStream};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use warboard_common::{
    models::{BoardParams, Pos, TileId, Vec3},
    protocol::{HoverTransition, ServerMessage},
};

use crate::data::{Board, BoardError};

pub mod layout;

pub type Boards = Arc<DashMap<String, Arc<Mutex<Session>>>>;

/// Tiles sit this far above the logical origin; plinths and border rails
/// hang off the same height.
pub const TILE_ELEVATION: f32 = 0.2;

pub const MAX_BOARD_EDGE: usize = 256;

pub struct Session {
    board: Board,
    streams: HashMap<Uuid, SplitSink<DuplexStream, Message>>,
    last_activity: Instant,
}

fn validate_params(params: &mut BoardParams) -> Result<(), BoardError> {
    params.width = min(params.width, MAX_BOARD_EDGE);
    params.height = min(params.height, MAX_BOARD_EDGE);

    if params.width == 0
        || params.height == 0
        || !params.tile_size.is_finite()
        || params.tile_size <= 0.0
    {
        return Err(BoardError::InvalidDimension {
            width: params.width,
            height: params.height,
            tile_size: params.tile_size,
        });
    }

    Ok(())
}

fn generate_tiles(params: &BoardParams) -> Vec<TileId> {
    let length = params.width * params.height;
    (0..length).map(|_| TileId::new()).collect()
}

fn index_tiles(tiles: &[TileId], params: &BoardParams) -> HashMap<TileId, Pos> {
    tiles
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let pos = Pos {
                x: i % params.width,
                y: i / params.width,
            };
            (*id, pos)
        })
        .collect()
}

async fn send(stream: &mut SplitSink<DuplexStream, Message>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(text) => {
            let _ = stream.send(Message::Text(text)).await;
        }
        Err(e) => warn!("Failed to encode update: {}", e),
    }
}

async fn broadcast(
    streams: &mut HashMap<Uuid, SplitSink<DuplexStream, Message>>,
    message: &ServerMessage,
) {
    join_all(streams.values_mut().map(|stream| send(stream, message))).await;
}

impl Board {
    pub fn new(mut params: BoardParams) -> Result<Self, BoardError> {
        validate_params(&mut params)?;

        let bounds = Vec3::new(
            (params.width / 2) as f32 * params.tile_size,
            0.0,
            (params.height / 2) as f32 * params.tile_size,
        ) + params.center;

        let tiles = generate_tiles(&params);
        let index = index_tiles(&tiles, &params);

        Ok(Self {
            params,
            bounds,
            tiles,
            index,
            hovered: None,
        })
    }

    pub fn contains(&self, pos: &Pos) -> bool {
        pos.x < self.params.width && pos.y < self.params.height
    }

    /// World-space corners of a tile quad, in the order
    /// (x, y), (x, y+1), (x+1, y), (x+1, y+1).
    pub fn tile_corners(&self, pos: &Pos) -> [Vec3; 4] {
        let ts = self.params.tile_size;
        let (x, y) = (pos.x as f32, pos.y as f32);

        [
            Vec3::new(x * ts, TILE_ELEVATION, y * ts) - self.bounds,
            Vec3::new(x * ts, TILE_ELEVATION, (y + 1.0) * ts) - self.bounds,
            Vec3::new((x + 1.0) * ts, TILE_ELEVATION, y * ts) - self.bounds,
            Vec3::new((x + 1.0) * ts, TILE_ELEVATION, (y + 1.0) * ts) - self.bounds,
        ]
    }

    pub fn lookup(&self, id: TileId) -> Option<Pos> {
        self.index.get(&id).copied()
    }

    pub fn hovered(&self) -> Option<Pos> {
        self.hovered
    }

    /// Moves the hover state machine one step. Out-of-bounds picks are
    /// rejected before anything changes.
    pub fn set_hover(&mut self, pick: Option<Pos>) -> Result<Vec<HoverTransition>, BoardError> {
        if let Some(pos) = pick
            && !self.contains(&pos)
        {
            return Err(BoardError::OutOfBounds { pos });
        }

        let transitions = match (self.hovered, pick) {
            (None, Some(entered)) => vec![HoverTransition::Entered { pos: entered }],
            (Some(left), Some(entered)) if left != entered => vec![
                HoverTransition::Left { pos: left },
                HoverTransition::Entered { pos: entered },
            ],
            (Some(left), None) => vec![HoverTransition::Left { pos: left }],
            _ => Vec::new(),
        };

        self.hovered = pick;
        Ok(transitions)
    }

    fn init_message(&self) -> ServerMessage {
        ServerMessage::Init {
            layout: layout::build_layout(self),
            hovered: self.hovered,
        }
    }
}

impl Session {
    #[instrument(level = "trace")]
    pub fn new(params: BoardParams) -> Result<Self, BoardError> {
        let board = Board::new(params)?;
        info!(
            "Creating new board: {}x{} tiles of size {}",
            board.params.width, board.params.height, board.params.tile_size
        );
        Ok(Self {
            board,
            streams: HashMap::new(),
            last_activity: Instant::now(),
        })
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn restart(&mut self, params: BoardParams) {
        self.last_activity = Instant::now();

        match Board::new(params) {
            Ok(board) => {
                info!(
                    "Restarting board: {}x{} tiles of size {}",
                    board.params.width, board.params.height, board.params.tile_size
                );
                self.board = board;
                broadcast(&mut self.streams, &self.board.init_message()).await;
                info!(
                    "Board restarted and broadcasted to {} connections",
                    self.streams.len()
                );
            }
            Err(e) => warn!("Ignoring restart with invalid parameters: {}", e),
        }
    }

    #[instrument(level = "trace", skip(self, stream))]
    pub async fn add_stream(&mut self, mut stream: SplitSink<DuplexStream, Message>) -> Uuid {
        let id = Uuid::new_v4();
        send(&mut stream, &self.board.init_message()).await;
        self.streams.insert(id, stream);
        self.last_activity = Instant::now();
        info!("View stream {} added ({} connected)", id, self.streams.len());
        id
    }

    #[instrument(level = "trace", skip(self))]
    pub async fn remove_stream(&mut self, id: &Uuid) {
        if self.streams.remove(id).is_some() {
            info!(
                "View stream {} removed ({} still connected)",
                id,
                self.streams.len()
            );
        } else {
            warn!("Tried to remove unknown stream: {}", id);
        }
        self.last_activity = Instant::now()
    }

    pub fn has_active_connections(&self) -> bool {
        !self.streams.is_empty()
    }

    pub fn should_cleanup(&self, inactive_timeout_secs: u64, active_timeout_secs: u64) -> bool {
        let elapsed = self.last_activity.elapsed().as_secs();

        if self.has_active_connections() {
            elapsed > active_timeout_secs
        } else {
            elapsed > inactive_timeout_secs
        }
    }

    /// Applies one pick report from a view. Identities the board does not
    /// recognize leave the hover state alone.
    #[instrument(level = "trace", skip(self))]
    pub async fn pick(&mut self, tile: Option<TileId>) {
        self.last_activity = Instant::now();

        let target = match tile {
            Some(id) => match self.board.lookup(id) {
                Some(pos) => Some(pos),
                None => {
                    warn!("Pick reported unknown tile identity: {}", id);
                    return;
                }
            },
            None => None,
        };

        match self.board.set_hover(target) {
            Ok(transitions) => {
                if transitions.is_empty() {
                    return;
                }

                debug!(
                    "Hover moved to {:?} with {} transitions",
                    self.board.hovered(),
                    transitions.len()
                );
                broadcast(
                    &mut self.streams,
                    &ServerMessage::Hover {
                        transitions,
                        hovered: self.board.hovered(),
                    },
                )
                .await;
            }
            Err(e) => warn!("Rejected pick: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: usize, y: usize) -> Pos {
        Pos { x, y }
    }

    fn board() -> Board {
        Board::new(BoardParams::default()).unwrap()
    }

    #[test]
    fn every_tile_resolves_to_its_cell() {
        let board = board();

        for y in 0..8 {
            for x in 0..8 {
                let id = board.tiles[x + y * 8];
                assert_eq!(board.lookup(id), Some(pos(x, y)));
            }
        }
    }

    #[test]
    fn unknown_identities_resolve_to_nothing() {
        let board = board();
        assert_eq!(board.lookup(TileId::new()), None);
    }

    #[test]
    fn entering_a_tile_emits_entered() {
        let mut board = board();

        let transitions = board.set_hover(Some(pos(3, 3))).unwrap();

        assert_eq!(transitions, vec![HoverTransition::Entered { pos: pos(3, 3) }]);
        assert_eq!(board.hovered(), Some(pos(3, 3)));
    }

    #[test]
    fn holding_the_same_tile_is_idempotent() {
        let mut board = board();

        board.set_hover(Some(pos(3, 3))).unwrap();
        let transitions = board.set_hover(Some(pos(3, 3))).unwrap();

        assert!(transitions.is_empty());
        assert_eq!(board.hovered(), Some(pos(3, 3)));
    }

    #[test]
    fn moving_between_tiles_emits_left_then_entered() {
        let mut board = board();

        board.set_hover(Some(pos(3, 3))).unwrap();
        let transitions = board.set_hover(Some(pos(4, 3))).unwrap();

        assert_eq!(
            transitions,
            vec![
                HoverTransition::Left { pos: pos(3, 3) },
                HoverTransition::Entered { pos: pos(4, 3) },
            ]
        );
        assert_eq!(board.hovered(), Some(pos(4, 3)));
    }

    #[test]
    fn clearing_the_pick_emits_left() {
        let mut board = board();

        board.set_hover(Some(pos(3, 3))).unwrap();
        let transitions = board.set_hover(None).unwrap();

        assert_eq!(transitions, vec![HoverTransition::Left { pos: pos(3, 3) }]);
        assert_eq!(board.hovered(), None);
    }

    #[test]
    fn clearing_while_idle_emits_nothing() {
        let mut board = board();
        assert!(board.set_hover(None).unwrap().is_empty());
        assert_eq!(board.hovered(), None);
    }

    #[test]
    fn out_of_bounds_picks_are_rejected() {
        let mut board = board();
        board.set_hover(Some(pos(3, 3))).unwrap();

        let result = board.set_hover(Some(pos(8, 0)));

        assert_eq!(result, Err(BoardError::OutOfBounds { pos: pos(8, 0) }));
        assert_eq!(board.hovered(), Some(pos(3, 3)));
    }

    #[test]
    fn pointer_sweep_emits_the_expected_transitions() {
        let mut board = board();
        let picks = [Some(pos(3, 3)), Some(pos(3, 3)), Some(pos(4, 3)), None];

        let transitions: Vec<_> = picks
            .into_iter()
            .map(|pick| board.set_hover(pick).unwrap())
            .collect();

        assert_eq!(
            transitions,
            vec![
                vec![HoverTransition::Entered { pos: pos(3, 3) }],
                vec![],
                vec![
                    HoverTransition::Left { pos: pos(3, 3) },
                    HoverTransition::Entered { pos: pos(4, 3) },
                ],
                vec![HoverTransition::Left { pos: pos(4, 3) }],
            ]
        );
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let params = BoardParams {
            width: 0,
            ..BoardParams::default()
        };

        assert!(matches!(
            Board::new(params),
            Err(BoardError::InvalidDimension { .. })
        ));
    }

    #[test]
    fn broken_tile_sizes_are_rejected() {
        for tile_size in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let params = BoardParams {
                tile_size,
                ..BoardParams::default()
            };

            assert!(matches!(
                Board::new(params),
                Err(BoardError::InvalidDimension { .. })
            ));
        }
    }

    #[test]
    fn oversized_boards_are_clamped() {
        let board = Board::new(BoardParams {
            width: 10_000,
            height: 300,
            ..BoardParams::default()
        })
        .unwrap();

        assert_eq!(board.params.width, MAX_BOARD_EDGE);
        assert_eq!(board.params.height, MAX_BOARD_EDGE);
        assert_eq!(board.tiles.len(), MAX_BOARD_EDGE * MAX_BOARD_EDGE);
    }

    #[test]
    fn bounds_center_the_grid() {
        assert_eq!(board().bounds, Vec3::new(4.0, 0.0, 4.0));

        let shifted = Board::new(BoardParams {
            center: Vec3::new(1.0, 2.0, 3.0),
            ..BoardParams::default()
        })
        .unwrap();
        assert_eq!(shifted.bounds, Vec3::new(5.0, 2.0, 7.0));

        let odd = Board::new(BoardParams {
            width: 7,
            height: 7,
            ..BoardParams::default()
        })
        .unwrap();
        assert_eq!(odd.bounds, Vec3::new(3.0, 0.0, 3.0));
    }

    #[test]
    fn corners_span_one_tile_at_elevation() {
        let board = board();

        assert_eq!(
            board.tile_corners(&pos(0, 0)),
            [
                Vec3::new(-4.0, TILE_ELEVATION, -4.0),
                Vec3::new(-4.0, TILE_ELEVATION, -3.0),
                Vec3::new(-3.0, TILE_ELEVATION, -4.0),
                Vec3::new(-3.0, TILE_ELEVATION, -3.0),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_identities_do_not_disturb_hover() {
        let mut session = Session::new(BoardParams::default()).unwrap();
        session.board.set_hover(Some(pos(1, 1))).unwrap();

        session.pick(Some(TileId::new())).await;

        assert_eq!(session.board.hovered(), Some(pos(1, 1)));
    }

    #[tokio::test]
    async fn picks_drive_the_board_through_identities() {
        let mut session = Session::new(BoardParams::default()).unwrap();
        let id = session.board.tiles[3 + 3 * 8];

        session.pick(Some(id)).await;
        assert_eq!(session.board.hovered(), Some(pos(3, 3)));

        session.pick(None).await;
        assert_eq!(session.board.hovered(), None);
    }

    #[tokio::test]
    async fn restart_mints_fresh_identities() {
        let mut session = Session::new(BoardParams::default()).unwrap();
        let old = session.board.tiles[0];

        session.restart(BoardParams::default()).await;

        assert_eq!(session.board.lookup(old), None);
        assert_eq!(session.board.hovered(), None);
    }

    #[tokio::test]
    async fn restart_keeps_the_board_on_invalid_parameters() {
        let mut session = Session::new(BoardParams::default()).unwrap();
        let old = session.board.tiles[0];

        session
            .restart(BoardParams {
                width: 0,
                ..BoardParams::default()
            })
            .await;

        assert_eq!(session.board.lookup(old), Some(pos(0, 0)));
    }

    #[test]
    fn fresh_sessions_are_not_cleaned_up() {
        let session = Session::new(BoardParams::default()).unwrap();
        assert!(!session.should_cleanup(3600, 86400));
    }
}
