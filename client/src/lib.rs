//! Warboard Client Library
//!
//! Client side of the warboard hover tracking server: create boards over
//! HTTP, join them over WebSocket, and keep a local mirror of the layout and
//! hover state while streaming pick reports in.
//!
//! ## Usage
//!
//! ### High-Level Interface (Recommended)
//!
//! `WarboardView` mirrors the board locally, deduplicates pick reports, and
//! emits events as hover updates arrive:
//!
//! ```rust,no_run
//! use warboard_client::{BoardParams, Pos, WarboardView};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let view = WarboardView::new("http://localhost:8000")?;
//!
//!     // Open a fresh board
//!     view.open_board(BoardParams::default()).await?;
//!
//!     // Report what the pointer is over
//!     if let Some(state) = view.get_state().await {
//!         let target = state.tile(Pos { x: 0, y: 0 }).map(|tile| tile.id);
//!         view.pick(target).await?;
//!     }
//!
//!     // Report that the pointer left the board
//!     view.clear_pick().await?;
//!
//!     view.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Low-Level Interface
//!
//! `WarboardClient` and `WarboardWebSocket` expose the raw HTTP and message
//! plumbing for callers that drive the protocol themselves:
//!
//! ```rust,no_run
//! use warboard_client::{BoardParams, ClientMessage, ServerMessage, WarboardClient, WarboardWebSocket};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let client = WarboardClient::new("http://localhost:8000")?;
//!     let board_id = client.create_board(BoardParams::default()).await?;
//!
//!     let ws_url = client.websocket_url(&board_id)?;
//!     let mut ws = WarboardWebSocket::connect(&ws_url).await?;
//!
//!     // Receive the initial layout
//!     if let Some(ServerMessage::Init { layout, .. }) = ws.receive_message().await? {
//!         // Report the pointer over the first tile
//!         let tile = layout.tiles[0].id;
//!         ws.send_message(ClientMessage::Pick { tile: Some(tile) }).await?;
//!     }
//!
//!     ws.close().await?;
//!     Ok(())
//! }
//! ```

mod board;
mod client;
mod websocket;

pub use board::{BoardEvent, BoardState, WarboardView};
pub use client::WarboardClient;
pub use websocket::WarboardWebSocket;

// Shared models and protocol types, so callers need only this crate
pub use warboard_common::{models::*, protocol::*};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
