use std::sync::Arc;

use dashmap::Entry;
use nanoid::nanoid;
use rocket::{State, futures::StreamExt, get, http::Status, post, serde::json::Json};
use rocket_ws::{Channel, Message, WebSocket};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use warboard_common::{
    models::{BoardParams, CreateResponse},
    protocol::ClientMessage,
};

use crate::{
    logic::{Boards, Session},
    rate_limit::{ClientIp, RateLimiter, check_rate_limit},
};

#[instrument(level = "trace", skip(boards, session))]
fn register_session(boards: &State<Boards>, session: Session) -> String {
    let session = Arc::new(Mutex::new(session));
    let mut id_length = 5;

    loop {
        // A handful of tries per length, then give the id another character
        for _ in 0..10 {
            let id = nanoid!(id_length);
            if let Entry::Vacant(entry) = boards.entry(id.clone()) {
                entry.insert(session.clone());
                info!("Registered board: {}", id);
                return id;
            }
            debug!("Board id collision: {}", id);
        }

        id_length += 1;
        warn!("Board ids keep colliding, growing length to {}", id_length);
    }
}

#[post("/create", data = "<params>")]
#[instrument(level = "trace", skip(boards, rate_limiter), fields(client_ip = %client_ip.0, width = params.width, height = params.height))]
pub fn create_board(
    params: Json<BoardParams>,
    boards: &State<Boards>,
    rate_limiter: &State<RateLimiter>,
    client_ip: ClientIp,
) -> Result<Json<CreateResponse>, Status> {
    info!(
        "Board creation request from {}: {}x{} tiles of size {}",
        client_ip.0, params.width, params.height, params.tile_size
    );

    check_rate_limit(rate_limiter, &client_ip)?;

    let session = match Session::new(params.0) {
        Ok(session) => session,
        Err(e) => {
            warn!("Rejected board creation from {}: {}", client_ip.0, e);
            return Err(Status::UnprocessableEntity);
        }
    };

    let id = register_session(boards, session);
    Ok(Json(CreateResponse { id }))
}

#[get("/ws?<id>")]
#[instrument(level = "trace", skip(ws, boards), fields(board_id = %id))]
pub fn websocket_handler(
    ws: WebSocket,
    boards: &State<Boards>,
    id: String,
) -> Result<Channel<'static>, Status> {
    let Some(session) = boards.get(&id).map(|entry| entry.value().clone()) else {
        warn!("WebSocket connection attempt for unknown board: {}", id);
        return Err(Status::NotFound);
    };

    Ok(ws.channel(move |stream| {
        let board_id = id.clone();
        Box::pin(async move {
            let (write, mut read) = stream.split();

            let stream_id = {
                let mut session = session.lock().await;
                session.add_stream(write).await
            };

            info!(
                "View connected to board {} (stream: {})",
                board_id, stream_id
            );

            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        let message = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => message,
                            Err(e) => {
                                warn!(
                                    "Undecodable message in board {}: {} ({})",
                                    board_id, text, e
                                );
                                continue;
                            }
                        };

                        debug!("Board {} received {:?}", board_id, message);
                        match message {
                            ClientMessage::Pick { tile } => {
                                session.lock().await.pick(tile).await;
                            }
                            ClientMessage::Restart { params } => {
                                info!(
                                    "View restarting board {}: {}x{} tiles of size {}",
                                    board_id, params.width, params.height, params.tile_size
                                );
                                session.lock().await.restart(params).await;
                            }
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!(
                            "WebSocket connection closed for board {} (stream: {})",
                            board_id, stream_id
                        );
                        break;
                    }
                    Err(e) => {
                        error!(
                            "WebSocket error in board {} (stream: {}): {}",
                            board_id, stream_id, e
                        );
                        break;
                    }
                    // Ping, pong and binary frames carry no picks
                    _ => debug!("Ignoring non-text frame in board {}", board_id),
                }
            }

            session.lock().await.remove_stream(&stream_id).await;

            info!(
                "View disconnected from board {} (stream: {})",
                board_id, stream_id
            );
            Ok(())
        })
    }))
}
