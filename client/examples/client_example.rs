use warboard_client::{
    BoardParams, ClientMessage, ServerMessage, WarboardClient, WarboardWebSocket,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let client = WarboardClient::new("http://localhost:8000")?;

    // Ask the server for a 9x9 board
    let params = BoardParams {
        width: 9,
        height: 9,
        ..BoardParams::default()
    };

    let board_id = client.create_board(params).await?;
    println!("Created board with ID: {}", board_id);

    // Join it over WebSocket
    let ws_url = client.websocket_url(&board_id)?;
    println!("Connecting to WebSocket: {}", ws_url);

    let mut ws = WarboardWebSocket::connect(&ws_url).await?;

    // Receive the initial layout
    let first_tile = match ws.receive_message().await? {
        Some(ServerMessage::Init { layout, hovered }) => {
            println!(
                "Received board layout: {}x{} tiles of size {}, hovered: {:?}",
                layout.params.width, layout.params.height, layout.params.tile_size, hovered
            );
            println!(
                "Ground: center {:?}, size {:?}",
                layout.ground.center, layout.ground.size
            );
            for border in &layout.borders {
                println!("Border {:?}: {:?}", border.side, border.block);
            }

            let tile = &layout.tiles[0];
            println!(
                "Tile at ({}, {}), shade {:?}, corners {:?}",
                tile.pos.x, tile.pos.y, tile.shade, tile.corners
            );
            tile.id
        }
        other => return Err(format!("Expected init message, got {:?}", other).into()),
    };

    // Report the pointer over the first tile
    ws.send_message(ClientMessage::Pick {
        tile: Some(first_tile),
    })
    .await?;
    println!("Sent pick for the tile at (0, 0)");

    // Receive the hover update
    if let Some(message) = ws.receive_message().await? {
        match message {
            ServerMessage::Hover {
                transitions,
                hovered,
            } => {
                println!("Hover is now {:?}", hovered);
                for transition in transitions {
                    println!("  {:?}", transition);
                }
            }
            _ => println!("Received unexpected message: {:?}", message),
        }
    }

    // Report the pointer leaving the board
    ws.send_message(ClientMessage::Pick { tile: None }).await?;
    println!("Sent empty pick");

    if let Some(message) = ws.receive_message().await? {
        match message {
            ServerMessage::Hover {
                transitions,
                hovered,
            } => {
                println!("Hover is now {:?}", hovered);
                for transition in transitions {
                    println!("  {:?}", transition);
                }
            }
            _ => println!("Received unexpected message: {:?}", message),
        }
    }

    ws.close().await?;
    println!("Connection closed");

    Ok(())
}
