use tokio::time::{Duration, sleep};
use warboard_client::{BoardEvent, BoardParams, Pos, WarboardView};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let view = WarboardView::new("http://localhost:8000")?;

    // Print every board event as it arrives
    let mut event_receiver = view.subscribe_to_events().await;
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_receiver.recv().await {
            match event {
                BoardEvent::BoardInitialized {
                    width,
                    height,
                    tile_size,
                } => {
                    println!(
                        "🗺️ Board initialized: {}x{} tiles of size {}",
                        width, height, tile_size
                    );
                }
                BoardEvent::HoverChanged {
                    transitions,
                    hovered,
                } => {
                    println!("✨ Hover {:?}: {:?}", hovered, transitions);
                }
                BoardEvent::ConnectionLost => {
                    println!("🔌 Connection lost!");
                    break;
                }
            }
        }
    });

    // Open the default 8x8 board
    view.open_board(BoardParams::default()).await?;
    println!(
        "Board opened! Board ID: {}",
        view.get_board_id().await.unwrap_or_default()
    );

    // Give time for the layout to arrive
    sleep(Duration::from_millis(100)).await;

    let state = view.get_state().await.ok_or("no layout received")?;

    // Sweep the pointer across row 3, one tile per tick
    println!("\n=== Sweeping the pointer across row 3 ===");
    for x in 0..state.layout.params.width {
        let target = state.tile(Pos { x, y: 3 }).map(|tile| tile.id);
        view.pick(target).await?;
        sleep(Duration::from_millis(60)).await;
    }

    // Holding still: identical reports are cut off client-side
    let resting = state.tile(Pos { x: 7, y: 3 }).map(|tile| tile.id);
    view.pick(resting).await?;
    view.pick(resting).await?;
    println!("Held the pointer still, nothing extra was sent");

    // Pointer leaves the board
    view.clear_pick().await?;
    sleep(Duration::from_millis(60)).await;

    if let Some(state) = view.get_state().await {
        println!("Hovered after the sweep: {:?}", state.hovered());
    }

    // Shrink the board and watch a fresh layout arrive
    println!("\n=== Restarting as a 5x5 board ===");
    view.restart(BoardParams {
        width: 5,
        height: 5,
        ..BoardParams::default()
    })
    .await?;
    sleep(Duration::from_millis(100)).await;

    view.disconnect().await?;
    println!("\nDisconnected from board");

    event_handler.abort();
    let _ = event_handler.await;

    Ok(())
}
