use std::{env, time::Duration};

use tokio::time;
use tracing::{debug, info};

use crate::logic::Boards;

fn env_secs(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

pub async fn start_cleanup_task(boards: Boards) {
    let interval_secs = env_secs("CLEANUP_INTERVAL_SECONDS", 60);
    let inactive_timeout_secs = env_secs("INACTIVE_BOARD_TIMEOUT_SECONDS", 600);
    let active_timeout_secs = env_secs("ACTIVE_BOARD_TIMEOUT_SECONDS", 86400);

    info!(
        "Sweeping idle boards every {}s (inactive timeout: {}s, active timeout: {}s)",
        interval_secs, inactive_timeout_secs, active_timeout_secs
    );

    let mut ticker = time::interval(Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        cleanup_boards(&boards, inactive_timeout_secs, active_timeout_secs);
    }
}

fn cleanup_boards(boards: &Boards, inactive_timeout_secs: u64, active_timeout_secs: u64) {
    let mut removed = 0;

    boards.retain(|id, session| {
        // A session we cannot lock right now is in use, keep it
        let Ok(session) = session.try_lock() else {
            return true;
        };

        if session.should_cleanup(inactive_timeout_secs, active_timeout_secs) {
            debug!("Cleaning up board: {}", id);
            removed += 1;
            false
        } else {
            true
        }
    });

    if removed > 0 {
        info!("Cleaned up {} idle boards", removed);
    }
}
