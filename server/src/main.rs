use std::sync::Arc;

use dashmap::DashMap;
use rocket::{
    Build, Rocket,
    fairing::{Fairing, Info, Kind},
    routes,
};
use tracing::{info, warn};
use warboard_server::{
    cleanup::start_cleanup_task,
    cors::create_cors,
    logic::Boards,
    rate_limit::create_rate_limiter,
    routes::{create_board, websocket_handler},
};

struct CleanupFairing;

#[rocket::async_trait]
impl Fairing for CleanupFairing {
    fn info(&self) -> Info {
        Info {
            name: "Board Cleanup",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        match rocket.state::<Boards>() {
            Some(boards) => {
                tokio::spawn(start_cleanup_task(boards.clone()));
            }
            None => warn!("Board registry missing, cleanup task not started"),
        }
        Ok(rocket)
    }
}

#[rocket::launch]
fn rocket() -> Rocket<Build> {
    tracing_subscriber::fmt::init();
    info!("🚀 Starting warboard server");

    let boards: Boards = Arc::new(DashMap::new());

    info!("📡 Endpoints: POST /create, GET /ws?id=");

    rocket::build()
        .attach(create_cors())
        .attach(CleanupFairing)
        .manage(boards)
        .manage(create_rate_limiter())
        .mount("/", routes![create_board, websocket_handler])
}
