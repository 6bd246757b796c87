use anyhow::Result;
use backend::axum_http::http_serve;
use backend::config::config_loader;
use crates::{
    domain::clock::SystemClock,
    infra::{
        db::postgres::postgres_connection,
        events::broadcast::{BroadcastEventBus, spawn_event_logger},
    },
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let event_bus = BroadcastEventBus::default();
    let _event_logger = spawn_event_logger(&event_bus);

    http_serve::start(
        Arc::new(dotenvy_env),
        Arc::new(postgres_pool),
        Arc::new(SystemClock),
        Arc::new(event_bus),
    )
    .await?;

    Ok(())
}
