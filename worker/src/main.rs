use anyhow::Result;
use crates::domain::{
    clock::{Clock, SystemClock},
    repositories::{domain_events::DomainEventPublisher, memberships::MembershipRepository},
};
use crates::infra::{
    db::{postgres::postgres_connection, repositories::memberships::MembershipPostgres},
    events::broadcast::{BroadcastEventBus, spawn_event_logger},
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};
use worker::{axum_http, background_worker, config, usecases::membership_sweep::MembershipSweepUseCase};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(
        &dotenvy_env.database.url,
        dotenvy_env.database.max_connections,
    )?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);

    let event_bus = BroadcastEventBus::default();
    let _event_logger = spawn_event_logger(&event_bus);
    let events: Arc<dyn DomainEventPublisher> = Arc::new(event_bus);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let membership_repository: Arc<dyn MembershipRepository + Send + Sync> =
        Arc::new(MembershipPostgres::new(Arc::clone(&db_pool_arc)));

    let sweep_usecase = Arc::new(MembershipSweepUseCase::new(
        membership_repository,
        clock,
        events,
    ));

    let sweep_loop = tokio::spawn(background_worker::sweep_worker::run(
        Arc::clone(&sweep_usecase),
        Duration::from_secs(dotenvy_env.sweep.interval_seconds),
    ));

    let server_config = Arc::clone(&dotenvy_env);
    let sweep_trigger = tokio::spawn(async move {
        axum_http::http_serve::start(server_config, sweep_usecase).await
    });

    tokio::select! {
        result = sweep_loop => result??,
        result = sweep_trigger => result??,
    };
    Ok(())
}
