use std::env;

use anyhow::{Context, Result, bail};

use super::config_model::{Database, DotEnvyConfig, Sweep, WorkerServer};

const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));

    let worker_server = WorkerServer {
        port: required("SERVER_PORT_WORKER")?
            .parse()
            .context("SERVER_PORT_WORKER is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .context("DATABASE_MAX_CONNECTIONS is invalid")?,
            None => DEFAULT_MAX_CONNECTIONS,
        },
    };

    let interval_seconds = match lookup("SWEEP_INTERVAL_SECONDS") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .context("SWEEP_INTERVAL_SECONDS is invalid")?,
        None => DEFAULT_SWEEP_INTERVAL_SECONDS,
    };
    if interval_seconds == 0 {
        bail!("SWEEP_INTERVAL_SECONDS must be greater than zero");
    }

    let sweep = Sweep {
        interval_seconds,
        internal_token: lookup("INTERNAL_SWEEP_TOKEN").and_then(|v| {
            let trimmed = v.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        }),
    };

    Ok(DotEnvyConfig {
        worker_server,
        database,
        sweep,
    })
}
