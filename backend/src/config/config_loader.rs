use std::env;

use anyhow::{Context, Result};

use super::config_model::{BackendServer, Database, DotEnvyConfig, StaffAuth};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();
    load_from(|key| env::var(key).ok())
}

pub fn load_from<F>(lookup: F) -> Result<DotEnvyConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &str| lookup(key).with_context(|| format!("{key} is not set"));

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
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

    let staff_auth = StaffAuth {
        jwt_secret: required("JWT_STAFF_SECRET")?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        staff_auth,
    })
}

pub fn get_staff_secret() -> Result<String> {
    dotenvy::dotenv().ok();
    env::var("JWT_STAFF_SECRET").context("JWT_STAFF_SECRET is not set")
}
