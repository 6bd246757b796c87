use std::env;

use tracing::Level;
use url::Url;

/// Who is logging: attached to every forwarded alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TelemetryIdentity {
    pub(crate) service: String,
    pub(crate) stage: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiscordSinkSettings {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilitySettings {
    pub(crate) identity: TelemetryIdentity,
    pub(crate) discord: Option<DiscordSinkSettings>,
    /// Collected before the subscriber exists, logged right after it is installed.
    pub(crate) startup_warnings: Vec<String>,
}

impl ObservabilitySettings {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(component: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let component = component.trim().to_string();

        let identity = TelemetryIdentity {
            service: non_empty("SERVICE_NAME").unwrap_or_else(|| format!("membership-{component}")),
            stage: non_empty("STAGE").unwrap_or_else(|| "local".to_string()),
            component,
        };

        let mut startup_warnings = Vec::new();
        let discord = discord_sink(&non_empty, &mut startup_warnings);

        Self {
            identity,
            discord,
            startup_warnings,
        }
    }
}

fn discord_sink<F>(non_empty: &F, warnings: &mut Vec<String>) -> Option<DiscordSinkSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let enabled = match non_empty("DISCORD_NOTIFY_ENABLED") {
        None => true,
        Some(raw) => parse_flag(&raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_ENABLED has unrecognised value `{raw}`; treating as enabled"
            ));
            true
        }),
    };
    if !enabled {
        return None;
    }

    let raw_url = non_empty("DISCORD_WEBHOOK_URL")?;
    let webhook_url = match Url::parse(&raw_url) {
        Ok(url) => url,
        Err(err) => {
            // the URL itself embeds the webhook token, so only the parse error is reported
            warnings.push(format!(
                "DISCORD_WEBHOOK_URL could not be parsed ({err}); alerts to Discord are off"
            ));
            return None;
        }
    };

    let min_level = match non_empty("DISCORD_NOTIFY_LEVEL") {
        None => Level::ERROR,
        Some(raw) => parse_level(&raw).unwrap_or_else(|| {
            warnings.push(format!("DISCORD_NOTIFY_LEVEL `{raw}` is not a level; using error"));
            Level::ERROR
        }),
    };

    Some(DiscordSinkSettings {
        webhook_url,
        min_level,
    })
}

pub(crate) fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
