mod alerts;
mod config;
mod discord;
mod layer;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use alerts::{AlertDispatcher, AlertSink};
use config::ObservabilitySettings;
use discord::DiscordAlertSink;
use layer::AlertLayer;

/// Installs the global subscriber: RUST_LOG filtered fmt output with local
/// timestamps, plus Discord alerts when a webhook is configured.
///
/// Must run inside a tokio runtime; the alert dispatcher spawns a task.
pub fn init_observability(component: &str) -> Result<()> {
    let settings = ObservabilitySettings::from_env(component);
    let mut startup_warnings = settings.startup_warnings.clone();

    let alert_layer = match settings.discord.as_ref() {
        Some(discord) => match DiscordAlertSink::new(discord.webhook_url.clone()) {
            Ok(sink) => {
                let sinks: Vec<Arc<dyn AlertSink>> = vec![Arc::new(sink)];
                Some(
                    AlertLayer::new(
                        AlertDispatcher::spawn(sinks),
                        settings.identity.clone(),
                        discord.min_level,
                    )
                    .with_filter(LevelFilter::from_level(discord.min_level)),
                )
            }
            Err(err) => {
                startup_warnings.push(format!("discord alerts disabled: {err}"));
                None
            }
        },
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(alert_layer)
        .with(env_filter)
        .try_init()?;

    let identity = &settings.identity;
    for warning in &startup_warnings {
        warn!(
            service = %identity.service,
            stage = %identity.stage,
            component = %identity.component,
            %warning,
            "observability: configuration warning"
        );
    }

    info!(
        service = %identity.service,
        stage = %identity.stage,
        component = %identity.component,
        discord_alerts = settings.discord.is_some(),
        "observability: tracing initialised"
    );

    Ok(())
}
