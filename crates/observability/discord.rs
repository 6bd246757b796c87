use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::alerts::{AlertRecord, AlertSink};

const DISCORD_CONTENT_LIMIT: usize = 2000;
const TRUNCATION_MARKER: &str = "\n… (truncated)";

pub(crate) struct DiscordAlertSink {
    webhook_url: Url,
    client: Client,
}

impl DiscordAlertSink {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .context("failed to build discord http client")?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

pub(crate) fn render(record: &AlertRecord) -> String {
    let mut out = vec![format!(
        "**{}** `{}` `{}` `{}`",
        record.service,
        record.stage,
        record.component,
        record.level.as_str()
    )];

    let location = record
        .location
        .as_deref()
        .map(|loc| format!(" `{loc}`"))
        .unwrap_or_default();
    out.push(format!(
        "`{}` `{}`{}",
        record.at.to_rfc3339_opts(SecondsFormat::Secs, true),
        record.target,
        location
    ));

    if let Some(message) = record.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        out.push(format!("> {message}"));
    }

    out.extend(record.fields.iter().map(|(k, v)| format!("- `{k}` = `{v}`")));

    for span in record.spans.iter().filter(|s| !s.fields.is_empty()) {
        out.push(format!("in `{}`:", span.name));
        out.extend(span.fields.iter().map(|(k, v)| format!("  - `{k}` = `{v}`")));
    }

    clip(out.join("\n"))
}

fn clip(content: String) -> String {
    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }
    let keep = DISCORD_CONTENT_LIMIT - TRUNCATION_MARKER.chars().count();
    let mut clipped: String = content.chars().take(keep).collect();
    clipped.push_str(TRUNCATION_MARKER);
    clipped
}

#[async_trait]
impl AlertSink for DiscordAlertSink {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn deliver(&self, record: &AlertRecord) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": render(record) }))
            .send()
            .await
            // reqwest errors embed the request URL, which carries the webhook token
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("discord webhook timed out")
                } else if err.is_connect() {
                    anyhow!("discord webhook unreachable")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if !response.status().is_success() {
            return Err(anyhow!("discord webhook answered {}", response.status()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::alerts::AlertSpan;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use tracing::Level;

    fn record(message: &str) -> AlertRecord {
        let mut fields = BTreeMap::new();
        fields.insert("membership_id".to_string(), "m-1".to_string());
        let mut span_fields = BTreeMap::new();
        span_fields.insert("method".to_string(), "POST".to_string());

        AlertRecord {
            level: Level::ERROR,
            at: Utc::now(),
            service: "membership-backend".to_string(),
            stage: "prod".to_string(),
            component: "backend".to_string(),
            target: "backend::usecases".to_string(),
            location: Some("cancellations.rs:42".to_string()),
            message: Some(message.to_string()),
            fields,
            spans: vec![AlertSpan {
                name: "request".to_string(),
                fields: span_fields,
            }],
        }
    }

    #[test]
    fn render_includes_message_fields_and_spans() {
        let content = render(&record("cancellation: failed to persist"));
        assert!(content.starts_with("**membership-backend** `prod` `backend` `ERROR`"));
        assert!(content.contains("> cancellation: failed to persist"));
        assert!(content.contains("- `membership_id` = `m-1`"));
        assert!(content.contains("in `request`:"));
        assert!(content.contains("`cancellations.rs:42`"));
    }

    #[test]
    fn long_content_is_clipped_to_discord_limit() {
        let content = render(&record(&"x".repeat(5000)));
        assert_eq!(content.chars().count(), DISCORD_CONTENT_LIMIT);
        assert!(content.ends_with(TRUNCATION_MARKER));
    }
}
