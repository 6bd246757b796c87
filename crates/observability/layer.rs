use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    span::{Attributes, Id, Record},
};
use tracing_subscriber::{Layer, layer::Context, registry::LookupSpan};

use super::{
    alerts::{AlertDispatcher, AlertRecord, AlertSpan},
    config::TelemetryIdentity,
};

/// Field names whose values never leave the process. Cancellation reasons and
/// review notes are free text typed about members.
const REDACTED_KEYS: &[&str] = &[
    "webhook",
    "secret",
    "password",
    "token",
    "authorization",
    "reason",
    "notes",
];

pub(crate) fn redact(key: &str, value: String) -> String {
    let lowered = key.to_ascii_lowercase();
    if REDACTED_KEYS.iter().any(|needle| lowered.contains(needle)) {
        "[REDACTED]".to_string()
    } else {
        value
    }
}

#[derive(Default)]
struct Collected(BTreeMap<String, String>);

impl Collected {
    fn put(&mut self, field: &Field, value: String) {
        self.0
            .insert(field.name().to_string(), redact(field.name(), value));
    }
}

impl Visit for Collected {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }
}

/// Span fields stashed in the registry so alerts can show request context.
struct SpanFields(BTreeMap<String, String>);

pub(crate) struct AlertLayer {
    dispatcher: AlertDispatcher,
    identity: TelemetryIdentity,
    threshold: Level,
}

impl AlertLayer {
    pub(crate) fn new(dispatcher: AlertDispatcher, identity: TelemetryIdentity, threshold: Level) -> Self {
        Self {
            dispatcher,
            identity,
            threshold,
        }
    }
}

impl<S> Layer<S> for AlertLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut collected = Collected::default();
        attrs.record(&mut collected);
        if collected.0.is_empty() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(collected.0));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut collected = Collected::default();
        values.record(&mut collected);
        if collected.0.is_empty() {
            return;
        }

        let mut extensions = span.extensions_mut();
        if let Some(existing) = extensions.get_mut::<SpanFields>() {
            existing.0.extend(collected.0);
        } else {
            extensions.insert(SpanFields(collected.0));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // tracing orders levels by verbosity: ERROR is the smallest
        if *metadata.level() > self.threshold {
            return;
        }

        let mut collected = Collected::default();
        event.record(&mut collected);
        let message = collected
            .0
            .remove("message")
            .map(|raw| raw.trim().trim_matches('"').to_string());

        let spans = ctx
            .event_span(event)
            .map(|leaf| {
                leaf.scope()
                    .from_root()
                    .map(|span| AlertSpan {
                        name: span.metadata().name().to_string(),
                        fields: span
                            .extensions()
                            .get::<SpanFields>()
                            .map(|f| f.0.clone())
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let location = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Some(format!("{file}:{line}")),
            _ => None,
        };

        self.dispatcher.dispatch(AlertRecord {
            level: *metadata.level(),
            at: Utc::now(),
            service: self.identity.service.clone(),
            stage: self.identity.stage.clone(),
            component: self.identity.component.clone(),
            target: metadata.target().to_string(),
            location,
            message,
            fields: collected.0,
            spans,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_text_and_secrets_are_redacted() {
        assert_eq!(redact("cancellation_reason", "moving".into()), "[REDACTED]");
        assert_eq!(redact("review_notes", "ok".into()), "[REDACTED]");
        assert_eq!(redact("INTERNAL_SWEEP_TOKEN", "abc".into()), "[REDACTED]");
        assert_eq!(redact("membership_id", "m-1".into()), "m-1");
    }
}
