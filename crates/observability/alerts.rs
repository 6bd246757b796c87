use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::Level;

const ALERT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub(crate) struct AlertSpan {
    pub(crate) name: String,
    pub(crate) fields: BTreeMap<String, String>,
}

/// A log event at or above the alert threshold, detached from the subscriber.
#[derive(Debug, Clone)]
pub(crate) struct AlertRecord {
    pub(crate) level: Level,
    pub(crate) at: DateTime<Utc>,
    pub(crate) service: String,
    pub(crate) stage: String,
    pub(crate) component: String,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
    pub(crate) spans: Vec<AlertSpan>,
}

#[async_trait]
pub(crate) trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, record: &AlertRecord) -> Result<()>;
}

/// Hands records to a background task so logging never waits on the network.
#[derive(Clone)]
pub(crate) struct AlertDispatcher {
    queue: mpsc::Sender<AlertRecord>,
}

impl AlertDispatcher {
    pub(crate) fn spawn(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        let (queue, mut inbox) = mpsc::channel::<AlertRecord>(ALERT_QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(record) = inbox.recv().await {
                for sink in &sinks {
                    if let Err(err) = sink.deliver(&record).await {
                        // eprintln, not tracing: a failing sink must not feed itself
                        eprintln!("observability: alert sink `{}` failed: {err}", sink.name());
                    }
                }
            }
        });

        Self { queue }
    }

    pub(crate) fn dispatch(&self, record: AlertRecord) {
        if let Err(err) = self.queue.try_send(record) {
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "queue closed",
            };
            eprintln!("observability: alert dropped ({reason})");
        }
    }
}
