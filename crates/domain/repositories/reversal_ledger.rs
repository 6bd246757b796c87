use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

use crate::domain::value_objects::reversals::{ReversalReceipt, ReversalSpec};

#[automock]
#[async_trait]
pub trait ReversalLedgerRepository: Send + Sync {
    /// Returns the existing reversal for the spec's reference instead of writing a second one.
    async fn apply_reversal(
        &self,
        spec: ReversalSpec,
        recorded_at: DateTime<Utc>,
    ) -> Result<ReversalReceipt>;
}
