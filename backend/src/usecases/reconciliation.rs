use std::sync::Arc;

use crates::domain::{
    clock::Clock,
    repositories::{
        domain_events::DomainEventPublisher, reversal_ledger::ReversalLedgerRepository,
    },
    value_objects::{
        domain_events::DomainEvent,
        reversals::{ReversalReceipt, ReversalSpec},
    },
};
use tracing::{error, info};

use super::errors::{EngineError, EngineResult};

/// Writes refunds to the ledger. Safe to call again with the same reference.
pub struct ReconciliationUseCase<L>
where
    L: ReversalLedgerRepository + Send + Sync + 'static,
{
    ledger_repo: Arc<L>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventPublisher>,
}

impl<L> ReconciliationUseCase<L>
where
    L: ReversalLedgerRepository + Send + Sync + 'static,
{
    pub fn new(
        ledger_repo: Arc<L>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn DomainEventPublisher>,
    ) -> Self {
        Self {
            ledger_repo,
            clock,
            events,
        }
    }

    pub async fn apply(&self, spec: ReversalSpec) -> EngineResult<ReversalReceipt> {
        spec.validate().map_err(EngineError::ValidationError)?;

        let reference_type = spec.reference_type;
        let reference_id = spec.reference_id;

        let receipt = self
            .ledger_repo
            .apply_reversal(spec, self.clock.now())
            .await
            .map_err(|err| {
                error!(
                    %reference_type,
                    %reference_id,
                    db_error = ?err,
                    "reconciliation: failed to write reversal"
                );
                EngineError::Internal(err)
            })?;

        if receipt.created {
            info!(
                reversal_id = %receipt.reversal_id,
                %reference_type,
                %reference_id,
                "reconciliation: reversal recorded"
            );
            self.events.publish(DomainEvent::ReversalRecorded {
                reversal_id: receipt.reversal_id,
                reference_type,
                reference_id,
            });
        } else {
            info!(
                reversal_id = %receipt.reversal_id,
                %reference_id,
                "reconciliation: reversal already recorded"
            );
        }

        Ok(receipt)
    }
}
