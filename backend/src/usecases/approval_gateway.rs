use std::sync::Arc;

use crates::domain::{
    clock::Clock,
    repositories::{approvals::ApprovalRepository, domain_events::DomainEventPublisher},
    value_objects::{
        approvals::{
            ApprovalPayload, ApprovalRequestModel, DecisionCommand, DecisionEffect,
            DecisionOutcome, DecisionResultDto, SubmitApprovalRequest, SubmitOutcome, Verdict,
            new_approval_request, plan_decision_effects,
        },
        cancellations::normalize_reason,
        domain_events::DomainEvent,
    },
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{EngineError, EngineResult};

pub struct ApprovalGatewayUseCase<A>
where
    A: ApprovalRepository + Send + Sync + 'static,
{
    approval_repo: Arc<A>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventPublisher>,
}

impl<A> ApprovalGatewayUseCase<A>
where
    A: ApprovalRepository + Send + Sync + 'static,
{
    pub fn new(
        approval_repo: Arc<A>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn DomainEventPublisher>,
    ) -> Self {
        Self {
            approval_repo,
            clock,
            events,
        }
    }

    /// Opens an envelope for a non-freeze request. Freeze requests go through
    /// the freeze flow so the window and its allowance are reserved together.
    pub async fn submit(
        &self,
        request: SubmitApprovalRequest,
        requested_by: Uuid,
    ) -> EngineResult<ApprovalRequestModel> {
        let approval_type = request.payload.approval_type();
        info!(%approval_type, branch_id = %request.branch_id, "approval_gateway: submit");

        if matches!(request.payload, ApprovalPayload::Freeze(_)) {
            return Err(EngineError::ValidationError(
                "freeze requests are submitted against a membership".to_string(),
            ));
        }
        request
            .payload
            .validate()
            .map_err(EngineError::ValidationError)?;

        let row = new_approval_request(
            Uuid::new_v4(),
            request.branch_id,
            &request.payload,
            requested_by,
            self.clock.now(),
        )?;

        let created = match self.approval_repo.submit(row).await.map_err(|err| {
            error!(%approval_type, db_error = ?err, "approval_gateway: failed to insert request");
            EngineError::Internal(err)
        })? {
            SubmitOutcome::Created(entity) => entity,
            SubmitOutcome::DuplicatePending => {
                let (reference_type, reference_id) = request.payload.reference();
                warn!(
                    %approval_type,
                    %reference_type,
                    %reference_id,
                    "approval_gateway: a pending request already exists"
                );
                return Err(EngineError::DuplicatePendingRequest);
            }
        };

        let model = ApprovalRequestModel::try_from(created)?;
        self.events.publish(DomainEvent::ApprovalSubmitted {
            approval_request_id: model.id,
            approval_type,
            branch_id: model.branch_id,
        });

        Ok(model)
    }

    /// Decides a pending request. The status swap and its side effects commit
    /// as one unit; a second decision gets `AlreadyReviewed` and changes nothing.
    pub async fn decide(
        &self,
        request_id: Uuid,
        approved: bool,
        reviewer_id: Uuid,
        notes: Option<String>,
    ) -> EngineResult<DecisionResultDto> {
        let verdict = Verdict::from_approved(approved);
        info!(%request_id, ?verdict, %reviewer_id, "approval_gateway: decide");

        let entity = self
            .approval_repo
            .find_by_id(request_id)
            .await?
            .ok_or(EngineError::not_found("approval request", request_id))?;
        let current = ApprovalRequestModel::try_from(entity)?;

        if !current.is_pending() {
            return Err(EngineError::AlreadyReviewed {
                status: current.status.to_string(),
            });
        }

        let effects = plan_decision_effects(&current.payload, verdict, self.clock.today());
        let command = DecisionCommand {
            request_id,
            verdict,
            reviewer_id,
            notes: notes.as_deref().and_then(normalize_reason),
            decided_at: self.clock.now(),
            effects,
        };

        let outcome = self.approval_repo.decide(command).await.map_err(|err| {
            error!(%request_id, db_error = ?err, "approval_gateway: decision rolled back");
            EngineError::Internal(err)
        })?;

        let (request, applied) = match outcome {
            DecisionOutcome::Decided { request, applied } => (request, applied),
            DecisionOutcome::AlreadyReviewed { status } => {
                warn!(%request_id, %status, "approval_gateway: another reviewer decided first");
                return Err(EngineError::AlreadyReviewed { status });
            }
            DecisionOutcome::NotFound => {
                return Err(EngineError::not_found("approval request", request_id));
            }
        };

        let decided = ApprovalRequestModel::try_from(request)?;
        info!(
            %request_id,
            status = %decided.status,
            effects = applied.len(),
            "approval_gateway: request decided"
        );

        self.events.publish(DomainEvent::ApprovalDecided {
            approval_request_id: decided.id,
            approval_type: decided.approval_type(),
            status: decided.status,
            reference_id: decided.reference_id,
        });
        for effect in &applied {
            if let DecisionEffect::FreezeMembership {
                membership_id,
                freeze_id,
            } = *effect
            {
                self.events.publish(DomainEvent::MembershipFrozen {
                    membership_id,
                    freeze_history_id: freeze_id,
                });
            }
        }

        Ok(DecisionResultDto {
            request: decided,
            effects: applied,
        })
    }

    pub async fn list_pending(&self, branch_id: Uuid) -> EngineResult<Vec<ApprovalRequestModel>> {
        let rows = self.approval_repo.list_pending(branch_id).await?;

        let models = rows
            .into_iter()
            .filter_map(|entity| {
                let id = entity.id;
                ApprovalRequestModel::try_from(entity)
                    .inspect_err(|err| {
                        error!(%id, error = ?err, "approval_gateway: skipping unreadable request");
                    })
                    .ok()
            })
            .collect();

        Ok(models)
    }

    pub async fn get_request(&self, request_id: Uuid) -> EngineResult<ApprovalRequestModel> {
        let entity = self
            .approval_repo
            .find_by_id(request_id)
            .await?
            .ok_or(EngineError::not_found("approval request", request_id))?;

        Ok(ApprovalRequestModel::try_from(entity)?)
    }
}
