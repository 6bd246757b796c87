use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::approval_requests::{ApprovalRequestEntity, InsertApprovalRequestEntity},
    value_objects::approvals::{DecisionCommand, DecisionOutcome, SubmitOutcome},
};

#[automock]
#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    async fn submit(&self, request: InsertApprovalRequestEntity) -> Result<SubmitOutcome>;

    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<ApprovalRequestEntity>>;

    /// Oldest first.
    async fn list_pending(&self, branch_id: Uuid) -> Result<Vec<ApprovalRequestEntity>>;

    /// Moves the request out of `pending` and runs `command.effects` in the same
    /// transaction. Loses cleanly with `AlreadyReviewed` when another reviewer got there first.
    async fn decide(&self, command: DecisionCommand) -> Result<DecisionOutcome>;
}
