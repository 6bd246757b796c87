use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{freeze_histories::FreezeHistoryEntity, memberships::MembershipEntity},
    value_objects::memberships::{
        CancellationOutcome, CancellationWrite, DueFreeze, ResumeWrite, VersionedWrite,
    },
};

#[automock]
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn find_by_id(&self, membership_id: Uuid) -> Result<Option<MembershipEntity>>;

    /// Newest first.
    async fn list_freeze_histories(&self, membership_id: Uuid)
    -> Result<Vec<FreezeHistoryEntity>>;

    async fn apply_resume(&self, write: ResumeWrite) -> Result<VersionedWrite>;

    /// Status change, optional reversal and member re-evaluation in one transaction.
    async fn cancel(&self, write: CancellationWrite) -> Result<CancellationOutcome>;

    async fn list_due_freezes(&self, today: NaiveDate) -> Result<Vec<DueFreeze>>;

    async fn apply_due_freeze(
        &self,
        due: DueFreeze,
        applied_at: DateTime<Utc>,
    ) -> Result<VersionedWrite>;

    /// Active memberships whose `end_date` is before `today`.
    async fn list_expirable(&self, today: NaiveDate) -> Result<Vec<MembershipEntity>>;

    async fn expire(
        &self,
        membership_id: Uuid,
        expected_version: i32,
        expired_at: DateTime<Utc>,
    ) -> Result<VersionedWrite>;
}
