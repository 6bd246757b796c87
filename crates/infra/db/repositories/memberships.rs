use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::{prelude::*, update};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::{
        postgres::{
            postgres_connection::{PgPoolSquad, checkout},
            schema::{freeze_histories, members, memberships},
        },
        repositories::reversal_ledger::{is_unique_violation, write_reversal},
    },
};
use domain::{
    entities::{freeze_histories::FreezeHistoryEntity, memberships::MembershipEntity},
    repositories::memberships::MembershipRepository,
    value_objects::{
        enums::{
            freeze_statuses::FreezeStatus, member_statuses::MemberStatus,
            membership_statuses::MembershipStatus,
        },
        memberships::{
            CancellationOutcome, CancellationWrite, DueFreeze, ResumeWrite, VersionedWrite,
        },
    },
};

pub struct MembershipPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl MembershipPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// A concurrent direct reversal for the same membership can win the refund
/// index while this transaction runs. The cancellation rolled back, so the
/// caller sees a conflict and retries against fresh state.
fn settle_cancellation(
    membership_id: Uuid,
    written: Result<CancellationOutcome>,
) -> Result<CancellationOutcome> {
    match written {
        Err(err) if is_unique_violation(&err) => {
            warn!(
                %membership_id,
                "memberships: refund recorded concurrently, cancellation rolled back"
            );
            Ok(CancellationOutcome::Conflict)
        }
        other => other,
    }
}

fn versioned(row: Option<MembershipEntity>) -> VersionedWrite {
    match row {
        Some(membership) => VersionedWrite::Applied(membership),
        None => VersionedWrite::Conflict,
    }
}

#[async_trait]
impl MembershipRepository for MembershipPostgres {
    async fn find_by_id(&self, membership_id: Uuid) -> Result<Option<MembershipEntity>> {
        let mut conn = checkout(&self.db_pool)?;

        let membership = memberships::table
            .find(membership_id)
            .select(MembershipEntity::as_select())
            .first::<MembershipEntity>(&mut conn)
            .optional()?;

        Ok(membership)
    }

    async fn list_freeze_histories(
        &self,
        membership_id: Uuid,
    ) -> Result<Vec<FreezeHistoryEntity>> {
        let mut conn = checkout(&self.db_pool)?;

        let histories = freeze_histories::table
            .filter(freeze_histories::membership_id.eq(membership_id))
            .order((
                freeze_histories::start_date.desc(),
                freeze_histories::created_at.desc(),
            ))
            .select(FreezeHistoryEntity::as_select())
            .load::<FreezeHistoryEntity>(&mut conn)?;

        Ok(histories)
    }

    async fn apply_resume(&self, write: ResumeWrite) -> Result<VersionedWrite> {
        let mut conn = checkout(&self.db_pool)?;

        let row = update(memberships::table)
            .filter(memberships::id.eq(write.membership_id))
            .filter(memberships::lock_version.eq(write.expected_version))
            .set((
                memberships::status.eq(write.status.to_string()),
                memberships::end_date.eq(write.end_date),
                memberships::total_freeze_days_used.eq(write.total_freeze_days_used),
                memberships::lock_version.eq(memberships::lock_version + 1),
                memberships::updated_at.eq(write.updated_at),
            ))
            .returning(MembershipEntity::as_select())
            .get_result::<MembershipEntity>(&mut conn)
            .optional()?;

        Ok(versioned(row))
    }

    async fn cancel(&self, write: CancellationWrite) -> Result<CancellationOutcome> {
        let mut conn = checkout(&self.db_pool)?;
        let cancellable = [
            MembershipStatus::Active.as_str(),
            MembershipStatus::Frozen.as_str(),
        ];

        let written = conn.transaction::<_, anyhow::Error, _>(|conn| {
            let cancelled = update(memberships::table)
                .filter(memberships::id.eq(write.membership_id))
                .filter(memberships::lock_version.eq(write.expected_version))
                .filter(memberships::status.eq_any(cancellable))
                .set((
                    memberships::status.eq(MembershipStatus::Cancelled.to_string()),
                    memberships::cancelled_at.eq(Some(write.cancelled_at)),
                    memberships::cancelled_by.eq(Some(write.cancelled_by)),
                    memberships::cancellation_reason.eq(Some(write.reason.clone())),
                    memberships::refund_amount_minor.eq(Some(write.refund_amount_minor)),
                    memberships::lock_version.eq(memberships::lock_version + 1),
                    memberships::updated_at.eq(write.cancelled_at),
                ))
                .returning(MembershipEntity::as_select())
                .get_result::<MembershipEntity>(conn)
                .optional()?;

            let Some(membership) = cancelled else {
                return Ok(CancellationOutcome::Conflict);
            };

            let reversal = match &write.reversal {
                Some(spec) => Some(write_reversal(conn, spec, write.cancelled_at)?),
                None => None,
            };

            let still_active = memberships::table
                .filter(memberships::member_id.eq(membership.member_id))
                .filter(memberships::status.eq(MembershipStatus::Active.as_str()))
                .count()
                .get_result::<i64>(conn)?;

            let member_deactivated = if still_active == 0 {
                update(members::table)
                    .filter(members::id.eq(membership.member_id))
                    .filter(members::status.ne(MemberStatus::Inactive.as_str()))
                    .set((
                        members::status.eq(MemberStatus::Inactive.to_string()),
                        members::updated_at.eq(write.cancelled_at),
                    ))
                    .execute(conn)?
                    == 1
            } else {
                false
            };

            Ok(CancellationOutcome::Cancelled {
                membership,
                reversal,
                member_deactivated,
            })
        });

        settle_cancellation(write.membership_id, written)
    }

    async fn list_due_freezes(&self, today: NaiveDate) -> Result<Vec<DueFreeze>> {
        let mut conn = checkout(&self.db_pool)?;

        let rows = freeze_histories::table
            .inner_join(memberships::table)
            .filter(freeze_histories::status.eq(FreezeStatus::Approved.as_str()))
            .filter(freeze_histories::applied_at.is_null())
            .filter(freeze_histories::start_date.le(today))
            .filter(freeze_histories::end_date.ge(today))
            .filter(memberships::status.eq(MembershipStatus::Active.as_str()))
            .order(freeze_histories::start_date.asc())
            .select((
                memberships::id,
                freeze_histories::id,
                memberships::lock_version,
            ))
            .load::<(Uuid, Uuid, i32)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(membership_id, freeze_history_id, lock_version)| DueFreeze {
                membership_id,
                freeze_history_id,
                lock_version,
            })
            .collect())
    }

    async fn apply_due_freeze(
        &self,
        due: DueFreeze,
        applied_at: DateTime<Utc>,
    ) -> Result<VersionedWrite> {
        let mut conn = checkout(&self.db_pool)?;

        let row = conn.transaction::<_, anyhow::Error, _>(|conn| {
            let frozen = update(memberships::table)
                .filter(memberships::id.eq(due.membership_id))
                .filter(memberships::lock_version.eq(due.lock_version))
                .filter(memberships::status.eq(MembershipStatus::Active.as_str()))
                .set((
                    memberships::status.eq(MembershipStatus::Frozen.to_string()),
                    memberships::lock_version.eq(memberships::lock_version + 1),
                    memberships::updated_at.eq(applied_at),
                ))
                .returning(MembershipEntity::as_select())
                .get_result::<MembershipEntity>(conn)
                .optional()?;

            if frozen.is_some() {
                update(freeze_histories::table)
                    .filter(freeze_histories::id.eq(due.freeze_history_id))
                    .filter(freeze_histories::applied_at.is_null())
                    .set(freeze_histories::applied_at.eq(Some(applied_at)))
                    .execute(conn)?;
            }

            Ok(frozen)
        })?;

        Ok(versioned(row))
    }

    async fn list_expirable(&self, today: NaiveDate) -> Result<Vec<MembershipEntity>> {
        let mut conn = checkout(&self.db_pool)?;

        let rows = memberships::table
            .filter(memberships::status.eq(MembershipStatus::Active.as_str()))
            .filter(memberships::end_date.lt(today))
            .order(memberships::end_date.asc())
            .select(MembershipEntity::as_select())
            .load::<MembershipEntity>(&mut conn)?;

        Ok(rows)
    }

    async fn expire(
        &self,
        membership_id: Uuid,
        expected_version: i32,
        expired_at: DateTime<Utc>,
    ) -> Result<VersionedWrite> {
        let mut conn = checkout(&self.db_pool)?;

        let row = update(memberships::table)
            .filter(memberships::id.eq(membership_id))
            .filter(memberships::lock_version.eq(expected_version))
            .filter(memberships::status.eq(MembershipStatus::Active.as_str()))
            .set((
                memberships::status.eq(MembershipStatus::Expired.to_string()),
                memberships::lock_version.eq(memberships::lock_version + 1),
                memberships::updated_at.eq(expired_at),
            ))
            .returning(MembershipEntity::as_select())
            .get_result::<MembershipEntity>(&mut conn)
            .optional()?;

        Ok(versioned(row))
    }
}
