use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::{PgPoolSquad, checkout},
        schema::{approval_requests, freeze_histories, members, memberships},
    },
};
use domain::{
    entities::approval_requests::{ApprovalRequestEntity, InsertApprovalRequestEntity},
    repositories::approvals::ApprovalRepository,
    value_objects::{
        approvals::{
            DecisionCommand, DecisionEffect, DecisionOutcome, SubmitOutcome, touched_memberships,
        },
        enums::{
            approval_statuses::ApprovalStatus, freeze_statuses::FreezeStatus,
            membership_statuses::MembershipStatus,
        },
    },
};

pub struct ApprovalPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl ApprovalPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Runs one planned effect on the decision's transaction. Returns whether a
/// row changed; an error rolls the whole decision back.
fn apply_effect(
    conn: &mut PgConnection,
    effect: &DecisionEffect,
    reviewer_id: Uuid,
    decided_at: DateTime<Utc>,
) -> Result<bool> {
    match *effect {
        DecisionEffect::MarkFreeze {
            membership_id,
            freeze_id,
            status,
        } => {
            let (approved_by, approved_at) = match status {
                FreezeStatus::Approved => (Some(reviewer_id), Some(decided_at)),
                _ => (None, None),
            };

            let updated = update(freeze_histories::table)
                .filter(freeze_histories::id.eq(freeze_id))
                .filter(freeze_histories::membership_id.eq(membership_id))
                .filter(freeze_histories::status.eq(FreezeStatus::Pending.as_str()))
                .set((
                    freeze_histories::status.eq(status.to_string()),
                    freeze_histories::approved_by.eq(approved_by),
                    freeze_histories::approved_at.eq(approved_at),
                ))
                .execute(conn)?;

            if updated != 1 {
                bail!("freeze window {freeze_id} is missing or no longer pending");
            }

            // the approved window set changed; stale resumes must lose their CAS
            update(memberships::table)
                .filter(memberships::id.eq(membership_id))
                .set((
                    memberships::lock_version.eq(memberships::lock_version + 1),
                    memberships::updated_at.eq(decided_at),
                ))
                .execute(conn)?;
            Ok(true)
        }
        DecisionEffect::FreezeMembership {
            membership_id,
            freeze_id,
        } => {
            let frozen = update(memberships::table)
                .filter(memberships::id.eq(membership_id))
                .filter(memberships::status.eq(MembershipStatus::Active.as_str()))
                .set((
                    memberships::status.eq(MembershipStatus::Frozen.to_string()),
                    memberships::lock_version.eq(memberships::lock_version + 1),
                    memberships::updated_at.eq(decided_at),
                ))
                .execute(conn)?;

            if frozen == 0 {
                return Ok(false);
            }

            update(freeze_histories::table)
                .filter(freeze_histories::id.eq(freeze_id))
                .set(freeze_histories::applied_at.eq(Some(decided_at)))
                .execute(conn)?;
            Ok(true)
        }
        DecisionEffect::AssignTrainer {
            member_id,
            trainer_id,
        } => {
            let updated = update(members::table)
                .filter(members::id.eq(member_id))
                .set((
                    members::assigned_trainer_id.eq(Some(trainer_id)),
                    members::updated_at.eq(decided_at),
                ))
                .execute(conn)?;

            if updated != 1 {
                bail!("member {member_id} not found for trainer assignment");
            }
            Ok(true)
        }
    }
}

#[async_trait]
impl ApprovalRepository for ApprovalPostgres {
    async fn submit(&self, request: InsertApprovalRequestEntity) -> Result<SubmitOutcome> {
        let mut conn = checkout(&self.db_pool)?;

        // the partial unique index on pending (reference_type, reference_id) turns
        // a second open request into a no-op insert
        let created = insert_into(approval_requests::table)
            .values(&request)
            .on_conflict_do_nothing()
            .returning(ApprovalRequestEntity::as_select())
            .get_result::<ApprovalRequestEntity>(&mut conn)
            .optional()?;

        Ok(match created {
            Some(entity) => SubmitOutcome::Created(entity),
            None => SubmitOutcome::DuplicatePending,
        })
    }

    async fn find_by_id(&self, request_id: Uuid) -> Result<Option<ApprovalRequestEntity>> {
        let mut conn = checkout(&self.db_pool)?;

        let request = approval_requests::table
            .find(request_id)
            .select(ApprovalRequestEntity::as_select())
            .first::<ApprovalRequestEntity>(&mut conn)
            .optional()?;

        Ok(request)
    }

    async fn list_pending(&self, branch_id: Uuid) -> Result<Vec<ApprovalRequestEntity>> {
        let mut conn = checkout(&self.db_pool)?;

        let requests = approval_requests::table
            .filter(approval_requests::branch_id.eq(branch_id))
            .filter(approval_requests::status.eq(ApprovalStatus::Pending.as_str()))
            .order(approval_requests::created_at.asc())
            .select(ApprovalRequestEntity::as_select())
            .load::<ApprovalRequestEntity>(&mut conn)?;

        Ok(requests)
    }

    async fn decide(&self, command: DecisionCommand) -> Result<DecisionOutcome> {
        let mut conn = checkout(&self.db_pool)?;

        let outcome = conn.transaction::<_, anyhow::Error, _>(|conn| {
            // same lock order as freeze reservation: membership rows before anything else
            let touched = touched_memberships(&command.effects);
            if !touched.is_empty() {
                memberships::table
                    .filter(memberships::id.eq_any(touched.clone()))
                    .order(memberships::id.asc())
                    .select(memberships::id)
                    .for_update()
                    .load::<Uuid>(conn)?;
            }

            // compare-and-swap on status: only one reviewer can move it out of pending
            let decided = update(approval_requests::table)
                .filter(approval_requests::id.eq(command.request_id))
                .filter(approval_requests::status.eq(ApprovalStatus::Pending.as_str()))
                .set((
                    approval_requests::status.eq(command.verdict.resulting_status().to_string()),
                    approval_requests::reviewed_by.eq(Some(command.reviewer_id)),
                    approval_requests::reviewed_at.eq(Some(command.decided_at)),
                    approval_requests::review_notes.eq(command.notes.clone()),
                ))
                .returning(ApprovalRequestEntity::as_select())
                .get_result::<ApprovalRequestEntity>(conn)
                .optional()?;

            let Some(request) = decided else {
                let current = approval_requests::table
                    .find(command.request_id)
                    .select(approval_requests::status)
                    .first::<String>(conn)
                    .optional()?;

                return Ok(match current {
                    Some(status) => DecisionOutcome::AlreadyReviewed { status },
                    None => DecisionOutcome::NotFound,
                });
            };

            let mut applied = Vec::with_capacity(command.effects.len());
            for effect in &command.effects {
                if apply_effect(conn, effect, command.reviewer_id, command.decided_at)? {
                    applied.push(*effect);
                }
            }

            Ok(DecisionOutcome::Decided { request, applied })
        })?;

        Ok(outcome)
    }
}
