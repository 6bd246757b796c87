use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::{insert_into, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::{PgPoolSquad, checkout},
        schema::{approval_requests, freeze_histories, memberships, plans},
    },
};
use domain::{
    entities::{
        approval_requests::ApprovalRequestEntity, freeze_histories::FreezeHistoryEntity,
        memberships::MembershipEntity,
    },
    repositories::freezes::FreezeRepository,
    value_objects::{
        enums::{freeze_statuses::FreezeStatus, membership_statuses::MembershipStatus},
        freezes::{FreezeAllowance, find_overlap, reserved_days},
        memberships::{FreezeReservation, ReservationOutcome},
    },
};

pub struct FreezePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl FreezePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl FreezeRepository for FreezePostgres {
    async fn reserve_freeze(&self, reservation: FreezeReservation) -> Result<ReservationOutcome> {
        let mut conn = checkout(&self.db_pool)?;

        let outcome = conn.transaction::<_, anyhow::Error, _>(|conn| {
            // serializes concurrent submissions against the same membership
            let locked = memberships::table
                .find(reservation.membership_id)
                .select(MembershipEntity::as_select())
                .for_update()
                .first::<MembershipEntity>(conn)
                .optional()?;

            let Some(membership) = locked else {
                return Ok(ReservationOutcome::MembershipMissing);
            };

            if membership.status != MembershipStatus::Active.as_str() {
                return Ok(ReservationOutcome::NotFreezable {
                    status: membership.status,
                });
            }

            let max_freeze_days = plans::table
                .find(membership.plan_id)
                .select(plans::max_freeze_days)
                .first::<i32>(conn)?;

            let windows = freeze_histories::table
                .filter(freeze_histories::membership_id.eq(membership.id))
                .select((
                    freeze_histories::status,
                    freeze_histories::days_frozen,
                    freeze_histories::start_date,
                    freeze_histories::end_date,
                ))
                .load::<(String, i32, NaiveDate, NaiveDate)>(conn)?
                .into_iter()
                .filter_map(|(status, days, start, end)| {
                    FreezeStatus::from_str(&status).map(|status| (status, days, start, end))
                })
                .collect::<Vec<_>>();

            if let Some((existing_start, existing_end)) = find_overlap(
                reservation.freeze.start_date,
                reservation.freeze.end_date,
                windows.iter().map(|&(status, _, start, end)| (status, start, end)),
            ) {
                return Ok(ReservationOutcome::Overlap {
                    existing_start,
                    existing_end,
                });
            }

            let allowance = FreezeAllowance {
                max_freeze_days,
                used_days: membership.total_freeze_days_used,
                reserved_days: reserved_days(windows.iter().map(|&(status, days, _, _)| (status, days))),
            };

            let remaining = allowance.remaining();
            if reservation.freeze.days_frozen > remaining {
                return Ok(ReservationOutcome::InsufficientAllowance { remaining });
            }

            let freeze = insert_into(freeze_histories::table)
                .values(&reservation.freeze)
                .returning(FreezeHistoryEntity::as_select())
                .get_result::<FreezeHistoryEntity>(conn)?;

            let approval = insert_into(approval_requests::table)
                .values(&reservation.approval)
                .returning(ApprovalRequestEntity::as_select())
                .get_result::<ApprovalRequestEntity>(conn)?;

            Ok(ReservationOutcome::Created { freeze, approval })
        })?;

        Ok(outcome)
    }
}
