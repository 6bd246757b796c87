//! Shared rows for the use case tests.

use chrono::{NaiveDate, Utc};
use crates::domain::{
    entities::{
        freeze_histories::FreezeHistoryEntity,
        memberships::MembershipEntity,
        plans::{BranchSettingsEntity, PlanEntity},
    },
    value_objects::enums::{freeze_statuses::FreezeStatus, membership_statuses::MembershipStatus},
};
use uuid::Uuid;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// January 2024, thirty days, 3000 paid, nothing frozen yet.
pub fn membership(status: MembershipStatus) -> MembershipEntity {
    let now = Utc::now();
    MembershipEntity {
        id: Uuid::new_v4(),
        member_id: Uuid::new_v4(),
        plan_id: Uuid::new_v4(),
        branch_id: Uuid::new_v4(),
        start_date: date(2024, 1, 1),
        original_end_date: date(2024, 1, 31),
        end_date: date(2024, 1, 31),
        status: status.to_string(),
        price_paid_minor: 3000,
        discount_amount_minor: 0,
        total_freeze_days_used: 0,
        created_by: None,
        cancelled_at: None,
        cancelled_by: None,
        cancellation_reason: None,
        refund_amount_minor: None,
        lock_version: 3,
        created_at: now,
        updated_at: now,
    }
}

pub fn plan(id: Uuid, max_freeze_days: i32) -> PlanEntity {
    PlanEntity {
        id,
        branch_id: Uuid::new_v4(),
        name: "Monthly".to_string(),
        duration_days: 30,
        price_minor: 3000,
        max_freeze_days,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn branch_settings(branch_id: Uuid, freeze_fee_minor: i64) -> BranchSettingsEntity {
    BranchSettingsEntity {
        branch_id,
        freeze_fee_minor,
        currency: "THB".to_string(),
        updated_at: Utc::now(),
    }
}

pub fn freeze_history(
    membership_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    status: FreezeStatus,
) -> FreezeHistoryEntity {
    FreezeHistoryEntity {
        id: Uuid::new_v4(),
        membership_id,
        start_date: start,
        end_date: end,
        days_frozen: ((end - start).num_days() + 1) as i32,
        reason: None,
        fee_charged_minor: 0,
        status: status.to_string(),
        approved_by: None,
        approved_at: None,
        applied_at: None,
        created_at: Utc::now(),
    }
}
