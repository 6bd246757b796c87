use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{
    approval_requests::{ApprovalRequestEntity, InsertApprovalRequestEntity},
    freeze_histories::{FreezeHistoryEntity, InsertFreezeHistoryEntity},
    memberships::MembershipEntity,
};

use super::{
    cancellations::RefundPolicy,
    enums::{
        freeze_statuses::FreezeStatus, membership_statuses::MembershipStatus,
        payment_methods::PaymentMethod,
    },
    freezes::{FreezeAllowance, reserved_days},
    reversals::{ReversalReceipt, ReversalSpec},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MembershipDto {
    pub id: Uuid,
    pub member_id: Uuid,
    pub plan_id: Uuid,
    pub branch_id: Uuid,
    pub start_date: NaiveDate,
    pub original_end_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub price_paid_minor: i64,
    pub discount_amount_minor: i64,
    pub total_freeze_days_used: i32,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub refund_amount_minor: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl From<MembershipEntity> for MembershipDto {
    fn from(value: MembershipEntity) -> Self {
        Self {
            id: value.id,
            member_id: value.member_id,
            plan_id: value.plan_id,
            branch_id: value.branch_id,
            start_date: value.start_date,
            original_end_date: value.original_end_date,
            end_date: value.end_date,
            status: value.status,
            price_paid_minor: value.price_paid_minor,
            discount_amount_minor: value.discount_amount_minor,
            total_freeze_days_used: value.total_freeze_days_used,
            cancelled_at: value.cancelled_at,
            cancelled_by: value.cancelled_by,
            cancellation_reason: value.cancellation_reason,
            refund_amount_minor: value.refund_amount_minor,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FreezeHistoryDto {
    pub id: Uuid,
    pub membership_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_frozen: i32,
    pub reason: Option<String>,
    pub fee_charged_minor: i64,
    pub status: String,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<FreezeHistoryEntity> for FreezeHistoryDto {
    fn from(value: FreezeHistoryEntity) -> Self {
        Self {
            id: value.id,
            membership_id: value.membership_id,
            start_date: value.start_date,
            end_date: value.end_date,
            days_frozen: value.days_frozen,
            reason: value.reason,
            fee_charged_minor: value.fee_charged_minor,
            status: value.status,
            approved_by: value.approved_by,
            approved_at: value.approved_at,
            applied_at: value.applied_at,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MembershipDetailDto {
    pub membership: MembershipDto,
    pub freeze_histories: Vec<FreezeHistoryDto>,
    pub max_freeze_days: i32,
    pub remaining_freeze_days: i32,
}

/// `(status, days_frozen)` pairs for the allowance and resume calculators.
/// Rows with an unknown status are left out.
pub fn freeze_windows(histories: &[FreezeHistoryEntity]) -> Vec<(FreezeStatus, i32)> {
    histories
        .iter()
        .filter_map(|h| FreezeStatus::from_str(&h.status).map(|status| (status, h.days_frozen)))
        .collect()
}

/// `(status, start_date, end_date)` for overlap checks. Unknown statuses are left out.
pub fn freeze_spans(histories: &[FreezeHistoryEntity]) -> Vec<(FreezeStatus, NaiveDate, NaiveDate)> {
    histories
        .iter()
        .filter_map(|h| {
            FreezeStatus::from_str(&h.status).map(|status| (status, h.start_date, h.end_date))
        })
        .collect()
}

pub fn allowance_for(
    membership: &MembershipEntity,
    max_freeze_days: i32,
    histories: &[FreezeHistoryEntity],
) -> FreezeAllowance {
    FreezeAllowance {
        max_freeze_days,
        used_days: membership.total_freeze_days_used,
        reserved_days: reserved_days(freeze_windows(histories)),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeWrite {
    pub membership_id: Uuid,
    pub expected_version: i32,
    pub status: MembershipStatus,
    pub end_date: NaiveDate,
    pub total_freeze_days_used: i32,
    pub updated_at: DateTime<Utc>,
}

/// Result of a write guarded by `memberships.lock_version`.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedWrite {
    Applied(MembershipEntity),
    Conflict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancellationWrite {
    pub membership_id: Uuid,
    pub expected_version: i32,
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: Uuid,
    pub reason: String,
    pub refund_amount_minor: i64,
    /// Present only when something is handed back.
    pub reversal: Option<ReversalSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancellationOutcome {
    Cancelled {
        membership: MembershipEntity,
        reversal: Option<ReversalReceipt>,
        member_deactivated: bool,
    },
    Conflict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreezeReservation {
    pub membership_id: Uuid,
    pub freeze: InsertFreezeHistoryEntity,
    pub approval: InsertApprovalRequestEntity,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReservationOutcome {
    Created {
        freeze: FreezeHistoryEntity,
        approval: ApprovalRequestEntity,
    },
    InsufficientAllowance {
        remaining: i32,
    },
    /// Another pending or approved window already covers some of these days.
    Overlap {
        existing_start: NaiveDate,
        existing_end: NaiveDate,
    },
    NotFreezable {
        status: String,
    },
    MembershipMissing,
}

/// An approved window whose start date has arrived but which has not yet moved
/// its membership into `frozen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueFreeze {
    pub membership_id: Uuid,
    pub freeze_history_id: Uuid,
    pub lock_version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitFreezeRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeSubmissionDto {
    pub freeze_history: FreezeHistoryDto,
    pub approval_request_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelMembershipRequest {
    pub reason: String,
    pub refund_policy: RefundPolicy,
    pub refund_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancellationDto {
    pub membership: MembershipDto,
    pub refund_amount_minor: i64,
    pub reversal: Option<ReversalReceipt>,
    pub member_deactivated: bool,
}
