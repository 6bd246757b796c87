use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::enums::{
    approval_statuses::ApprovalStatus, approval_types::ApprovalType,
    reference_types::ReferenceType,
};

/// Emitted once per committed mutation. Each variant carries the ids a
/// subscriber needs to refetch what changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    FreezeRequested {
        membership_id: Uuid,
        freeze_history_id: Uuid,
        approval_request_id: Uuid,
    },
    ApprovalSubmitted {
        approval_request_id: Uuid,
        approval_type: ApprovalType,
        branch_id: Uuid,
    },
    ApprovalDecided {
        approval_request_id: Uuid,
        approval_type: ApprovalType,
        status: ApprovalStatus,
        reference_id: Uuid,
    },
    MembershipFrozen {
        membership_id: Uuid,
        freeze_history_id: Uuid,
    },
    MembershipResumed {
        membership_id: Uuid,
        end_date: NaiveDate,
    },
    MembershipCancelled {
        membership_id: Uuid,
        member_id: Uuid,
        refund_amount_minor: i64,
    },
    MembershipExpired {
        membership_id: Uuid,
    },
    ReversalRecorded {
        reversal_id: Uuid,
        reference_type: ReferenceType,
        reference_id: Uuid,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::FreezeRequested { .. } => "freeze_requested",
            DomainEvent::ApprovalSubmitted { .. } => "approval_submitted",
            DomainEvent::ApprovalDecided { .. } => "approval_decided",
            DomainEvent::MembershipFrozen { .. } => "membership_frozen",
            DomainEvent::MembershipResumed { .. } => "membership_resumed",
            DomainEvent::MembershipCancelled { .. } => "membership_cancelled",
            DomainEvent::MembershipExpired { .. } => "membership_expired",
            DomainEvent::ReversalRecorded { .. } => "reversal_recorded",
        }
    }
}
