use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::approval_requests::{
    ApprovalRequestEntity, InsertApprovalRequestEntity,
};

use super::enums::{
    approval_statuses::ApprovalStatus, approval_types::ApprovalType,
    freeze_statuses::FreezeStatus, reference_types::ReferenceType,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezePayload {
    pub membership_id: Uuid,
    pub member_id: Uuid,
    pub freeze_history_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days_frozen: i32,
    pub fee_minor: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerChangePayload {
    pub member_id: Uuid,
    pub current_trainer_id: Option<Uuid>,
    pub new_trainer_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPayload {
    pub membership_id: Uuid,
    pub from_member_id: Uuid,
    pub to_member_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPayload {
    pub membership_id: Uuid,
    pub amount_minor: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountPayload {
    pub membership_id: Uuid,
    pub amount_minor: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplimentaryPayload {
    pub member_id: Uuid,
    pub plan_id: Uuid,
    pub days: i32,
    pub reason: Option<String>,
}

/// Snapshot stored in `approval_requests.request_data`. The variant decides
/// `approval_type` and the referenced record, so neither can drift from the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "approval_type", content = "data", rename_all = "snake_case")]
pub enum ApprovalPayload {
    Freeze(FreezePayload),
    TrainerChange(TrainerChangePayload),
    Transfer(TransferPayload),
    Refund(RefundPayload),
    Discount(DiscountPayload),
    Complimentary(ComplimentaryPayload),
}

impl ApprovalPayload {
    pub fn approval_type(&self) -> ApprovalType {
        match self {
            ApprovalPayload::Freeze(_) => ApprovalType::Freeze,
            ApprovalPayload::TrainerChange(_) => ApprovalType::TrainerChange,
            ApprovalPayload::Transfer(_) => ApprovalType::Transfer,
            ApprovalPayload::Refund(_) => ApprovalType::Refund,
            ApprovalPayload::Discount(_) => ApprovalType::Discount,
            ApprovalPayload::Complimentary(_) => ApprovalType::Complimentary,
        }
    }

    pub fn reference(&self) -> (ReferenceType, Uuid) {
        match self {
            ApprovalPayload::Freeze(p) => (ReferenceType::FreezeHistory, p.freeze_history_id),
            ApprovalPayload::TrainerChange(p) => (ReferenceType::Member, p.member_id),
            ApprovalPayload::Transfer(p) => (ReferenceType::Membership, p.membership_id),
            ApprovalPayload::Refund(p) => (ReferenceType::Membership, p.membership_id),
            ApprovalPayload::Discount(p) => (ReferenceType::Membership, p.membership_id),
            ApprovalPayload::Complimentary(p) => (ReferenceType::Member, p.member_id),
        }
    }

    /// Shape checks that do not need any stored state.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            ApprovalPayload::Freeze(p) if p.end_date < p.start_date => {
                Err("freeze end_date is before start_date".to_string())
            }
            ApprovalPayload::Freeze(p) if p.days_frozen <= 0 => {
                Err("freeze must cover at least one day".to_string())
            }
            ApprovalPayload::TrainerChange(p) if p.current_trainer_id == Some(p.new_trainer_id) => {
                Err("new trainer is already assigned".to_string())
            }
            ApprovalPayload::Transfer(p) if p.from_member_id == p.to_member_id => {
                Err("transfer target is the current owner".to_string())
            }
            ApprovalPayload::Refund(p) if p.amount_minor <= 0 => {
                Err("refund amount must be positive".to_string())
            }
            ApprovalPayload::Discount(p) if p.amount_minor <= 0 => {
                Err("discount amount must be positive".to_string())
            }
            ApprovalPayload::Complimentary(p) if p.days <= 0 => {
                Err("complimentary days must be positive".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalRequestModel {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub payload: ApprovalPayload,
    pub status: ApprovalStatus,
    pub requested_by: Uuid,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequestModel {
    pub fn approval_type(&self) -> ApprovalType {
        self.payload.approval_type()
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

impl TryFrom<ApprovalRequestEntity> for ApprovalRequestModel {
    type Error = anyhow::Error;

    fn try_from(entity: ApprovalRequestEntity) -> Result<Self> {
        let payload: ApprovalPayload = serde_json::from_value(entity.request_data)
            .with_context(|| format!("approval request {} has unreadable request_data", entity.id))?;

        if payload.approval_type().as_str() != entity.approval_type {
            bail!(
                "approval request {} is typed `{}` but carries a `{}` payload",
                entity.id,
                entity.approval_type,
                payload.approval_type()
            );
        }

        let status = ApprovalStatus::from_str(&entity.status).with_context(|| {
            format!("approval request {} has unknown status `{}`", entity.id, entity.status)
        })?;
        let reference_type = ReferenceType::from_str(&entity.reference_type).with_context(|| {
            format!(
                "approval request {} has unknown reference_type `{}`",
                entity.id, entity.reference_type
            )
        })?;

        Ok(Self {
            id: entity.id,
            branch_id: entity.branch_id,
            reference_type,
            reference_id: entity.reference_id,
            payload,
            status,
            requested_by: entity.requested_by,
            reviewed_by: entity.reviewed_by,
            reviewed_at: entity.reviewed_at,
            review_notes: entity.review_notes,
            created_at: entity.created_at,
        })
    }
}

/// Builds the pending envelope row for `payload`.
pub fn new_approval_request(
    id: Uuid,
    branch_id: Uuid,
    payload: &ApprovalPayload,
    requested_by: Uuid,
    created_at: DateTime<Utc>,
) -> Result<InsertApprovalRequestEntity> {
    let (reference_type, reference_id) = payload.reference();
    let request_data =
        serde_json::to_value(payload).context("failed to serialize approval payload")?;

    Ok(InsertApprovalRequestEntity {
        id,
        branch_id,
        approval_type: payload.approval_type().to_string(),
        reference_type: reference_type.to_string(),
        reference_id,
        request_data,
        status: ApprovalStatus::Pending.to_string(),
        requested_by,
        created_at,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    pub fn from_approved(approved: bool) -> Self {
        if approved { Verdict::Approve } else { Verdict::Reject }
    }

    pub fn resulting_status(&self) -> ApprovalStatus {
        match self {
            Verdict::Approve => ApprovalStatus::Approved,
            Verdict::Reject => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum DecisionEffect {
    /// Also bumps the membership's `lock_version`, so a resume computed from the
    /// window list read before this decision fails its CAS.
    MarkFreeze {
        membership_id: Uuid,
        freeze_id: Uuid,
        status: FreezeStatus,
    },
    FreezeMembership {
        membership_id: Uuid,
        freeze_id: Uuid,
    },
    AssignTrainer {
        member_id: Uuid,
        trainer_id: Uuid,
    },
}

/// Side effects a decision commits together with the envelope's status change.
/// Types whose records live outside the engine only record the decision.
pub fn plan_decision_effects(
    payload: &ApprovalPayload,
    verdict: Verdict,
    today: NaiveDate,
) -> Vec<DecisionEffect> {
    match (payload, verdict) {
        (ApprovalPayload::Freeze(freeze), Verdict::Approve) => {
            let mut effects = vec![DecisionEffect::MarkFreeze {
                membership_id: freeze.membership_id,
                freeze_id: freeze.freeze_history_id,
                status: FreezeStatus::Approved,
            }];
            if freeze.start_date <= today && today <= freeze.end_date {
                effects.push(DecisionEffect::FreezeMembership {
                    membership_id: freeze.membership_id,
                    freeze_id: freeze.freeze_history_id,
                });
            }
            effects
        }
        (ApprovalPayload::Freeze(freeze), Verdict::Reject) => vec![DecisionEffect::MarkFreeze {
            membership_id: freeze.membership_id,
            freeze_id: freeze.freeze_history_id,
            status: FreezeStatus::Rejected,
        }],
        (ApprovalPayload::TrainerChange(change), Verdict::Approve) => {
            vec![DecisionEffect::AssignTrainer {
                member_id: change.member_id,
                trainer_id: change.new_trainer_id,
            }]
        }
        _ => Vec::new(),
    }
}

/// Memberships whose freeze aggregate a decision touches, sorted and deduplicated
/// so every writer locks them in the same order.
pub fn touched_memberships(effects: &[DecisionEffect]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = effects
        .iter()
        .filter_map(|effect| match *effect {
            DecisionEffect::MarkFreeze { membership_id, .. }
            | DecisionEffect::FreezeMembership { membership_id, .. } => Some(membership_id),
            DecisionEffect::AssignTrainer { .. } => None,
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionCommand {
    pub request_id: Uuid,
    pub verdict: Verdict,
    pub reviewer_id: Uuid,
    pub notes: Option<String>,
    pub decided_at: DateTime<Utc>,
    pub effects: Vec<DecisionEffect>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// `applied` lists the effects that changed a row. A `FreezeMembership`
    /// against a membership that is no longer active is skipped, not failed.
    Decided {
        request: ApprovalRequestEntity,
        applied: Vec<DecisionEffect>,
    },
    AlreadyReviewed {
        status: String,
    },
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(ApprovalRequestEntity),
    DuplicatePending,
}

/// Body of the generic submit route. The payload decides type and reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApprovalRequest {
    pub branch_id: Uuid,
    pub payload: ApprovalPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecideApprovalRequest {
    pub approved: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionResultDto {
    pub request: ApprovalRequestModel,
    pub effects: Vec<DecisionEffect>,
}
