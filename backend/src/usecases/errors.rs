use axum::http::StatusCode;
use chrono::NaiveDate;
use crates::domain::value_objects::{
    cancellations::RefundRejection, freezes::FreezeRejection,
    membership_transitions::InvalidTransition,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    ValidationError(String),
    #[error("freeze window {start} to {end} covers no days")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("freeze of {requested} days exceeds the {remaining} days remaining")]
    InsufficientAllowance { requested: i64, remaining: i32 },
    #[error("refund amount {amount_minor} is outside 0..={price_paid_minor}")]
    InvalidRefundAmount {
        amount_minor: i64,
        price_paid_minor: i64,
    },
    #[error("membership in status `{status}` cannot be cancelled")]
    NotCancellable { status: String },
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    #[error("approval request was already reviewed (status `{status}`)")]
    AlreadyReviewed { status: String },
    #[error("record was changed concurrently; reload and retry")]
    PersistenceConflict,
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("a pending approval request already exists for this record")]
    DuplicatePendingRequest,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::ValidationError(_)
            | EngineError::InvalidDateRange { .. }
            | EngineError::InvalidRefundAmount { .. } => StatusCode::BAD_REQUEST,
            EngineError::InsufficientAllowance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::NotCancellable { .. }
            | EngineError::InvalidTransition(_)
            | EngineError::AlreadyReviewed { .. }
            | EngineError::PersistenceConflict
            | EngineError::DuplicatePendingRequest => StatusCode::CONFLICT,
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable name for clients.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::ValidationError(_) => "validation_error",
            EngineError::InvalidDateRange { .. } => "invalid_date_range",
            EngineError::InsufficientAllowance { .. } => "insufficient_allowance",
            EngineError::InvalidRefundAmount { .. } => "invalid_refund_amount",
            EngineError::NotCancellable { .. } => "not_cancellable",
            EngineError::InvalidTransition(_) => "invalid_transition",
            EngineError::AlreadyReviewed { .. } => "already_reviewed",
            EngineError::PersistenceConflict => "persistence_conflict",
            EngineError::NotFound { .. } => "not_found",
            EngineError::DuplicatePendingRequest => "duplicate_pending_request",
            EngineError::Internal(_) => "internal",
        }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        EngineError::NotFound { entity, id }
    }
}

impl From<FreezeRejection> for EngineError {
    fn from(rejection: FreezeRejection) -> Self {
        match rejection {
            FreezeRejection::InvalidDateRange { start, end } => {
                EngineError::InvalidDateRange { start, end }
            }
            FreezeRejection::InsufficientAllowance {
                requested,
                remaining,
            } => EngineError::InsufficientAllowance {
                requested,
                remaining,
            },
            overlap @ FreezeRejection::OverlappingWindow { .. } => {
                EngineError::ValidationError(overlap.to_string())
            }
        }
    }
}

impl From<RefundRejection> for EngineError {
    fn from(rejection: RefundRejection) -> Self {
        match rejection {
            RefundRejection::InvalidRefundAmount {
                amount_minor,
                price_paid_minor,
            } => EngineError::InvalidRefundAmount {
                amount_minor,
                price_paid_minor,
            },
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
