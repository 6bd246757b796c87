use std::sync::Arc;

use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post,
};
use crates::{
    domain::{
        clock::Clock,
        repositories::domain_events::DomainEventPublisher,
        value_objects::{
            enums::{payment_methods::PaymentMethod, reference_types::ReferenceType},
            reversals::ReversalSpec,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::reversal_ledger::ReversalLedgerPostgres,
    },
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    usecases::{errors::EngineError, reconciliation::ReconciliationUseCase},
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_BACKEND/api/v1/reversals" \
//     -H "Authorization: Bearer $STAFF_TOKEN" \
//     -H "Content-Type: application/json" \
//     -d '{"reference_type":"membership_refund","reference_id":"...","branch_id":"...",
//          "member_id":"...","amount_minor":800,"reason":"duplicate charge","method":"cash"}'

#[derive(Debug, Deserialize)]
pub struct ApplyReversalRequest {
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
    pub branch_id: Uuid,
    pub member_id: Uuid,
    pub amount_minor: i64,
    pub reason: String,
    pub method: PaymentMethod,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventPublisher>,
) -> Router {
    let ledger_repository = ReversalLedgerPostgres::new(Arc::clone(&db_pool));
    let reconciliation_usecase =
        ReconciliationUseCase::new(Arc::new(ledger_repository), clock, events);

    Router::new()
        .route("/", post(apply_reversal))
        .with_state(Arc::new(reconciliation_usecase))
}

pub async fn apply_reversal(
    State(reconciliation_usecase): State<Arc<ReconciliationUseCase<ReversalLedgerPostgres>>>,
    auth: AuthUser,
    Json(request): Json<ApplyReversalRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let spec = ReversalSpec {
        reference_type: request.reference_type,
        reference_id: request.reference_id,
        branch_id: request.branch_id,
        member_id: request.member_id,
        amount_minor: request.amount_minor,
        reason: request.reason,
        method: request.method,
        recorded_by: auth.staff_id,
    };

    let receipt = reconciliation_usecase.apply(spec).await?;
    let status = if receipt.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(receipt)))
}
