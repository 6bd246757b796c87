use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        clock::Clock,
        repositories::domain_events::DomainEventPublisher,
        value_objects::approvals::{DecideApprovalRequest, SubmitApprovalRequest},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::approvals::ApprovalPostgres,
    },
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    usecases::{approval_gateway::ApprovalGatewayUseCase, errors::EngineError},
};

type Gateway = ApprovalGatewayUseCase<ApprovalPostgres>;

#[derive(Debug, Deserialize)]
pub struct PendingQueueQuery {
    pub branch_id: Uuid,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventPublisher>,
) -> Router {
    let approval_repository = ApprovalPostgres::new(Arc::clone(&db_pool));
    let approval_usecase = ApprovalGatewayUseCase::new(Arc::new(approval_repository), clock, events);

    Router::new()
        .route("/", post(submit).get(list_pending))
        .route("/:request_id", get(get_request))
        .route("/:request_id/decision", post(decide))
        .with_state(Arc::new(approval_usecase))
}

pub async fn submit(
    State(approval_usecase): State<Arc<Gateway>>,
    auth: AuthUser,
    Json(request): Json<SubmitApprovalRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let created = approval_usecase.submit(request, auth.staff_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_pending(
    State(approval_usecase): State<Arc<Gateway>>,
    _auth: AuthUser,
    Query(query): Query<PendingQueueQuery>,
) -> Result<impl IntoResponse, EngineError> {
    let queue = approval_usecase.list_pending(query.branch_id).await?;
    Ok(Json(queue))
}

pub async fn get_request(
    State(approval_usecase): State<Arc<Gateway>>,
    _auth: AuthUser,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let request = approval_usecase.get_request(request_id).await?;
    Ok(Json(request))
}

pub async fn decide(
    State(approval_usecase): State<Arc<Gateway>>,
    auth: AuthUser,
    Path(request_id): Path<Uuid>,
    Json(decision): Json<DecideApprovalRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let result = approval_usecase
        .decide(request_id, decision.approved, auth.staff_id, decision.notes)
        .await?;
    Ok(Json(result))
}
