use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        clock::Clock,
        repositories::domain_events::DomainEventPublisher,
        value_objects::memberships::{CancelMembershipRequest, SubmitFreezeRequest},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            catalog::CatalogPostgres, freezes::FreezePostgres, memberships::MembershipPostgres,
        },
    },
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    usecases::{
        cancellations::CancellationUseCase, errors::EngineError,
        membership_freezes::MembershipFreezeUseCase, memberships::MembershipQueryUseCase,
    },
};

#[derive(Clone)]
pub struct MembershipRouteState {
    freezes: Arc<MembershipFreezeUseCase<MembershipPostgres, FreezePostgres, CatalogPostgres>>,
    cancellations: Arc<CancellationUseCase<MembershipPostgres>>,
    queries: Arc<MembershipQueryUseCase<MembershipPostgres, CatalogPostgres>>,
}

pub fn routes(
    db_pool: Arc<PgPoolSquad>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn DomainEventPublisher>,
) -> Router {
    let membership_repository = Arc::new(MembershipPostgres::new(Arc::clone(&db_pool)));
    let freeze_repository = Arc::new(FreezePostgres::new(Arc::clone(&db_pool)));
    let catalog_repository = Arc::new(CatalogPostgres::new(Arc::clone(&db_pool)));

    let state = MembershipRouteState {
        freezes: Arc::new(MembershipFreezeUseCase::new(
            Arc::clone(&membership_repository),
            freeze_repository,
            Arc::clone(&catalog_repository),
            Arc::clone(&clock),
            Arc::clone(&events),
        )),
        cancellations: Arc::new(CancellationUseCase::new(
            Arc::clone(&membership_repository),
            clock,
            events,
        )),
        queries: Arc::new(MembershipQueryUseCase::new(
            membership_repository,
            catalog_repository,
        )),
    };

    Router::new()
        .route("/:membership_id", get(get_membership))
        .route("/:membership_id/freezes", post(submit_freeze))
        .route("/:membership_id/resume", post(resume_from_freeze))
        .route("/:membership_id/cancel", post(cancel_membership))
        .with_state(state)
}

pub async fn get_membership(
    State(state): State<MembershipRouteState>,
    _auth: AuthUser,
    Path(membership_id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let detail = state.queries.get_membership(membership_id).await?;
    Ok(Json(detail))
}

pub async fn submit_freeze(
    State(state): State<MembershipRouteState>,
    auth: AuthUser,
    Path(membership_id): Path<Uuid>,
    Json(request): Json<SubmitFreezeRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let submission = state
        .freezes
        .submit_freeze(membership_id, request, auth.staff_id)
        .await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

pub async fn resume_from_freeze(
    State(state): State<MembershipRouteState>,
    _auth: AuthUser,
    Path(membership_id): Path<Uuid>,
) -> Result<impl IntoResponse, EngineError> {
    let membership = state.freezes.resume_from_freeze(membership_id).await?;
    Ok(Json(membership))
}

pub async fn cancel_membership(
    State(state): State<MembershipRouteState>,
    auth: AuthUser,
    Path(membership_id): Path<Uuid>,
    Json(request): Json<CancelMembershipRequest>,
) -> Result<impl IntoResponse, EngineError> {
    let cancellation = state
        .cancellations
        .cancel_membership(membership_id, request, auth.staff_id)
        .await?;
    Ok(Json(cancellation))
}
