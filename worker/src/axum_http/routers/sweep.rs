use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::error;

use crate::{config::config_model::DotEnvyConfig, usecases::membership_sweep::MembershipSweepUseCase};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/sweep" \
//     -H "Authorization: Bearer $INTERNAL_SWEEP_TOKEN"

#[derive(Clone)]
pub struct SweepRouteState {
    config: Arc<DotEnvyConfig>,
    usecase: Arc<MembershipSweepUseCase>,
}

pub fn routes(config: Arc<DotEnvyConfig>, usecase: Arc<MembershipSweepUseCase>) -> Router {
    Router::new()
        .route("/", post(trigger_sweep))
        .with_state(SweepRouteState { config, usecase })
}

pub async fn trigger_sweep(State(state): State<SweepRouteState>, headers: HeaderMap) -> Response {
    let expected_token = match state.config.sweep.internal_token.as_deref() {
        Some(token) => token,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                "sweep token is not configured",
            )
                .into_response();
        }
    };

    if let Err(status) = authorize_bearer(&headers, expected_token) {
        return (status, "unauthorized").into_response();
    }

    match state.usecase.run_now().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => {
            error!(error = ?err, "membership_sweep: triggered run failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "sweep failed").into_response()
        }
    }
}

fn authorize_bearer(headers: &HeaderMap, expected_token: &str) -> Result<(), StatusCode> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = auth
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if token == expected_token {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}
