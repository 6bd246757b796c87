use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::usecases::errors::EngineError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub kind: &'static str,
    pub message: String,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            EngineError::Internal(err) => {
                error!(error = ?err, "http: internal error");
                // Don't leak internal error detail to client
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            kind: self.kind(),
            message,
        });

        (status, body).into_response()
    }
}
