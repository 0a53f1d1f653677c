use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Every way a request can fail, mapped onto an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("csrf token mismatch")]
    CsrfMismatch,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("too many login attempts")]
    TooManyRequests,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Unauthenticated => Redirect::to("/login").into_response(),
            AppError::Forbidden => detail(StatusCode::FORBIDDEN, "Unauthorized"),
            AppError::CsrfMismatch => {
                warn!("csrf token mismatch");
                detail(StatusCode::FORBIDDEN, "CSRF token mismatch")
            }
            AppError::NotFound(what) => detail(StatusCode::NOT_FOUND, &format!("{what} not found")),
            AppError::BadRequest(msg) => detail(StatusCode::BAD_REQUEST, &msg),
            AppError::TooManyRequests => {
                detail(StatusCode::TOO_MANY_REQUESTS, "Too many login attempts")
            }
            AppError::Internal(e) => {
                error!(error = ?e, "unhandled error");
                internal_response()
            }
        }
    }
}

fn detail(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "detail": msg }))).into_response()
}

/// Body sent for any 500; the cause only goes to the log.
pub fn internal_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal Server Error" })),
    )
        .into_response()
}
