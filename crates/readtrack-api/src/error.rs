//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use readtrack_core::store::AsCoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler. Every variant renders as a JSON
/// body with a human-readable `message`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// A storage failure. `message` is shown to the client together with the
  /// underlying error text.
  #[error("{message}: {source}")]
  Store {
    message: &'static str,
    source:  Box<dyn std::error::Error + Send + Sync>,
  },
}

impl ApiError {
  /// Map a store error for use with `map_err`.
  ///
  /// Domain rejections keep their own status (400/404/409); anything else is
  /// logged and reported as a 500 carrying `message`.
  pub fn store<E>(message: &'static str) -> impl FnOnce(E) -> ApiError
  where
    E: std::error::Error + AsCoreError + Send + Sync + 'static,
  {
    move |e| {
      use readtrack_core::Error as Core;

      let domain = match e.as_core() {
        Some(Core::InvalidInput(m)) => Some(ApiError::BadRequest(m.clone())),
        Some(Core::BookNotFound(_)) => Some(ApiError::NotFound("Book not found".to_string())),
        Some(Core::EmailTaken(_)) => Some(ApiError::Conflict(
          "An account with that email already exists".to_string(),
        )),
        _ => None,
      };

      domain.unwrap_or_else(|| {
        tracing::error!(error = %e, "{message}");
        ApiError::Store { message, source: Box::new(e) }
      })
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "message": m })),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, json!({ "message": m })),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, json!({ "message": m })),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "message": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "message": m })),
      ApiError::Store { message, source } => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": message, "error": source.to_string() }),
      ),
    };
    (status, Json(body)).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}
