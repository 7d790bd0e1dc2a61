//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use quorum_core::Error;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Body: `{"error": "<kind>", "message": "<detail>"}`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match &self.0 {
      Error::Unauthenticated => StatusCode::UNAUTHORIZED,
      Error::AlreadyVoted(_) => StatusCode::CONFLICT,
      Error::AnswerNotFound { .. } | Error::PostNotFound(_) => {
        StatusCode::NOT_FOUND
      }
      Error::InvalidPost(_) => StatusCode::BAD_REQUEST,
      Error::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      Error::TransientNetworkFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = json!({ "error": self.0.kind(), "message": self.0.to_string() });
    (self.status(), Json(body)).into_response()
  }
}
