//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("forbidden: {0}")]
  Forbidden(String),
  #[error("bad request: {0}")]
  BadRequest(String),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, kind) = match &self {
      Error::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
      Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
    };
    (status, Json(json!({ "error": kind, "message": self.to_string() })))
      .into_response()
  }
}
