//! Operation-aborting error taxonomy.
//!
//! Only configuration, precondition, and not-found errors abort a request.
//! Generation-pipeline failures (backend or renderer) are never represented
//! here: the engine folds them into the document record's FAILED status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::IntakeCategory;

#[derive(Debug, Error)]
pub enum PortalError {
  /// Configuration error: the tag maps to no registered agent.
  #[error("no agent registered for document type: {0}")]
  UnregisteredDocumentType(String),

  /// Precondition error: intake flow not finished for this exercise.
  #[error("cannot generate documents until all questions are answered (missing: {})",
          format_categories(.missing))]
  IncompleteIntake { missing: Vec<IntakeCategory> },

  #[error("exercise not found: {0}")]
  ExerciseNotFound(String),

  #[error("document not found: {0}")]
  DocumentNotFound(String),

  /// Download requested before a rendered file exists.
  #[error("PDF file not available for document: {0}")]
  FileUnavailable(String),

  /// Request body failed a field check (length, emptiness).
  #[error("invalid input: {0}")]
  InvalidInput(String),
}

fn format_categories(cats: &[IntakeCategory]) -> String {
  cats.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ")
}

impl PortalError {
  fn status_code(&self) -> StatusCode {
    match self {
      PortalError::UnregisteredDocumentType(_) => StatusCode::BAD_REQUEST,
      PortalError::IncompleteIntake { .. } => StatusCode::BAD_REQUEST,
      PortalError::ExerciseNotFound(_) => StatusCode::NOT_FOUND,
      PortalError::DocumentNotFound(_) => StatusCode::NOT_FOUND,
      PortalError::FileUnavailable(_) => StatusCode::NOT_FOUND,
      PortalError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
  }
}

impl IntoResponse for PortalError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    let body = Json(json!({ "error": self.to_string() }));
    (status, body).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn incomplete_intake_names_missing_categories() {
    let err = PortalError::IncompleteIntake {
      missing: vec![IntakeCategory::Twists, IntakeCategory::Conclusion],
    };
    let msg = err.to_string();
    assert!(msg.contains("twists"));
    assert!(msg.contains("conclusion"));
  }

  #[test]
  fn status_codes_split_client_errors() {
    assert_eq!(
      PortalError::UnregisteredDocumentType("x".into()).status_code(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      PortalError::ExerciseNotFound("x".into()).status_code(),
      StatusCode::NOT_FOUND
    );
  }
}
