//! HTTP endpoint handlers. These are thin wrappers that forward to the
//! stores and the generation engine. Each handler is instrumented and logs
//! parameters and basic result info.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::agents;
use crate::domain::{DocumentType, Exercise, ExerciseStatus};
use crate::engine;
use crate::error::PortalError;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse {
  Json(HealthOut { ok: true })
}

//
// Exercises
//

#[instrument(level = "info", skip(state, body), fields(title_len = body.title.len()))]
pub async fn http_create_exercise(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateExerciseIn>,
) -> Result<impl IntoResponse, PortalError> {
  let title = body.title.trim().to_string();
  if title.chars().count() < 3 {
    return Err(PortalError::InvalidInput("title must be at least 3 characters".into()));
  }

  let exercise = Exercise::new(title, body.description, body.story_seed, &state.question_texts);
  state.exercises.insert(exercise.clone()).await;
  info!(target: "exercise", id = %exercise.id, "Exercise created");
  Ok((StatusCode::CREATED, Json(exercise_out(&exercise))))
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_exercises(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let all = state.exercises.list().await;
  Json(all.iter().map(exercise_summary_out).collect::<Vec<_>>())
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_exercise(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, PortalError> {
  let exercise = state.exercises.get(&id).await.ok_or(PortalError::ExerciseNotFound(id))?;
  Ok(Json(exercise_out(&exercise)))
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_update_exercise(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateExerciseIn>,
) -> Result<impl IntoResponse, PortalError> {
  let mut exercise =
    state.exercises.get(&id).await.ok_or(PortalError::ExerciseNotFound(id))?;

  if let Some(title) = body.title {
    let title = title.trim().to_string();
    if title.chars().count() < 3 {
      return Err(PortalError::InvalidInput("title must be at least 3 characters".into()));
    }
    exercise.title = title;
  }
  if let Some(description) = body.description {
    exercise.description = Some(description);
  }
  if let Some(story_seed) = body.story_seed {
    exercise.story_seed = Some(story_seed);
  }
  if let Some(status) = body.status {
    exercise.status = status;
  }

  let saved = state.exercises.save(exercise).await;
  Ok(Json(exercise_out(&saved)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_exercise(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, PortalError> {
  let exercise =
    state.exercises.delete(&id).await.ok_or(PortalError::ExerciseNotFound(id))?;

  // Cascade: document records go with the exercise, rendered files with them.
  let removed = state.documents.delete_for_exercise(&exercise.id).await;
  for record in &removed {
    remove_rendered_file(record.pdf_file_path.as_deref());
  }
  info!(target: "exercise", id = %exercise.id, documents = removed.len(), "Exercise deleted");
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, body), fields(%id, category = body.category.as_str(), answer_len = body.answer.len()))]
pub async fn http_answer_question(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<AnswerIn>,
) -> Result<impl IntoResponse, PortalError> {
  if body.answer.trim().chars().count() < 10 {
    return Err(PortalError::InvalidInput("answer must be at least 10 characters".into()));
  }

  let mut exercise =
    state.exercises.get(&id).await.ok_or(PortalError::ExerciseNotFound(id))?;

  let now = Utc::now();
  if let Some(question) = exercise.questions.iter_mut().find(|q| q.category == body.category) {
    question.answer = Some(body.answer.trim().to_string());
    question.updated_at = now;
  }

  // Answering moves a draft into the intake flow.
  if exercise.status == ExerciseStatus::Draft {
    exercise.status = ExerciseStatus::InProgress;
  }

  let saved = state.exercises.save(exercise).await;
  info!(target: "exercise", id = %saved.id, complete = saved.is_complete(), "Intake answer recorded");
  Ok(Json(exercise_out(&saved)))
}

//
// Documents
//

#[instrument(level = "info")]
pub async fn http_list_document_types() -> impl IntoResponse {
  Json(DocumentType::ALL.iter().map(|t| document_type_info(*t)).collect::<Vec<_>>())
}

#[instrument(level = "info", skip(state, body), fields(%id))]
pub async fn http_generate_documents(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(body): Json<GenerateIn>,
) -> Result<impl IntoResponse, PortalError> {
  let exercise =
    state.exercises.get(&id).await.ok_or(PortalError::ExerciseNotFound(id))?;

  let types = match body.document_types {
    None => None,
    Some(tags) => {
      let mut parsed = Vec::with_capacity(tags.len());
      for tag in tags {
        parsed.push(agents::agent_for_tag(&tag)?.document_type);
      }
      Some(parsed)
    }
  };

  let outcomes = engine::generate_all(&state, &exercise, types).await?;
  info!(target: "document", exercise_id = %exercise.id, count = outcomes.len(), "Batch generation finished");
  Ok(Json(outcomes.iter().map(document_out).collect::<Vec<_>>()))
}

#[instrument(level = "info", skip(state), fields(%id, %tag))]
pub async fn http_generate_single_document(
  State(state): State<Arc<AppState>>,
  Path((id, tag)): Path<(String, String)>,
) -> Result<impl IntoResponse, PortalError> {
  let exercise =
    state.exercises.get(&id).await.ok_or(PortalError::ExerciseNotFound(id))?;
  let document_type = agents::agent_for_tag(&tag)?.document_type;

  let record = engine::generate_document(&state, &exercise, document_type).await?;
  Ok(Json(document_out(&record)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_list_exercise_documents(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, PortalError> {
  let exercise = state.exercises.get(&id).await.ok_or(PortalError::ExerciseNotFound(id))?;
  let records = state.documents.list_for_exercise(&exercise.id).await;
  Ok(Json(records.iter().map(document_summary_out).collect::<Vec<_>>()))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_document(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, PortalError> {
  let record = state.documents.get(&id).await.ok_or(PortalError::DocumentNotFound(id))?;
  Ok(Json(document_out(&record)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_download_document(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, PortalError> {
  let record = state.documents.get(&id).await.ok_or(PortalError::DocumentNotFound(id.clone()))?;
  let path = record.pdf_file_path.as_deref().ok_or(PortalError::FileUnavailable(id.clone()))?;

  let bytes = tokio::fs::read(path).await.map_err(|_| PortalError::FileUnavailable(id))?;
  let filename = record.title.as_deref().unwrap_or("document");
  let disposition = format!("attachment; filename=\"{}.pdf\"", filename.replace('"', ""));

  Ok((
    [
      (header::CONTENT_TYPE, "application/pdf".to_string()),
      (header::CONTENT_DISPOSITION, disposition),
    ],
    bytes,
  ))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_regenerate_document(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, PortalError> {
  let record = state.documents.get(&id).await.ok_or(PortalError::DocumentNotFound(id))?;
  let updated = engine::regenerate_document(&state, &record).await?;
  Ok(Json(document_out(&updated)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_document(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, PortalError> {
  let record = state.documents.delete(&id).await.ok_or(PortalError::DocumentNotFound(id))?;
  remove_rendered_file(record.pdf_file_path.as_deref());
  info!(target: "document", id = %record.id, "Document deleted");
  Ok(StatusCode::NO_CONTENT)
}

fn remove_rendered_file(path: Option<&str>) {
  if let Some(path) = path {
    if std::path::Path::new(path).exists() {
      if let Err(e) = std::fs::remove_file(path) {
        warn!(target: "document", %path, error = %e, "Could not remove rendered file");
      }
    }
  }
}
