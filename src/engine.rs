//! Document generation engine.
//!
//! One generation run for an (exercise, document type) pair:
//!   1. resolve the agent (configuration error aborts before any mutation)
//!   2. upsert the record into GENERATING and persist the transition
//!   3. issue the three prompts sequentially, then render the PDF
//!   4. assign the assembled bundle and complete, or fold the first failure
//!      into status FAILED with its message
//!
//! The three backend calls run strictly one after another; a failure aborts
//! the remaining calls for this document. Content fields on the record are
//! only overwritten by a fully successful attempt, so a failed regeneration
//! keeps the previous document intact apart from status and error message.
//!
//! Concurrency: the GENERATING status is informational, not a lock. Two
//! overlapping runs for the same pair both write the same record and the
//! later terminal write wins. Callers that need mutual exclusion must
//! serialize outside the engine.

use chrono::Utc;
use tracing::{error, info, instrument};

use crate::agents::{agent_for, DocumentAgent};
use crate::domain::{DocumentRecord, DocumentStatus, DocumentType, Exercise};
use crate::error::PortalError;
use crate::state::AppState;

/// Everything a successful attempt produces, assembled before any of it is
/// written to the record.
struct ContentBundle {
  title: String,
  description: String,
  content: String,
  learning_goals: String,
  pdf_file_path: String,
}

/// Generate one document for an exercise. The returned record is the
/// persisted outcome (COMPLETED or FAILED), except for configuration and
/// precondition errors, which abort before any record exists.
#[instrument(level = "info", skip(state, exercise), fields(exercise_id = %exercise.id, document_type = document_type.as_str()))]
pub async fn generate_document(
  state: &AppState,
  exercise: &Exercise,
  document_type: DocumentType,
) -> Result<DocumentRecord, PortalError> {
  let missing = exercise.missing_categories();
  if !missing.is_empty() {
    return Err(PortalError::IncompleteIntake { missing });
  }
  run_generation(state, exercise, document_type).await
}

/// Generate a set of documents sequentially, defaulting to all six types.
/// A FAILED outcome for one type never aborts the remaining types; the full
/// outcome list comes back in request order.
#[instrument(level = "info", skip(state, exercise, document_types), fields(exercise_id = %exercise.id))]
pub async fn generate_all(
  state: &AppState,
  exercise: &Exercise,
  document_types: Option<Vec<DocumentType>>,
) -> Result<Vec<DocumentRecord>, PortalError> {
  let missing = exercise.missing_categories();
  if !missing.is_empty() {
    return Err(PortalError::IncompleteIntake { missing });
  }

  let types = document_types.unwrap_or_else(|| DocumentType::ALL.to_vec());
  let mut outcomes = Vec::with_capacity(types.len());
  for document_type in types {
    outcomes.push(run_generation(state, exercise, document_type).await?);
  }
  Ok(outcomes)
}

/// Regenerate an existing record: resolve the owning exercise and re-enter
/// the same upsert path, so the pair can never grow a second record.
#[instrument(level = "info", skip(state, record), fields(document_id = %record.id, document_type = record.document_type.as_str()))]
pub async fn regenerate_document(
  state: &AppState,
  record: &DocumentRecord,
) -> Result<DocumentRecord, PortalError> {
  let exercise = state
    .exercises
    .get(&record.exercise_id)
    .await
    .ok_or_else(|| PortalError::ExerciseNotFound(record.exercise_id.clone()))?;
  generate_document(state, &exercise, record.document_type).await
}

async fn run_generation(
  state: &AppState,
  exercise: &Exercise,
  document_type: DocumentType,
) -> Result<DocumentRecord, PortalError> {
  // Registry miss is fatal and must leave no trace.
  let agent = agent_for(document_type)?;

  // Persist the transitional state before any backend work so concurrent
  // readers see the run in progress.
  let mut record = state.documents.upsert_generating(&exercise.id, document_type).await;
  record.agent_name = Some(agent.name.to_string());

  match run_pipeline(state, agent, exercise).await {
    Ok(bundle) => {
      record.title = Some(bundle.title);
      record.description = Some(bundle.description);
      record.content = Some(bundle.content);
      record.learning_goals = Some(bundle.learning_goals);
      record.pdf_file_path = Some(bundle.pdf_file_path);
      record.status = DocumentStatus::Completed;
      record.generated_at = Some(Utc::now());
      info!(target: "document", id = %record.id, document_type = document_type.as_str(), "Document generation completed");
    }
    Err(message) => {
      record.status = DocumentStatus::Failed;
      record.error_message = Some(message.clone());
      error!(target: "document", id = %record.id, document_type = document_type.as_str(), error = %message, "Document generation failed");
    }
  }

  Ok(state.documents.save(record).await)
}

/// The three-call pipeline plus rendering. Returns the full bundle or the
/// first failure's message; nothing is written to the record in here.
async fn run_pipeline(
  state: &AppState,
  agent: &DocumentAgent,
  exercise: &Exercise,
) -> Result<ContentBundle, String> {
  let title = agent.title(exercise);

  let description = state.generator.generate(&agent.description_prompt(exercise)).await?;
  let content = state.generator.generate(&agent.content_prompt(exercise)).await?;
  let learning_goals = state.generator.generate(&agent.learning_goals_prompt(exercise)).await?;

  let path = state.renderer.render(&title, &description, &content, &learning_goals)?;

  Ok(ContentBundle {
    title,
    description,
    content,
    learning_goals,
    pdf_file_path: path.to_string_lossy().into_owned(),
  })
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use async_trait::async_trait;

  use super::*;
  use crate::config::PortalConfig;
  use crate::llm::TextGenerator;
  use crate::render::{DocumentRenderer, PdfRenderer};

  /// Counts calls; fails the n-th call (1-based) when configured, and fails
  /// every call whose prompt contains `poison`.
  struct ScriptedGenerator {
    calls: AtomicUsize,
    fail_on_call: Option<usize>,
    poison: Option<&'static str>,
  }

  impl ScriptedGenerator {
    fn ok() -> Self {
      Self { calls: AtomicUsize::new(0), fail_on_call: None, poison: None }
    }
    fn failing_on(n: usize) -> Self {
      Self { calls: AtomicUsize::new(0), fail_on_call: Some(n), poison: None }
    }
    fn poisoned(marker: &'static str) -> Self {
      Self { calls: AtomicUsize::new(0), fail_on_call: None, poison: Some(marker) }
    }
  }

  #[async_trait]
  impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, String> {
      let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      if self.fail_on_call == Some(n) {
        return Err("backend down".to_string());
      }
      if let Some(marker) = self.poison {
        if prompt.contains(marker) {
          return Err(format!("backend refused: {marker}"));
        }
      }
      Ok(format!("generated text #{n}"))
    }
  }

  struct FakeRenderer;

  impl DocumentRenderer for FakeRenderer {
    fn render(&self, title: &str, _d: &str, _c: &str, _g: &str) -> Result<PathBuf, String> {
      Ok(PathBuf::from(format!("/tmp/{}.pdf", title.replace(' ', "_"))))
    }
  }

  struct FailingRenderer;

  impl DocumentRenderer for FailingRenderer {
    fn render(&self, _t: &str, _d: &str, _c: &str, _g: &str) -> Result<PathBuf, String> {
      Err("render exploded".to_string())
    }
  }

  fn state_with(generator: impl TextGenerator + 'static, renderer: impl DocumentRenderer + 'static) -> AppState {
    AppState::with_backends(PortalConfig::default(), Arc::new(generator), Arc::new(renderer))
  }

  fn complete_exercise(title: &str) -> Exercise {
    let mut ex = Exercise::new(title.to_string(), None, None, &[]);
    for q in &mut ex.questions {
      q.answer = Some(format!("Answer for {}", q.category.as_str()));
    }
    ex
  }

  #[tokio::test]
  async fn incomplete_exercise_is_rejected_before_any_record() {
    let state = state_with(ScriptedGenerator::ok(), FakeRenderer);
    let ex = Exercise::new("Half Done".into(), None, None, &[]);
    state.exercises.insert(ex.clone()).await;

    let err = generate_document(&state, &ex, DocumentType::ScenarioBrief).await.unwrap_err();
    assert!(matches!(err, PortalError::IncompleteIntake { .. }));
    assert!(state.documents.list_for_exercise(&ex.id).await.is_empty());

    let err = generate_all(&state, &ex, None).await.unwrap_err();
    assert!(matches!(err, PortalError::IncompleteIntake { .. }));
    assert!(state.documents.list_for_exercise(&ex.id).await.is_empty());
  }

  #[tokio::test]
  async fn successful_generation_completes_the_record() {
    let state = state_with(ScriptedGenerator::ok(), FakeRenderer);
    let ex = complete_exercise("Clinic Blackout");
    state.exercises.insert(ex.clone()).await;

    let record = generate_document(&state, &ex, DocumentType::ScenarioBrief).await.unwrap();
    assert_eq!(record.status, DocumentStatus::Completed);
    assert_eq!(record.title.as_deref(), Some("Clinic Blackout - Scenario Brief"));
    assert_eq!(record.agent_name.as_deref(), Some("ScenarioBriefAgent"));
    assert!(record.description.is_some());
    assert!(record.content.is_some());
    assert!(record.learning_goals.is_some());
    assert!(record.pdf_file_path.as_deref().unwrap().ends_with(".pdf"));
    assert!(record.generated_at.is_some());
  }

  #[tokio::test]
  async fn generating_twice_upserts_the_same_record() {
    let state = state_with(ScriptedGenerator::ok(), FakeRenderer);
    let ex = complete_exercise("Repeat Run");
    state.exercises.insert(ex.clone()).await;

    let first = generate_document(&state, &ex, DocumentType::InjectCards).await.unwrap();
    let second = generate_document(&state, &ex, DocumentType::InjectCards).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(state.documents.list_for_exercise(&ex.id).await.len(), 1);
    // the scripted generator numbers its responses, so a full replacement is visible
    assert_ne!(first.description, second.description);
  }

  #[tokio::test]
  async fn backend_failure_is_folded_into_a_failed_record() {
    let state = state_with(ScriptedGenerator::failing_on(2), FakeRenderer);
    let ex = complete_exercise("Flaky Backend");
    state.exercises.insert(ex.clone()).await;

    let record = generate_document(&state, &ex, DocumentType::ScenarioBrief).await.unwrap();
    assert_eq!(record.status, DocumentStatus::Failed);
    assert_eq!(record.error_message.as_deref(), Some("backend down"));
    // a first-attempt failure writes no content fields at all
    assert!(record.title.is_none());
    assert!(record.description.is_none());
    assert!(record.content.is_none());
    assert!(record.learning_goals.is_none());
    assert!(record.pdf_file_path.is_none());
    assert!(record.generated_at.is_none());
  }

  #[tokio::test]
  async fn render_failure_is_treated_like_a_generation_failure() {
    let state = state_with(ScriptedGenerator::ok(), FailingRenderer);
    let ex = complete_exercise("Bad Renderer");
    state.exercises.insert(ex.clone()).await;

    let record = generate_document(&state, &ex, DocumentType::AssessmentRubric).await.unwrap();
    assert_eq!(record.status, DocumentStatus::Failed);
    assert_eq!(record.error_message.as_deref(), Some("render exploded"));
  }

  #[tokio::test]
  async fn failed_regeneration_keeps_the_previous_content_fields() {
    let state = state_with(ScriptedGenerator::ok(), FakeRenderer);
    let ex = complete_exercise("Keep Fields");
    state.exercises.insert(ex.clone()).await;

    let completed = generate_document(&state, &ex, DocumentType::FacilitatorGuide).await.unwrap();
    assert_eq!(completed.status, DocumentStatus::Completed);

    // regenerate against a backend that dies on its first call
    let state = AppState {
      generator: Arc::new(ScriptedGenerator::failing_on(1)),
      ..state
    };
    let failed = regenerate_document(&state, &completed).await.unwrap();

    assert_eq!(failed.id, completed.id);
    assert_eq!(failed.status, DocumentStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("backend down"));
    // everything except status/error/updated_at survives from the last success
    assert_eq!(failed.title, completed.title);
    assert_eq!(failed.description, completed.description);
    assert_eq!(failed.content, completed.content);
    assert_eq!(failed.learning_goals, completed.learning_goals);
    assert_eq!(failed.pdf_file_path, completed.pdf_file_path);
    assert_eq!(failed.generated_at, completed.generated_at);
  }

  #[tokio::test]
  async fn batch_keeps_going_past_a_failed_type() {
    // the poisoned backend rejects every prompt for the Inject Cards agent
    let state = state_with(ScriptedGenerator::poisoned("Inject Cards"), FakeRenderer);
    let ex = complete_exercise("Partial Batch");
    state.exercises.insert(ex.clone()).await;

    let outcomes = generate_all(&state, &ex, None).await.unwrap();
    assert_eq!(outcomes.len(), 6);
    assert_eq!(
      outcomes.iter().map(|r| r.document_type).collect::<Vec<_>>(),
      DocumentType::ALL.to_vec()
    );

    let failed: Vec<_> =
      outcomes.iter().filter(|r| r.status == DocumentStatus::Failed).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].document_type, DocumentType::InjectCards);
    assert!(failed[0].error_message.as_deref().unwrap().contains("backend refused"));
    assert_eq!(
      outcomes.iter().filter(|r| r.status == DocumentStatus::Completed).count(),
      5
    );
  }

  #[tokio::test]
  async fn full_batch_with_real_renderer_ends_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(ScriptedGenerator::ok(), PdfRenderer::new(dir.path()));
    let ex = complete_exercise("Clinic Blackout");
    state.exercises.insert(ex.clone()).await;

    let outcomes = generate_all(&state, &ex, None).await.unwrap();
    assert_eq!(outcomes.len(), 6);
    for record in &outcomes {
      assert_eq!(record.status, DocumentStatus::Completed);
      let expected_title =
        format!("Clinic Blackout - {}", record.document_type.label());
      assert_eq!(record.title.as_deref(), Some(expected_title.as_str()));
      assert!(record.description.is_some());
      assert!(record.content.is_some());
      assert!(record.learning_goals.is_some());
      let path = record.pdf_file_path.as_deref().unwrap();
      assert!(path.ends_with(".pdf"));
      assert!(std::path::Path::new(path).exists());
    }
  }

  #[tokio::test]
  async fn explicit_type_subset_preserves_request_order() {
    let state = state_with(ScriptedGenerator::ok(), FakeRenderer);
    let ex = complete_exercise("Subset");
    state.exercises.insert(ex.clone()).await;

    let requested = vec![DocumentType::AfterActionTemplate, DocumentType::ScenarioBrief];
    let outcomes = generate_all(&state, &ex, Some(requested.clone())).await.unwrap();
    assert_eq!(outcomes.iter().map(|r| r.document_type).collect::<Vec<_>>(), requested);
  }

  #[tokio::test]
  async fn regenerating_a_missing_exercise_is_not_found() {
    let state = state_with(ScriptedGenerator::ok(), FakeRenderer);
    let orphan = DocumentRecord::new("gone", DocumentType::ScenarioBrief);
    let err = regenerate_document(&state, &orphan).await.unwrap_err();
    assert!(matches!(err, PortalError::ExerciseNotFound(_)));
  }
}
