//! Domain models used by the backend: exercises, intake questions, document
//! types/statuses, and the per-(exercise, type) document record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a tabletop exercise. User-managed metadata; the generation
/// pipeline never consults it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseStatus {
  Draft,
  InProgress,
  Completed,
  Archived,
}

impl Default for ExerciseStatus {
  fn default() -> Self { ExerciseStatus::Draft }
}

/// The four fixed intake categories, in the order they are asked and the
/// order they appear in generated prompt context.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IntakeCategory {
  Overview,
  Challenges,
  Twists,
  Conclusion,
}

impl IntakeCategory {
  pub const ALL: [IntakeCategory; 4] = [
    IntakeCategory::Overview,
    IntakeCategory::Challenges,
    IntakeCategory::Twists,
    IntakeCategory::Conclusion,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      IntakeCategory::Overview => "overview",
      IntakeCategory::Challenges => "challenges",
      IntakeCategory::Twists => "twists",
      IntakeCategory::Conclusion => "conclusion",
    }
  }

  /// Heading used in prompt context blocks.
  pub fn label(&self) -> &'static str {
    match self {
      IntakeCategory::Overview => "Overview",
      IntakeCategory::Challenges => "Challenges",
      IntakeCategory::Twists => "Twists",
      IntakeCategory::Conclusion => "Conclusion",
    }
  }

  /// Built-in question text for this category. Overridable via TOML config.
  pub fn default_question(&self) -> &'static str {
    match self {
      IntakeCategory::Overview => {
        "Describe the game's overview and scenario. What is the setting, \
         who are the main characters or factions, and what is the central narrative? \
         Examples: A Lord of the Rings quest following elves to the boats dealing with orcs; \
         A hospital operating without power and running out of batteries; \
         A region facing critical infrastructure failure."
      }
      IntakeCategory::Challenges => {
        "What are the main issues, problems, and challenges that players will need to address? \
         List the key decisions they'll have to make and obstacles they'll need to overcome."
      }
      IntakeCategory::Twists => {
        "What unexpected events, information, or twists will be thrown at the players during the exercise? \
         These should challenge their assumptions and force them to adapt their strategies."
      }
      IntakeCategory::Conclusion => {
        "What is the expected or ideal conclusion of the game? \
         Describe the learning outcomes, resolution scenarios, and how success should be measured."
      }
    }
  }
}

/// One intake question/answer pair. The question text is system-supplied and
/// immutable after creation; the answer stays `None` until the user responds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntakeQuestion {
  pub category: IntakeCategory,
  pub question_text: String,
  pub answer: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl IntakeQuestion {
  pub fn is_answered(&self) -> bool {
    self.answer.as_deref().map(|a| !a.trim().is_empty()).unwrap_or(false)
  }
}

/// A tabletop exercise: the unit all documents are generated for.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Exercise {
  pub id: String,
  pub title: String,
  pub description: Option<String>,
  pub story_seed: Option<String>,
  pub status: ExerciseStatus,
  pub questions: Vec<IntakeQuestion>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Exercise {
  /// Build a fresh exercise with one unanswered question per category.
  pub fn new(
    title: String,
    description: Option<String>,
    story_seed: Option<String>,
    question_texts: &[(IntakeCategory, String)],
  ) -> Self {
    let now = Utc::now();
    let questions = IntakeCategory::ALL
      .iter()
      .map(|cat| {
        let text = question_texts
          .iter()
          .find(|(c, _)| c == cat)
          .map(|(_, t)| t.clone())
          .unwrap_or_else(|| cat.default_question().to_string());
        IntakeQuestion {
          category: *cat,
          question_text: text,
          answer: None,
          created_at: now,
          updated_at: now,
        }
      })
      .collect();

    Self {
      id: Uuid::new_v4().to_string(),
      title,
      description,
      story_seed,
      status: ExerciseStatus::Draft,
      questions,
      created_at: now,
      updated_at: now,
    }
  }

  pub fn question(&self, category: IntakeCategory) -> Option<&IntakeQuestion> {
    self.questions.iter().find(|q| q.category == category)
  }

  /// Derived predicate: all four categories carry a non-empty answer.
  /// Recomputed from current answers on every call, never stored.
  pub fn is_complete(&self) -> bool {
    self.missing_categories().is_empty()
  }

  /// Categories still lacking a non-empty answer, in declared order.
  pub fn missing_categories(&self) -> Vec<IntakeCategory> {
    IntakeCategory::ALL
      .iter()
      .filter(|cat| !self.question(**cat).map(IntakeQuestion::is_answered).unwrap_or(false))
      .copied()
      .collect()
  }
}

/// The six kinds of output document. Closed set: adding a tag requires
/// registering a matching agent in `agents`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
  ScenarioBrief,
  FacilitatorGuide,
  ParticipantHandbook,
  InjectCards,
  AssessmentRubric,
  AfterActionTemplate,
}

impl DocumentType {
  pub const ALL: [DocumentType; 6] = [
    DocumentType::ScenarioBrief,
    DocumentType::FacilitatorGuide,
    DocumentType::ParticipantHandbook,
    DocumentType::InjectCards,
    DocumentType::AssessmentRubric,
    DocumentType::AfterActionTemplate,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      DocumentType::ScenarioBrief => "scenario_brief",
      DocumentType::FacilitatorGuide => "facilitator_guide",
      DocumentType::ParticipantHandbook => "participant_handbook",
      DocumentType::InjectCards => "inject_cards",
      DocumentType::AssessmentRubric => "assessment_rubric",
      DocumentType::AfterActionTemplate => "after_action_template",
    }
  }

  /// Humanized label ("scenario_brief" -> "Scenario Brief"). Used in titles.
  pub fn label(&self) -> &'static str {
    match self {
      DocumentType::ScenarioBrief => "Scenario Brief",
      DocumentType::FacilitatorGuide => "Facilitator Guide",
      DocumentType::ParticipantHandbook => "Participant Handbook",
      DocumentType::InjectCards => "Inject Cards",
      DocumentType::AssessmentRubric => "Assessment Rubric",
      DocumentType::AfterActionTemplate => "After Action Template",
    }
  }

  /// One-line description shown by the document-types listing endpoint.
  pub fn summary(&self) -> &'static str {
    match self {
      DocumentType::ScenarioBrief => "Main scenario overview",
      DocumentType::FacilitatorGuide => "Guide for exercise facilitators",
      DocumentType::ParticipantHandbook => "Materials for participants",
      DocumentType::InjectCards => "Unexpected event cards",
      DocumentType::AssessmentRubric => "Evaluation criteria",
      DocumentType::AfterActionTemplate => "Post-exercise review template",
    }
  }

  /// Fallible string boundary for URL segments and request bodies.
  pub fn parse(tag: &str) -> Option<DocumentType> {
    DocumentType::ALL.iter().find(|t| t.as_str() == tag).copied()
  }
}

/// Lifecycle status of a document record.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
  Generating,
  Completed,
  Failed,
}

/// The persisted outcome of one generation attempt for one
/// (exercise, document type) pair. At most one exists per pair; regeneration
/// overwrites this record in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentRecord {
  pub id: String,
  pub exercise_id: String,
  pub document_type: DocumentType,
  pub status: DocumentStatus,
  pub agent_name: Option<String>,
  pub title: Option<String>,
  pub description: Option<String>,
  pub content: Option<String>,
  pub learning_goals: Option<String>,
  pub pdf_file_path: Option<String>,
  pub error_message: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub generated_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
  /// Fresh record entering the GENERATING state. Content fields start empty;
  /// re-entry on regeneration keeps whatever the prior attempt wrote.
  pub fn new(exercise_id: &str, document_type: DocumentType) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4().to_string(),
      exercise_id: exercise_id.to_string(),
      document_type,
      status: DocumentStatus::Generating,
      agent_name: None,
      title: None,
      description: None,
      content: None,
      learning_goals: None,
      pdf_file_path: None,
      error_message: None,
      created_at: now,
      updated_at: now,
      generated_at: None,
    }
  }
}
