//! Public request/response structs for the HTTP API (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    DocumentRecord, DocumentStatus, DocumentType, Exercise, ExerciseStatus, IntakeCategory,
    IntakeQuestion,
};

//
// Exercise DTOs
//

#[derive(Debug, Deserialize)]
pub struct CreateExerciseIn {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub story_seed: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateExerciseIn {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub story_seed: Option<String>,
    #[serde(default)]
    pub status: Option<ExerciseStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerIn {
    pub category: IntakeCategory,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub category: IntakeCategory,
    pub question_text: String,
    pub answer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ExerciseOut {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub story_seed: Option<String>,
    pub status: ExerciseStatus,
    pub is_complete: bool,
    pub questions: Vec<QuestionOut>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ExerciseSummaryOut {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: ExerciseStatus,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
}

//
// Document DTOs
//

#[derive(Debug, Deserialize)]
pub struct GenerateIn {
    /// Tags from the closed document-type set; omitted means all six.
    /// Unknown tags are rejected as a configuration error.
    #[serde(default)]
    pub document_types: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct DocumentOut {
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

#[derive(Debug, Serialize)]
pub struct DocumentSummaryOut {
    pub id: String,
    pub exercise_id: String,
    pub document_type: DocumentType,
    pub status: DocumentStatus,
    pub title: Option<String>,
    pub pdf_file_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DocumentTypeInfoOut {
    #[serde(rename = "type")]
    pub tag: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

//
// Converters from internal models to the public DTOs.
//

fn question_out(q: &IntakeQuestion) -> QuestionOut {
    QuestionOut {
        category: q.category,
        question_text: q.question_text.clone(),
        answer: q.answer.clone(),
        created_at: q.created_at,
        updated_at: q.updated_at,
    }
}

pub fn exercise_out(ex: &Exercise) -> ExerciseOut {
    ExerciseOut {
        id: ex.id.clone(),
        title: ex.title.clone(),
        description: ex.description.clone(),
        story_seed: ex.story_seed.clone(),
        status: ex.status,
        is_complete: ex.is_complete(),
        questions: ex.questions.iter().map(question_out).collect(),
        created_at: ex.created_at,
        updated_at: ex.updated_at,
    }
}

pub fn exercise_summary_out(ex: &Exercise) -> ExerciseSummaryOut {
    ExerciseSummaryOut {
        id: ex.id.clone(),
        title: ex.title.clone(),
        description: ex.description.clone(),
        status: ex.status,
        is_complete: ex.is_complete(),
        created_at: ex.created_at,
    }
}

pub fn document_out(record: &DocumentRecord) -> DocumentOut {
    DocumentOut {
        id: record.id.clone(),
        exercise_id: record.exercise_id.clone(),
        document_type: record.document_type,
        status: record.status,
        agent_name: record.agent_name.clone(),
        title: record.title.clone(),
        description: record.description.clone(),
        content: record.content.clone(),
        learning_goals: record.learning_goals.clone(),
        pdf_file_path: record.pdf_file_path.clone(),
        error_message: record.error_message.clone(),
        created_at: record.created_at,
        updated_at: record.updated_at,
        generated_at: record.generated_at,
    }
}

pub fn document_summary_out(record: &DocumentRecord) -> DocumentSummaryOut {
    DocumentSummaryOut {
        id: record.id.clone(),
        exercise_id: record.exercise_id.clone(),
        document_type: record.document_type,
        status: record.status,
        title: record.title.clone(),
        pdf_file_path: record.pdf_file_path.clone(),
        created_at: record.created_at,
    }
}

pub fn document_type_info(t: DocumentType) -> DocumentTypeInfoOut {
    DocumentTypeInfoOut { tag: t.as_str(), name: t.label(), description: t.summary() }
}
