//! Document generation agents.
//!
//! Each document type has one agent. An agent is static data (a persona, a
//! purpose label, and a content-guideline outline) plus the prompt assembly
//! shared by every type. The three prompts (description, content, learning
//! goals) and the title are pure functions of the exercise snapshot.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::domain::{DocumentType, Exercise};
use crate::error::PortalError;
use crate::util::fill_template;

mod after_action;
mod assessment_rubric;
mod facilitator_guide;
mod inject_cards;
mod participant_handbook;
mod scenario_brief;

/// Static description of one document-type agent.
#[derive(Debug)]
pub struct DocumentAgent {
  /// Diagnostic name recorded on generated documents.
  pub name: &'static str,
  pub document_type: DocumentType,
  /// Persona paragraph establishing the model's expert voice.
  pub role: &'static str,
  /// Human-readable document name, used inside the prompts.
  pub purpose: &'static str,
  /// Required-section outline for the content prompt.
  pub guidelines: &'static str,
}

const DESCRIPTION_PROMPT_TPL: &str = "\
{role}

Based on the following tabletop exercise information, write a brief description
(2-3 sentences) of what this {purpose} will contain and how it
will be used.

{context}

Write ONLY the description, nothing else.
";

const CONTENT_PROMPT_TPL: &str = "\
{role}

Based on the following tabletop exercise information, create the main content
for a {purpose}.

{context}

{guidelines}

Create comprehensive, well-structured content. Use markdown formatting.
";

const LEARNING_GOALS_PROMPT_TPL: &str = "\
{role}

Based on the following tabletop exercise information, create a list of
learning goals for this {purpose}.

{context}

Create 4-6 specific, measurable learning objectives. Format as a numbered list.
Each goal should describe what participants will learn, understand, or be able to do.
";

impl DocumentAgent {
  /// Render the exercise into the plain-text block shared by all three
  /// prompts. Unanswered intake questions are omitted; answered ones keep
  /// their declared category order.
  pub fn build_context(&self, exercise: &Exercise) -> String {
    let mut parts: Vec<String> = vec![
      format!("# Tabletop Exercise: {}", exercise.title),
      String::new(),
    ];

    if let Some(desc) = exercise.description.as_deref().filter(|d| !d.trim().is_empty()) {
      parts.push("## Description".to_string());
      parts.push(desc.to_string());
      parts.push(String::new());
    }

    if let Some(seed) = exercise.story_seed.as_deref().filter(|s| !s.trim().is_empty()) {
      parts.push("## Initial Story Seed".to_string());
      parts.push(seed.to_string());
      parts.push(String::new());
    }

    for question in &exercise.questions {
      if let Some(answer) = question.answer.as_deref().filter(|a| !a.trim().is_empty()) {
        parts.push(format!("## {}", question.category.label()));
        parts.push(format!("**Question:** {}", question.question_text));
        parts.push(String::new());
        parts.push(format!("**Answer:** {}", answer));
        parts.push(String::new());
      }
    }

    parts.join("\n")
  }

  pub fn description_prompt(&self, exercise: &Exercise) -> String {
    fill_template(
      DESCRIPTION_PROMPT_TPL,
      &[("role", self.role), ("purpose", self.purpose), ("context", &self.build_context(exercise))],
    )
  }

  pub fn content_prompt(&self, exercise: &Exercise) -> String {
    fill_template(
      CONTENT_PROMPT_TPL,
      &[
        ("role", self.role),
        ("purpose", self.purpose),
        ("context", &self.build_context(exercise)),
        ("guidelines", self.guidelines),
      ],
    )
  }

  pub fn learning_goals_prompt(&self, exercise: &Exercise) -> String {
    fill_template(
      LEARNING_GOALS_PROMPT_TPL,
      &[("role", self.role), ("purpose", self.purpose), ("context", &self.build_context(exercise))],
    )
  }

  /// The only locally computed content field: exercise title plus the
  /// humanized document-type label.
  pub fn title(&self, exercise: &Exercise) -> String {
    format!("{} - {}", exercise.title, self.document_type.label())
  }
}

// Immutable process-wide registry. Built once, never mutated afterwards.
static REGISTRY: Lazy<HashMap<DocumentType, &'static DocumentAgent>> = Lazy::new(|| {
  let agents: [&'static DocumentAgent; 6] = [
    &scenario_brief::AGENT,
    &facilitator_guide::AGENT,
    &participant_handbook::AGENT,
    &inject_cards::AGENT,
    &assessment_rubric::AGENT,
    &after_action::AGENT,
  ];
  agents.iter().map(|a| (a.document_type, *a)).collect()
});

/// Look up the agent responsible for a document type.
pub fn agent_for(document_type: DocumentType) -> Result<&'static DocumentAgent, PortalError> {
  REGISTRY
    .get(&document_type)
    .copied()
    .ok_or_else(|| PortalError::UnregisteredDocumentType(document_type.as_str().to_string()))
}

/// String-tag resolution for the HTTP boundary. Unknown tags fail with a
/// configuration error before anything else happens.
pub fn agent_for_tag(tag: &str) -> Result<&'static DocumentAgent, PortalError> {
  match DocumentType::parse(tag) {
    Some(t) => agent_for(t),
    None => Err(PortalError::UnregisteredDocumentType(tag.to_string())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::IntakeCategory;

  fn sample_exercise() -> Exercise {
    let mut ex = Exercise::new(
      "Clinic Blackout".into(),
      Some("A regional hospital scenario.".into()),
      Some("The lights cut out during shift change.".into()),
      &[],
    );
    for (cat, text) in [
      (IntakeCategory::Overview, "A hospital runs on backup power."),
      (IntakeCategory::Challenges, "Prioritize patients without monitoring."),
      (IntakeCategory::Twists, "Fuel delivery is delayed by a storm."),
      (IntakeCategory::Conclusion, "Grid power returns after twelve hours."),
    ] {
      let q = ex.questions.iter_mut().find(|q| q.category == cat).unwrap();
      q.answer = Some(text.to_string());
    }
    ex
  }

  #[test]
  fn every_document_type_resolves() {
    for t in DocumentType::ALL {
      let agent = agent_for(t).expect("registered agent");
      assert_eq!(agent.document_type, t);
      assert!(!agent.role.trim().is_empty());
      assert!(!agent.guidelines.trim().is_empty());
    }
  }

  #[test]
  fn unknown_tag_is_a_configuration_error() {
    let err = agent_for_tag("press_release").unwrap_err();
    assert!(matches!(err, PortalError::UnregisteredDocumentType(_)));
  }

  #[test]
  fn prompts_are_deterministic_over_a_snapshot() {
    let ex = sample_exercise();
    for t in DocumentType::ALL {
      let agent = agent_for(t).unwrap();
      assert_eq!(agent.build_context(&ex), agent.build_context(&ex));
      assert_eq!(agent.description_prompt(&ex), agent.description_prompt(&ex));
      assert_eq!(agent.content_prompt(&ex), agent.content_prompt(&ex));
      assert_eq!(agent.learning_goals_prompt(&ex), agent.learning_goals_prompt(&ex));
      assert_eq!(agent.title(&ex), agent.title(&ex));
    }
  }

  #[test]
  fn context_omits_unanswered_categories_and_keeps_order() {
    let mut ex = sample_exercise();
    let q = ex.questions.iter_mut().find(|q| q.category == IntakeCategory::Twists).unwrap();
    q.answer = None;

    let agent = agent_for(DocumentType::ScenarioBrief).unwrap();
    let ctx = agent.build_context(&ex);

    assert!(!ctx.contains("## Twists"));
    let overview = ctx.find("## Overview").unwrap();
    let challenges = ctx.find("## Challenges").unwrap();
    let conclusion = ctx.find("## Conclusion").unwrap();
    assert!(overview < challenges && challenges < conclusion);
  }

  #[test]
  fn context_skips_empty_description_and_seed() {
    let ex = Exercise::new("Bare".into(), Some("  ".into()), None, &[]);
    let agent = agent_for(DocumentType::InjectCards).unwrap();
    let ctx = agent.build_context(&ex);
    assert!(ctx.starts_with("# Tabletop Exercise: Bare"));
    assert!(!ctx.contains("## Description"));
    assert!(!ctx.contains("## Initial Story Seed"));
  }

  #[test]
  fn title_combines_exercise_title_and_type_label() {
    let ex = sample_exercise();
    let agent = agent_for(DocumentType::AfterActionTemplate).unwrap();
    assert_eq!(agent.title(&ex), "Clinic Blackout - After Action Template");
  }

  #[test]
  fn content_prompt_carries_persona_context_and_guidelines() {
    let ex = sample_exercise();
    let agent = agent_for(DocumentType::FacilitatorGuide).unwrap();
    let prompt = agent.content_prompt(&ex);
    assert!(prompt.starts_with(agent.role));
    assert!(prompt.contains("# Tabletop Exercise: Clinic Blackout"));
    assert!(prompt.contains(agent.guidelines));
    assert!(prompt.contains("Facilitator Guide"));
  }
}
