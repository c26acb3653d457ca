//! Loading portal configuration (intake question overrides + output paths)
//! from TOML.
//!
//! See `PortalConfig` for the expected schema. Everything is optional; the
//! built-in question texts and `./generated_pdfs` are used when absent.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::IntakeCategory;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PortalConfig {
  #[serde(default)]
  pub questions: QuestionTexts,
  #[serde(default)]
  pub output: OutputConfig,
}

/// Per-category overrides for the four intake question texts.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuestionTexts {
  #[serde(default)] pub overview: Option<String>,
  #[serde(default)] pub challenges: Option<String>,
  #[serde(default)] pub twists: Option<String>,
  #[serde(default)] pub conclusion: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct OutputConfig {
  #[serde(default)] pub pdf_dir: Option<PathBuf>,
}

impl PortalConfig {
  /// Overridden question texts, one entry per category that has one.
  pub fn question_overrides(&self) -> Vec<(IntakeCategory, String)> {
    let q = &self.questions;
    [
      (IntakeCategory::Overview, &q.overview),
      (IntakeCategory::Challenges, &q.challenges),
      (IntakeCategory::Twists, &q.twists),
      (IntakeCategory::Conclusion, &q.conclusion),
    ]
    .into_iter()
    .filter_map(|(cat, text)| text.as_ref().map(|t| (cat, t.clone())))
    .collect()
  }

  /// Where rendered PDFs land. Resolution order: PDF_OUTPUT_DIR env var,
  /// then the TOML `output.pdf_dir`, then `./generated_pdfs`.
  pub fn pdf_output_dir(&self) -> PathBuf {
    if let Ok(dir) = std::env::var("PDF_OUTPUT_DIR") {
      return PathBuf::from(dir);
    }
    self
      .output
      .pdf_dir
      .clone()
      .unwrap_or_else(|| PathBuf::from("./generated_pdfs"))
  }
}

/// Attempt to load `PortalConfig` from PORTAL_CONFIG_PATH. On any parsing/IO
/// error, returns None and the defaults apply.
pub fn load_portal_config_from_env() -> Option<PortalConfig> {
  let path = std::env::var("PORTAL_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<PortalConfig>(&s) {
      Ok(cfg) => {
        info!(target: "tabletop_portal", %path, "Loaded portal config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "tabletop_portal", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "tabletop_portal", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
