//! Application state: stores, intake question texts, generation backend, and
//! renderer.
//!
//! `AppState::new` wires the production backends from env/config; tests build
//! the same state with their own fakes through `with_backends`.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::{load_portal_config_from_env, PortalConfig};
use crate::domain::IntakeCategory;
use crate::llm::{OpenAI, StubGenerator, TextGenerator};
use crate::render::{DocumentRenderer, PdfRenderer};
use crate::store::{DocumentStore, ExerciseStore};

#[derive(Clone)]
pub struct AppState {
    pub exercises: ExerciseStore,
    pub documents: DocumentStore,
    pub generator: Arc<dyn TextGenerator>,
    pub renderer: Arc<dyn DocumentRenderer>,
    /// Question-text overrides from config; empty means built-in defaults.
    pub question_texts: Vec<(IntakeCategory, String)>,
}

impl AppState {
    /// Build state from env: load config, pick the generation backend, set up
    /// the PDF renderer.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_portal_config_from_env().unwrap_or_default();

        let generator: Arc<dyn TextGenerator> = match OpenAI::from_env() {
            Some(oa) => {
                info!(target: "tabletop_portal", base_url = %oa.base_url, model = %oa.model, "OpenAI enabled.");
                Arc::new(oa)
            }
            None => {
                info!(target: "tabletop_portal", "OpenAI disabled (no OPENAI_API_KEY). Using stub generator.");
                Arc::new(StubGenerator)
            }
        };

        let pdf_dir = config.pdf_output_dir();
        info!(target: "tabletop_portal", pdf_dir = %pdf_dir.display(), "PDF output directory");
        let renderer: Arc<dyn DocumentRenderer> = Arc::new(PdfRenderer::new(pdf_dir));

        Self::with_backends(config, generator, renderer)
    }

    /// Assemble state around explicit backends.
    pub fn with_backends(
        config: PortalConfig,
        generator: Arc<dyn TextGenerator>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            exercises: ExerciseStore::default(),
            documents: DocumentStore::default(),
            generator,
            renderer,
            question_texts: config.question_overrides(),
        }
    }
}
