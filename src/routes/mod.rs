//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        // Exercises + intake flow
        .route("/api/v1/exercises", post(http::http_create_exercise).get(http::http_list_exercises))
        .route(
            "/api/v1/exercises/:id",
            get(http::http_get_exercise)
                .put(http::http_update_exercise)
                .delete(http::http_delete_exercise),
        )
        .route("/api/v1/exercises/:id/answers", post(http::http_answer_question))
        // Document generation + lifecycle
        .route("/api/v1/exercises/:id/documents", get(http::http_list_exercise_documents))
        .route("/api/v1/exercises/:id/documents/generate", post(http::http_generate_documents))
        .route(
            "/api/v1/exercises/:id/documents/generate/:tag",
            post(http::http_generate_single_document),
        )
        .route("/api/v1/documents/types", get(http::http_list_document_types))
        .route(
            "/api/v1/documents/:id",
            get(http::http_get_document).delete(http::http_delete_document),
        )
        .route("/api/v1/documents/:id/download", get(http::http_download_document))
        .route("/api/v1/documents/:id/regenerate", post(http::http_regenerate_document))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::PortalConfig;
    use crate::llm::TextGenerator;
    use crate::render::DocumentRenderer;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, String> {
            Ok("drafted text".to_string())
        }
    }

    struct NullRenderer;

    impl DocumentRenderer for NullRenderer {
        fn render(&self, title: &str, _d: &str, _c: &str, _g: &str) -> Result<PathBuf, String> {
            Ok(PathBuf::from(format!("/tmp/{}.pdf", title.replace(' ', "_"))))
        }
    }

    fn test_app() -> Router {
        let state = AppState::with_backends(
            PortalConfig::default(),
            Arc::new(EchoGenerator),
            Arc::new(NullRenderer),
        );
        build_router(Arc::new(state))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = match body {
            Some(v) => Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => Request::builder().method(method).uri(uri).body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    #[tokio::test]
    async fn intake_flow_gates_generation_until_complete() {
        let app = test_app();

        let (status, created) = send(
            &app,
            "POST",
            "/api/v1/exercises",
            Some(json!({ "title": "Clinic Blackout" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["is_complete"], json!(false));
        let id = created["id"].as_str().unwrap().to_string();

        // generation is rejected while intake is incomplete
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/exercises/{id}/documents/generate"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("overview"));

        for category in ["overview", "challenges", "twists", "conclusion"] {
            let (status, _) = send(
                &app,
                "POST",
                &format!("/api/v1/exercises/{id}/answers"),
                Some(json!({ "category": category, "answer": "A long enough intake answer." })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, docs) = send(
            &app,
            "POST",
            &format!("/api/v1/exercises/{id}/documents/generate"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let docs = docs.as_array().unwrap();
        assert_eq!(docs.len(), 6);
        assert!(docs.iter().all(|d| d["status"] == json!("completed")));
        assert_eq!(docs[0]["title"], json!("Clinic Blackout - Scenario Brief"));
    }

    #[tokio::test]
    async fn unknown_document_type_tag_is_rejected() {
        let app = test_app();

        let (_, created) = send(
            &app,
            "POST",
            "/api/v1/exercises",
            Some(json!({ "title": "Tag Check" })),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/exercises/{id}/documents/generate/press_release"),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("press_release"));
    }

    #[tokio::test]
    async fn short_answers_fail_validation() {
        let app = test_app();

        let (_, created) = send(
            &app,
            "POST",
            "/api/v1/exercises",
            Some(json!({ "title": "Validation" })),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/v1/exercises/{id}/answers"),
            Some(json!({ "category": "overview", "answer": "too short" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn document_types_listing_names_all_six() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/v1/documents/types", None).await;
        assert_eq!(status, StatusCode::OK);
        let types = body.as_array().unwrap();
        assert_eq!(types.len(), 6);
        assert_eq!(types[0]["type"], json!("scenario_brief"));
        assert_eq!(types[0]["name"], json!("Scenario Brief"));
    }

    #[tokio::test]
    async fn missing_exercise_is_not_found() {
        let app = test_app();
        let (status, _) = send(&app, "GET", "/api/v1/exercises/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_an_exercise_cascades_to_its_documents() {
        let app = test_app();

        let (_, created) = send(
            &app,
            "POST",
            "/api/v1/exercises",
            Some(json!({ "title": "Cascade" })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        for category in ["overview", "challenges", "twists", "conclusion"] {
            send(
                &app,
                "POST",
                &format!("/api/v1/exercises/{id}/answers"),
                Some(json!({ "category": category, "answer": "A long enough intake answer." })),
            )
            .await;
        }

        let (_, docs) = send(
            &app,
            "POST",
            &format!("/api/v1/exercises/{id}/documents/generate"),
            Some(json!({ "document_types": ["scenario_brief", "inject_cards"] })),
        )
        .await;
        let doc_id = docs.as_array().unwrap()[0]["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/exercises/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", &format!("/api/v1/documents/{doc_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn download_without_a_file_on_disk_is_not_found() {
        let app = test_app();

        let (_, created) = send(
            &app,
            "POST",
            "/api/v1/exercises",
            Some(json!({ "title": "No File" })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        for category in ["overview", "challenges", "twists", "conclusion"] {
            send(
                &app,
                "POST",
                &format!("/api/v1/exercises/{id}/answers"),
                Some(json!({ "category": category, "answer": "A long enough intake answer." })),
            )
            .await;
        }

        let (_, docs) = send(
            &app,
            "POST",
            &format!("/api/v1/exercises/{id}/documents/generate"),
            Some(json!({ "document_types": ["scenario_brief"] })),
        )
        .await;
        let doc_id = docs.as_array().unwrap()[0]["id"].as_str().unwrap();

        // NullRenderer hands back a path that was never written
        let (status, _) =
            send(&app, "GET", &format!("/api/v1/documents/{doc_id}/download"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
