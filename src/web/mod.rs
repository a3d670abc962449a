// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web surface for EcoSort: upload page and classification API

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::classifier::WasteClassifier;
use crate::config::AppConfig;
use crate::taxonomy::WASTE_TAXONOMY;
use crate::EcosortError;

/// Shared application state
pub struct AppState {
    pub classifier: Arc<WasteClassifier>,
    pub config: AppConfig,
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/classify", post(api_classify))
        .route("/api/status", get(api_status))
        .route("/api/taxonomy", get(api_taxonomy))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Handlers ===

async fn index_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

async fn api_classify(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    // Only the "image" field counts; anything else in the form is skipped.
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("image") => break field,
            Ok(Some(_)) => continue,
            Ok(None) => {
                return error_response(StatusCode::BAD_REQUEST, "No image field in upload")
            }
            Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
        }
    };

    let bytes = match field.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    if bytes.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Empty image upload");
    }

    match state.classifier.classify_image(&bytes).await {
        Ok(result) => {
            info!(
                "Classified upload: {} ({:.0}%)",
                result.category,
                result.confidence * 100.0
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => {
            warn!("Upload classification failed: {}", e);
            let status = match e {
                EcosortError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
                EcosortError::InferenceUnavailable(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            error_response(status, &e.to_string())
        }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    ready: bool,
    model: String,
    engine_url: String,
}

async fn api_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        ready: state.classifier.is_ready(),
        model: state.config.engine.model.clone(),
        engine_url: state.config.engine.url.clone(),
    })
}

#[derive(Serialize)]
struct TaxonomyEntryResponse {
    category: String,
    keywords: Vec<&'static str>,
    instructions: &'static str,
}

async fn api_taxonomy() -> Json<Vec<TaxonomyEntryResponse>> {
    let entries = WASTE_TAXONOMY
        .iter()
        .map(|entry| TaxonomyEntryResponse {
            category: entry.category.to_string(),
            keywords: entry.keywords.to_vec(),
            instructions: entry.instructions,
        })
        .collect();
    Json(entries)
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

// === Page ===

const UPLOAD_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>EcoSort</title>
    <style>
        :root {
            --bg-primary: #0f1f17;
            --bg-card: #14362a;
            --text-primary: #e8f5ee;
            --text-secondary: #9ab8a8;
            --accent: #34d399;
            --border: #1f4436;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }
        .container { max-width: 720px; margin: 0 auto; padding: 40px 20px; }
        h1 { color: var(--accent); margin-bottom: 8px; }
        .subtitle { color: var(--text-secondary); margin-bottom: 30px; }
        .card {
            background: var(--bg-card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 24px;
            margin-bottom: 20px;
        }
        input[type=file] { color: var(--text-secondary); }
        button {
            background: var(--accent);
            color: var(--bg-primary);
            border: none;
            border-radius: 8px;
            padding: 10px 24px;
            font-weight: bold;
            cursor: pointer;
            margin-top: 12px;
        }
        pre {
            white-space: pre-wrap;
            color: var(--text-secondary);
            margin-top: 16px;
        }
    </style>
</head>
<body>
    <main class="container">
        <h1>EcoSort</h1>
        <p class="subtitle">Upload a photo of an item to get sorting guidance.</p>
        <div class="card">
            <form id="upload">
                <input type="file" name="image" accept="image/*" required>
                <button type="submit">Classify</button>
            </form>
            <pre id="result"></pre>
        </div>
    </main>
    <script>
        document.getElementById('upload').addEventListener('submit', async (e) => {
            e.preventDefault();
            const data = new FormData(e.target);
            const out = document.getElementById('result');
            out.textContent = 'Analyzing...';
            const resp = await fetch('/api/classify', { method: 'POST', body: data });
            const body = await resp.json();
            if (!resp.ok) {
                out.textContent = 'Error: ' + body.error;
                return;
            }
            out.textContent = body.category + ' (' + Math.round(body.confidence * 100) + '%)\n'
                + body.disposal_instructions + '\n\n' + body.reasoning;
        });
    </script>
</body>
</html>"#;

/// Start the web server
pub async fn start_server(config: AppConfig, classifier: Arc<WasteClassifier>) -> crate::Result<()> {
    let addr = format!("{}:{}", config.web.host, config.web.port);
    let state = Arc::new(AppState { classifier, config });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web UI available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| crate::EcosortError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::tests::FakeEngine;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn test_state(engine: FakeEngine) -> Arc<AppState> {
        Arc::new(AppState {
            classifier: Arc::new(WasteClassifier::new(Arc::new(engine))),
            config: AppConfig::default(),
        })
    }

    #[tokio::test]
    async fn test_taxonomy_endpoint_lists_categories() {
        let router = create_router(test_state(FakeEngine::returning("banana", 0.9)));

        let response = router
            .oneshot(Request::get("/api/taxonomy").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0]["category"], "Organic");
        assert_eq!(entries[5]["category"], "E-waste");
    }

    #[tokio::test]
    async fn test_status_reports_not_ready_before_init() {
        let router = create_router(test_state(FakeEngine::returning("banana", 0.9)));

        let response = router
            .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let status: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(status["ready"], false);
        assert_eq!(status["model"], "moondream");
    }

    #[tokio::test]
    async fn test_classify_before_init_is_service_unavailable() {
        let router = create_router(test_state(FakeEngine::returning("banana", 0.9)));

        let body = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"item.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "fakebytes\r\n",
            "--BOUNDARY--\r\n"
        );
        let request = Request::post("/api/classify")
            .header("content-type", "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_classify_upload_resolves_category() {
        let state = test_state(FakeEngine::returning("crumpled aluminum foil", 0.81));
        state.classifier.init().await.unwrap();
        let router = create_router(state);

        let body = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"item.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "fakebytes\r\n",
            "--BOUNDARY--\r\n"
        );
        let request = Request::post("/api/classify")
            .header("content-type", "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let result: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(result["category"], "Metal");
        assert_eq!(result["confidence"], 0.81);
    }

    #[tokio::test]
    async fn test_classify_skips_fields_other_than_image() {
        let state = test_state(FakeEngine::returning("glass jar", 0.88));
        state.classifier.init().await.unwrap();
        let router = create_router(state);

        // A text field ahead of the image must not be classified.
        let body = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"note\"\r\n\r\n",
            "from the kitchen\r\n",
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"image\"; filename=\"item.jpg\"\r\n",
            "Content-Type: image/jpeg\r\n\r\n",
            "fakebytes\r\n",
            "--BOUNDARY--\r\n"
        );
        let request = Request::post("/api/classify")
            .header("content-type", "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let result: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(result["category"], "Glass");
    }

    #[tokio::test]
    async fn test_classify_without_image_field_is_bad_request() {
        let state = test_state(FakeEngine::returning("glass jar", 0.88));
        state.classifier.init().await.unwrap();
        let router = create_router(state);

        let body = concat!(
            "--BOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"note\"\r\n\r\n",
            "no picture attached\r\n",
            "--BOUNDARY--\r\n"
        );
        let request = Request::post("/api/classify")
            .header("content-type", "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
