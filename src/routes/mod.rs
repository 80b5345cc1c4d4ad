//! HTTP surface over the extraction core, plus the static frontend.

mod exams;
mod extract;
mod health;

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::app::cache::QuestionCache;
use crate::app::catalog::CatalogStore;
use crate::app::workflow::pipeline::ExtractionPipeline;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogStore,
    pub cache: Arc<QuestionCache>,
    pub pipeline: Arc<ExtractionPipeline>,
}

pub fn router(state: AppState, frontend_dir: Option<&str>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .route("/exams", get(exams::list_exams))
        .route("/questions/:exam_id", get(exams::questions))
        .route("/extract", get(extract::locate_and_extract))
        .route("/locate-range", get(extract::locate_range))
        .route("/document/:exam_id", get(extract::document))
        .with_state(state);

    // Built frontend bundle with SPA fallback to index.html, when present.
    if let Some(dir) = frontend_dir {
        let index = Path::new(dir).join("index.html");
        app = app.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
