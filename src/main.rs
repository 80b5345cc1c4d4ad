mod api;
mod app;
mod config;
mod error;
mod routes;

use std::sync::Arc;

use tracing::info;

use crate::api::llm::service::ExtractionService;
use crate::app::cache::QuestionCache;
use crate::app::catalog::CatalogStore;
use crate::app::workflow::pipeline::ExtractionPipeline;
use crate::config::AppConfig;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guards = app::logger::init("logs", "examdrill");

    let config = AppConfig::load()?;

    let cache = Arc::new(QuestionCache::new(&config.cache_dir));
    let catalog = CatalogStore::new(&config.data_dir);
    let extractor = ExtractionService::from_config(&config);
    let pipeline = Arc::new(ExtractionPipeline::new(
        &config.pdf_dir,
        cache.clone(),
        extractor,
    ));

    let state = AppState {
        catalog,
        cache,
        pipeline,
    };
    let router = routes::router(state, config.frontend_dir.as_deref());

    let addr = format!("{}:{}", config.host, config.port);
    info!("examdrill listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
