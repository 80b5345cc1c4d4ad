//! Extraction service tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::service::{ChatBackend, ExtractionService, OpenAiBackend};
use crate::error::AppError;

/// Canned backend: returns a fixed reply and counts calls.
struct FakeBackend {
    reply: String,
    calls: AtomicUsize,
}

impl FakeBackend {
    fn new(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn complete(
        &self,
        _system: &str,
        _user_text: &str,
        _image_urls: &[String],
    ) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

fn bilingual_reply(id: u32) -> String {
    let record = |summary: &str| {
        json!({
            "id": id,
            "short_summary": summary,
            "context": "You administer an Azure SQL database...",
            "options": [
                {"letter": "A", "text": "Basic", "is_correct_per_source": true, "is_correct": true},
                {"letter": "B", "text": "Hyperscale", "is_correct_per_source": false,
                 "is_correct_per_discussion": true, "is_correct": false}
            ],
            "correct_answer": "A",
            "explanation": "The source says A, the discussion prefers B.",
            "community_discussion": "Highly voted comments pick B."
        })
    };
    json!({"en": record("summary"), "es": record("resumen")}).to_string()
}

fn pages() -> Vec<String> {
    vec!["data:image/png;base64,AAAA".to_string()]
}

#[tokio::test]
async fn extract_parses_and_reconciles() {
    let backend = FakeBackend::new(bilingual_reply(17));
    let service = ExtractionService::with_backend(backend.clone());

    let record = service.extract(17, &pages()).await.expect("extract");

    // Discussion override: B wins over the source-marked A.
    assert!(!record.en.options[0].is_correct);
    assert!(record.en.options[1].is_correct);
    assert_eq!(record.en.correct_answer, "B");
    assert_eq!(record.es.correct_answer, "B");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn extract_repairs_fenced_reply() {
    let fenced = format!("```json\n{}\n```", bilingual_reply(3));
    let service = ExtractionService::with_backend(FakeBackend::new(fenced));

    let record = service.extract(3, &pages()).await.expect("extract");
    assert_eq!(record.en.id, 3);
}

#[tokio::test]
async fn extract_corrects_a_mismatched_id() {
    let service = ExtractionService::with_backend(FakeBackend::new(bilingual_reply(99)));
    let record = service.extract(4, &pages()).await.expect("extract");
    assert_eq!(record.en.id, 4);
    assert_eq!(record.es.id, 4);
}

#[tokio::test]
async fn unparseable_reply_is_extraction_failed() {
    let service = ExtractionService::with_backend(FakeBackend::new("B is correct."));
    match service.extract(1, &pages()).await {
        Err(AppError::ExtractionFailed(_)) => {}
        other => panic!("expected ExtractionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn unconfigured_service_is_unavailable() {
    let config = crate::config::AppConfig {
        host: "0.0.0.0".into(),
        port: 8000,
        data_dir: "data".into(),
        pdf_dir: "docs".into(),
        cache_dir: "cache".into(),
        frontend_dir: None,
        llm_api_key: None,
        llm_api_base_url: None,
        llm_model_name: None,
    };
    let service = ExtractionService::from_config(&config);
    assert!(!service.is_configured());
    match service.extract(1, &pages()).await {
        Err(AppError::ServiceUnavailable) => {}
        other => panic!("expected ServiceUnavailable, got {other:?}"),
    }
}

/// Needs a real endpoint in application.yaml to run.
#[tokio::test]
#[ignore]
async fn live_extraction_smoke() {
    crate::app::logger::init_test();

    let config = crate::config::AppConfig::load().expect("load config");
    let (key, base, model) = config.llm_endpoint().expect("llm endpoint configured");
    let backend = Arc::new(OpenAiBackend::new(key, base, model));
    let service = ExtractionService::with_backend(backend);

    // A trivial white page; the model should still answer in schema.
    let png_1x1 = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";
    let result = service.extract(1, &[png_1x1.to_string()]).await;
    println!("live extraction result: {result:?}");
}
