//! Extraction endpoints: the pipeline, the batch scanner and the
//! aggregated exam document.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::cache::DocVariant;
use crate::app::catalog::validate_exam_id;
use crate::app::markdown::RenderedDocs;
use crate::app::workflow::pipeline::ExtractRequest;
use crate::error::Result;
use crate::routes::exams::parse_lang;
use crate::routes::AppState;

#[derive(Deserialize)]
pub struct ExtractQuery {
    pub pdf_name: String,
    pub question_id: u32,
    /// 1-based page hint for the marker search.
    pub start_hint: Option<usize>,
    /// Explicit zero-based page range, both ends required together.
    pub manual_start: Option<i64>,
    pub manual_end: Option<i64>,
}

#[derive(Serialize)]
pub struct LangDocs {
    pub summary: String,
    pub full: String,
}

impl From<RenderedDocs> for LangDocs {
    fn from(docs: RenderedDocs) -> Self {
        Self {
            summary: docs.summary,
            full: docs.full,
        }
    }
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub exam_id: String,
    pub question_id: u32,
    /// 1-based page range label, e.g. "10-11".
    pub pages: String,
    pub cached: bool,
    pub en: LangDocs,
    pub es: LangDocs,
}

pub async fn locate_and_extract(
    State(state): State<AppState>,
    Query(query): Query<ExtractQuery>,
) -> Result<Json<ExtractResponse>> {
    let outcome = state
        .pipeline
        .locate_and_extract(ExtractRequest {
            pdf_name: query.pdf_name,
            question_id: query.question_id,
            start_hint: query.start_hint,
            manual_start: query.manual_start,
            manual_end: query.manual_end,
        })
        .await?;

    Ok(Json(ExtractResponse {
        exam_id: outcome.exam_id,
        question_id: outcome.question_id,
        pages: outcome.page_range,
        cached: outcome.cached,
        en: outcome.en.into(),
        es: outcome.es.into(),
    }))
}

#[derive(Deserialize)]
pub struct LocateRangeQuery {
    pub pdf_name: String,
    pub start_id: u32,
    pub end_id: u32,
}

#[derive(Serialize)]
pub struct RangeEntry {
    pub id: u32,
    /// 1-based, present when the question was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_page: Option<usize>,
    pub status: &'static str,
}

pub async fn locate_range(
    State(state): State<AppState>,
    Query(query): Query<LocateRangeQuery>,
) -> Result<Json<Vec<RangeEntry>>> {
    let located = state
        .pipeline
        .locate_range(&query.pdf_name, query.start_id, query.end_id)
        .await?;

    let entries = located
        .into_iter()
        .map(|q| match q.range {
            Some(range) => RangeEntry {
                id: q.id,
                start_page: Some(range.start() + 1),
                end_page: Some(range.end() + 1),
                status: "Found",
            },
            None => RangeEntry {
                id: q.id,
                start_page: None,
                end_page: None,
                status: "NotFound",
            },
        })
        .collect();
    Ok(Json(entries))
}

#[derive(Deserialize)]
pub struct DocumentQuery {
    #[serde(default = "default_doc_lang")]
    pub lang: String,
    /// false renders the summary variant.
    #[serde(default)]
    pub full: bool,
}

fn default_doc_lang() -> String {
    "es".to_string()
}

pub async fn document(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Query(query): Query<DocumentQuery>,
) -> Result<impl IntoResponse> {
    validate_exam_id(&exam_id)?;
    let lang = parse_lang(&query.lang)?;
    let variant = if query.full {
        DocVariant::Full
    } else {
        DocVariant::Summary
    };

    let doc = state.cache.assemble(&exam_id, lang, variant)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        doc,
    ))
}
