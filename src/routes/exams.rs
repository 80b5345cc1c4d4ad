//! Catalog listing endpoints: plain file/JSON plumbing over the data dir.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::app::catalog::{CatalogQuestion, ExamInfo};
use crate::app::record::Language;
use crate::error::{AppError, Result};
use crate::routes::AppState;

pub async fn list_exams(State(state): State<AppState>) -> Result<Json<Vec<ExamInfo>>> {
    Ok(Json(state.catalog.list_exams()?))
}

fn default_lang() -> String {
    "es".to_string()
}

fn default_limit() -> usize {
    10
}

#[derive(Deserialize)]
pub struct QuestionsQuery {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub randomize: bool,
}

pub async fn questions(
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Query(query): Query<QuestionsQuery>,
) -> Result<Json<Vec<CatalogQuestion>>> {
    let lang = parse_lang(&query.lang)?;
    let questions = state
        .catalog
        .questions(&exam_id, lang, query.limit, query.randomize)?;
    Ok(Json(questions))
}

pub(crate) fn parse_lang(code: &str) -> Result<Language> {
    Language::parse(code).ok_or_else(|| AppError::BadRequest(format!("unsupported language: {code}")))
}
