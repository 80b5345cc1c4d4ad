//! The locate → extract → render → persist pipeline.
//!
//! One sequential pass per question; the model call is the only suspension
//! point. A per-question in-flight gate keeps two concurrent cache misses
//! for the same `(exam, question)` from paying for the extraction twice:
//! later callers wait and then read the winner's cache entry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::llm::service::ExtractionService;
use crate::app::cache::{CacheEntry, QuestionCache};
use crate::app::locator::{self, LocatedQuestion, PageRange};
use crate::app::markdown::{render, RenderedDocs};
use crate::app::pdf::{PageText, PdfPages};
use crate::app::record::Language;
use crate::app::workflow::ExtractCtx;
use crate::error::{AppError, Result};

pub struct ExtractRequest {
    pub pdf_name: String,
    pub question_id: u32,
    /// 1-based page number biasing the marker search.
    pub start_hint: Option<usize>,
    /// Explicit zero-based range; bypasses the search but is still
    /// validated. Both ends must be given together.
    pub manual_start: Option<i64>,
    pub manual_end: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ExtractOutcome {
    pub exam_id: String,
    pub question_id: u32,
    /// 1-based page range label, e.g. "10-11".
    pub page_range: String,
    pub cached: bool,
    pub en: RenderedDocs,
    pub es: RenderedDocs,
}

pub struct ExtractionPipeline {
    pdf_dir: PathBuf,
    cache: Arc<QuestionCache>,
    extractor: ExtractionService,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ExtractionPipeline {
    pub fn new(
        pdf_dir: impl Into<PathBuf>,
        cache: Arc<QuestionCache>,
        extractor: ExtractionService,
    ) -> Self {
        Self {
            pdf_dir: pdf_dir.into(),
            cache,
            extractor,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Full pipeline for one question. A complete cache entry
    /// short-circuits everything, including page location.
    pub async fn locate_and_extract(&self, request: ExtractRequest) -> Result<ExtractOutcome> {
        let exam_id = exam_id_from_pdf(&request.pdf_name)?;
        let ctx = ExtractCtx {
            exam_id: exam_id.clone(),
            question_id: request.question_id,
        };
        let prefix = ctx.log_prefix();

        if let Some(entry) = self.cache.get(&exam_id, request.question_id)? {
            info!("{} cache hit", prefix);
            return Ok(cached_outcome(&ctx, entry));
        }

        // At most one extraction in flight per question; latecomers block
        // here and then hit the cache.
        let key = format!("{exam_id}/{}", request.question_id);
        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight.entry(key.clone()).or_default().clone()
        };
        let outcome = {
            let _running = gate.lock().await;
            match self.cache.get(&exam_id, request.question_id)? {
                Some(entry) => {
                    info!("{} cache hit after waiting on in-flight extraction", prefix);
                    Ok(cached_outcome(&ctx, entry))
                }
                None => self.run_miss(&ctx, &request).await,
            }
        };
        let mut inflight = self.inflight.lock().await;
        if inflight.get(&key).is_some_and(|g| Arc::strong_count(g) == 2) {
            inflight.remove(&key);
        }
        drop(inflight);

        outcome
    }

    async fn run_miss(&self, ctx: &ExtractCtx, request: &ExtractRequest) -> Result<ExtractOutcome> {
        let prefix = ctx.log_prefix();
        info!("{} ========== processing question ==========", prefix);

        // === 1. Locate pages and render them to images ===
        info!("{} [step 1/4] locating pages in {}", prefix, request.pdf_name);
        let pdf_path = self.pdf_path(&request.pdf_name)?;
        let question_id = request.question_id;
        let start_hint = request.start_hint;
        let manual = manual_range(request)?;

        let (range, images) = tokio::task::spawn_blocking(move || -> Result<(PageRange, Vec<String>)> {
            let mut pages = PdfPages::open(&pdf_path)?;
            let range = match manual {
                Some((start, end)) => PageRange::manual(start, end, pages.page_count())?,
                None => locator::locate(&mut pages, question_id, start_hint)?,
            };
            let images = pages.render_page_images(range)?;
            Ok((range, images))
        })
        .await
        .map_err(|e| AppError::Internal(anyhow!("page location task failed: {e}")))??;

        info!(
            "{} [step 2/4] extracting pages {} ({} images)",
            prefix,
            range.display_one_based(),
            images.len()
        );
        let record = match self.extractor.extract(question_id, &images).await {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    target: "failed_extractions",
                    "{} extraction failed | pdf={} | pages={} | reason={}",
                    prefix,
                    request.pdf_name,
                    range.display_one_based(),
                    e
                );
                return Err(e);
            }
        };

        info!("{} [step 3/4] rendering documents", prefix);
        let entry = CacheEntry {
            docs_en: render(&record.en, range, Language::En),
            docs_es: render(&record.es, range, Language::Es),
            record_en: record.en,
            record_es: record.es,
        };

        // Persist failure is overall failure: the caller must never be
        // told the data is cached when it is not.
        info!("{} [step 4/4] persisting cache entry", prefix);
        self.cache.put(&ctx.exam_id, question_id, &entry)?;

        info!("{} done, pages {}", prefix, range.display_one_based());
        Ok(ExtractOutcome {
            exam_id: ctx.exam_id.clone(),
            question_id,
            page_range: range.display_one_based(),
            cached: false,
            en: entry.docs_en,
            es: entry.docs_es,
        })
    }

    /// Locates a contiguous ascending id range in one forward sweep over
    /// the document. Ids whose markers appear out of page order are
    /// reported as not found (the scan cursor never rewinds).
    pub async fn locate_range(
        &self,
        pdf_name: &str,
        start_id: u32,
        end_id: u32,
    ) -> Result<Vec<LocatedQuestion>> {
        if start_id == 0 || start_id > end_id {
            return Err(AppError::InvalidRange(format!(
                "invalid question id range {start_id}..{end_id}"
            )));
        }
        let pdf_path = self.pdf_path(pdf_name)?;

        tokio::task::spawn_blocking(move || {
            let mut pages = PdfPages::open(&pdf_path)?;
            locator::locate_batch(&mut pages, start_id, end_id)
        })
        .await
        .map_err(|e| AppError::Internal(anyhow!("range scan task failed: {e}")))?
    }

    fn pdf_path(&self, pdf_name: &str) -> Result<PathBuf> {
        validate_pdf_name(pdf_name)?;
        let path = self.pdf_dir.join(pdf_name);
        if !path.is_file() {
            return Err(AppError::ResourceNotFound(format!("pdf not found: {pdf_name}")));
        }
        Ok(path)
    }
}

fn manual_range(request: &ExtractRequest) -> Result<Option<(i64, i64)>> {
    match (request.manual_start, request.manual_end) {
        (Some(start), Some(end)) => Ok(Some((start, end))),
        (None, None) => Ok(None),
        _ => Err(AppError::InvalidRange(
            "a manual range needs both start and end".into(),
        )),
    }
}

fn cached_outcome(ctx: &ExtractCtx, entry: CacheEntry) -> ExtractOutcome {
    ExtractOutcome {
        exam_id: ctx.exam_id.clone(),
        question_id: ctx.question_id,
        page_range: page_range_label(&entry.docs_en.summary),
        cached: true,
        en: entry.docs_en,
        es: entry.docs_es,
    }
}

/// Recovers the 1-based page label from a cached summary heading,
/// e.g. `## Question #12 (Pages 10-11)` → `10-11`.
fn page_range_label(summary: &str) -> String {
    summary
        .lines()
        .next()
        .and_then(|line| line.rsplit_once('('))
        .and_then(|(_, tail)| tail.split_once(')'))
        .and_then(|(inside, _)| inside.rsplit(' ').next())
        .unwrap_or_default()
        .to_string()
}

/// The exam id is the PDF's file stem: `dp-300.pdf` → `dp-300`.
fn exam_id_from_pdf(pdf_name: &str) -> Result<String> {
    validate_pdf_name(pdf_name)?;
    let stem = Path::new(pdf_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::ResourceNotFound(format!("invalid pdf name: {pdf_name}")))?;
    Ok(stem.to_ascii_lowercase())
}

/// PDF names come from the request and are joined onto the docs dir.
fn validate_pdf_name(pdf_name: &str) -> Result<()> {
    let valid = !pdf_name.is_empty()
        && !pdf_name.contains(['/', '\\'])
        && !pdf_name.starts_with('.')
        && pdf_name.to_ascii_lowercase().ends_with(".pdf");
    if valid {
        Ok(())
    } else {
        Err(AppError::ResourceNotFound(format!("invalid pdf name: {pdf_name}")))
    }
}
