//! Per-question extraction cache.
//!
//! Layout: `{root}/{exam_id}/{question_id}/` holding six artifacts: the
//! two structured records plus the four rendered documents. An entry is
//! either fully present or absent: `put` stages everything in a temp
//! directory inside the exam folder and publishes it with one rename, so a
//! torn write can never be reported as cached. Entries are written once by
//! a successful pipeline run and never mutated afterwards; a stale entry is
//! removed by hand, not overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::app::markdown::RenderedDocs;
use crate::app::record::{Language, QuestionRecord};
use crate::error::{AppError, Result};

const RECORD_EN: &str = "record_en.json";
const RECORD_ES: &str = "record_es.json";

const ARTIFACTS: [&str; 6] = [
    RECORD_EN,
    RECORD_ES,
    "summary_en.md",
    "full_en.md",
    "summary_es.md",
    "full_es.md",
];

/// Separator between questions in an assembled exam document.
const DOC_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocVariant {
    Summary,
    Full,
}

impl DocVariant {
    fn file_name(&self, lang: Language) -> String {
        let variant = match self {
            DocVariant::Summary => "summary",
            DocVariant::Full => "full",
        };
        format!("{}_{}.md", variant, lang.code())
    }
}

/// The complete persisted state for one question.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub record_en: QuestionRecord,
    pub record_es: QuestionRecord,
    pub docs_en: RenderedDocs,
    pub docs_es: RenderedDocs,
}

pub struct QuestionCache {
    root: PathBuf,
}

impl QuestionCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn exam_dir(&self, exam_id: &str) -> PathBuf {
        self.root.join(exam_id)
    }

    fn entry_dir(&self, exam_id: &str, question_id: u32) -> PathBuf {
        self.exam_dir(exam_id).join(question_id.to_string())
    }

    /// True only when all six artifacts exist.
    pub fn has(&self, exam_id: &str, question_id: u32) -> bool {
        let dir = self.entry_dir(exam_id, question_id);
        ARTIFACTS.iter().all(|name| dir.join(name).is_file())
    }

    /// Loads a complete entry; a partially present directory reads as
    /// absent.
    pub fn get(&self, exam_id: &str, question_id: u32) -> Result<Option<CacheEntry>> {
        if !self.has(exam_id, question_id) {
            return Ok(None);
        }
        let dir = self.entry_dir(exam_id, question_id);

        let record_en = read_record(&dir.join(RECORD_EN))?;
        let record_es = read_record(&dir.join(RECORD_ES))?;
        let docs_en = RenderedDocs {
            summary: fs::read_to_string(dir.join(DocVariant::Summary.file_name(Language::En)))?,
            full: fs::read_to_string(dir.join(DocVariant::Full.file_name(Language::En)))?,
        };
        let docs_es = RenderedDocs {
            summary: fs::read_to_string(dir.join(DocVariant::Summary.file_name(Language::Es)))?,
            full: fs::read_to_string(dir.join(DocVariant::Full.file_name(Language::Es)))?,
        };

        Ok(Some(CacheEntry {
            record_en,
            record_es,
            docs_en,
            docs_es,
        }))
    }

    /// All-or-nothing persist: stage the six artifacts, then publish the
    /// entry directory with a single rename. If another writer published
    /// first, the existing entry wins and the staged copy is discarded.
    pub fn put(&self, exam_id: &str, question_id: u32, entry: &CacheEntry) -> Result<()> {
        let exam_dir = self.exam_dir(exam_id);
        fs::create_dir_all(&exam_dir)?;

        let staging = tempfile::Builder::new()
            .prefix(".stage-")
            .tempdir_in(&exam_dir)
            .context("failed to create cache staging directory")?;

        write_entry_files(staging.path(), entry)?;

        let final_dir = self.entry_dir(exam_id, question_id);
        if final_dir.exists() {
            debug!("cache entry {exam_id}/{question_id} already published, keeping it");
            return Ok(());
        }

        // Disarm the cleanup guard; from here the directory is ours.
        let staged = staging.into_path();
        if let Err(e) = fs::rename(&staged, &final_dir) {
            let _ = fs::remove_dir_all(&staged);
            if final_dir.exists() {
                // Lost a publish race; the winner's entry is complete.
                return Ok(());
            }
            return Err(AppError::Io(e));
        }
        debug!("cache entry {exam_id}/{question_id} published");
        Ok(())
    }

    /// Concatenates every cached document of one `(language, variant)` for
    /// an exam, ordered by numeric question id ascending with non-numeric
    /// identifiers sorted last, stably. A malformed or incomplete entry is
    /// skipped, never fatal.
    pub fn assemble(&self, exam_id: &str, lang: Language, variant: DocVariant) -> Result<String> {
        let exam_dir = self.exam_dir(exam_id);
        if !exam_dir.is_dir() {
            return Err(AppError::ResourceNotFound(format!(
                "no cached documents for exam {exam_id}"
            )));
        }

        let doc_name = variant.file_name(lang);
        let mut sections: Vec<(std::cmp::Reverse<bool>, u64, String, String)> = Vec::new();

        for dir_entry in fs::read_dir(&exam_dir)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name().to_string_lossy().to_string();
            // Staging directories and stray files are not entries.
            if name.starts_with('.') || !dir_entry.path().is_dir() {
                continue;
            }
            let doc_path = dir_entry.path().join(&doc_name);
            let text = match fs::read_to_string(&doc_path) {
                Ok(text) => text,
                Err(e) => {
                    warn!("skipping cache entry {exam_id}/{name}: {e}");
                    continue;
                }
            };
            let numeric = name.parse::<u64>();
            sections.push((
                std::cmp::Reverse(numeric.is_ok()),
                numeric.unwrap_or(u64::MAX),
                name,
                text,
            ));
        }

        sections.sort_by(|a, b| (a.0, a.1, &a.2).cmp(&(b.0, b.1, &b.2)));

        Ok(sections
            .iter()
            .map(|(_, _, _, text)| text.trim_end())
            .collect::<Vec<_>>()
            .join(DOC_SEPARATOR))
    }
}

fn read_record(path: &Path) -> Result<QuestionRecord> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("corrupt cache record at {}", path.display()))
        .map_err(AppError::Internal)
}

fn write_entry_files(dir: &Path, entry: &CacheEntry) -> Result<()> {
    let record_en = serde_json::to_string_pretty(&entry.record_en)
        .context("serialize english record")?;
    let record_es = serde_json::to_string_pretty(&entry.record_es)
        .context("serialize spanish record")?;

    fs::write(dir.join(RECORD_EN), record_en)?;
    fs::write(dir.join(RECORD_ES), record_es)?;
    fs::write(
        dir.join(DocVariant::Summary.file_name(Language::En)),
        &entry.docs_en.summary,
    )?;
    fs::write(dir.join(DocVariant::Full.file_name(Language::En)), &entry.docs_en.full)?;
    fs::write(
        dir.join(DocVariant::Summary.file_name(Language::Es)),
        &entry.docs_es.summary,
    )?;
    fs::write(dir.join(DocVariant::Full.file_name(Language::Es)), &entry.docs_es.full)?;
    Ok(())
}
