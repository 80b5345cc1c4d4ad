//! Read-only access to the pre-baked per-exam question catalogs.
//!
//! The data directory holds flat JSON files produced by the offline
//! conversion step: `{exam}_questions.json` (English field names) and
//! `{exam}_questions_es.json` (Spanish field names). The API always speaks
//! the Spanish field shape, so English files are normalized on read.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::app::record::Language;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogOption {
    pub letra: String,
    pub texto: String,
    #[serde(default)]
    pub es_correcta: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogQuestion {
    pub numero: String,
    pub pregunta: String,
    #[serde(default)]
    pub opciones: Vec<CatalogOption>,
    #[serde(default)]
    pub respuesta_correcta: String,
    #[serde(default)]
    pub explicacion: String,
}

#[derive(Debug, Deserialize)]
struct EnglishOption {
    letter: String,
    text: String,
    #[serde(default)]
    is_correct: bool,
}

#[derive(Debug, Deserialize)]
struct EnglishQuestion {
    number: String,
    question: String,
    #[serde(default)]
    options: Vec<EnglishOption>,
    #[serde(default)]
    correct_answer: String,
    #[serde(default)]
    explanation: String,
}

#[derive(Clone)]
pub struct CatalogStore {
    data_dir: PathBuf,
}

impl CatalogStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Exams available for practice. Reads the `exams.json` manifest when
    /// present, otherwise lists every `{exam}_questions.json` in the data
    /// directory.
    pub fn list_exams(&self) -> Result<Vec<ExamInfo>> {
        let manifest = self.data_dir.join("exams.json");
        if manifest.is_file() {
            let raw = fs::read_to_string(&manifest)?;
            let exams: Vec<ExamInfo> = serde_json::from_str(&raw)
                .context("malformed exams.json manifest")?;
            return Ok(exams);
        }

        let mut exams = Vec::new();
        if self.data_dir.is_dir() {
            for entry in fs::read_dir(&self.data_dir)? {
                let name = entry?.file_name().to_string_lossy().to_string();
                if let Some(id) = name.strip_suffix("_questions.json") {
                    exams.push(ExamInfo {
                        id: id.to_string(),
                        name: id.to_uppercase(),
                    });
                }
            }
        }
        exams.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(exams)
    }

    /// Question list for one exam in one language. `limit == 0` means all
    /// questions.
    pub fn questions(
        &self,
        exam_id: &str,
        lang: Language,
        limit: usize,
        randomize: bool,
    ) -> Result<Vec<CatalogQuestion>> {
        validate_exam_id(exam_id)?;

        let file_name = match lang {
            Language::Es => format!("{exam_id}_questions_es.json"),
            Language::En => format!("{exam_id}_questions.json"),
        };
        let path = self.data_dir.join(&file_name);
        if !path.is_file() {
            return Err(AppError::ResourceNotFound(format!(
                "questions file not found: {file_name}"
            )));
        }

        let raw = fs::read_to_string(&path)?;
        let mut questions: Vec<CatalogQuestion> = match lang {
            Language::Es => serde_json::from_str(&raw)
                .with_context(|| format!("malformed catalog {file_name}"))?,
            Language::En => {
                let english: Vec<EnglishQuestion> = serde_json::from_str(&raw)
                    .with_context(|| format!("malformed catalog {file_name}"))?;
                english.into_iter().map(normalize_english).collect()
            }
        };

        if randomize {
            questions.shuffle(&mut rand::thread_rng());
        }
        if limit > 0 && questions.len() > limit {
            questions.truncate(limit);
        }
        Ok(questions)
    }
}

fn normalize_english(q: EnglishQuestion) -> CatalogQuestion {
    CatalogQuestion {
        numero: q.number,
        pregunta: q.question,
        opciones: q
            .options
            .into_iter()
            .map(|opt| CatalogOption {
                letra: opt.letter,
                texto: opt.text,
                es_correcta: opt.is_correct,
            })
            .collect(),
        respuesta_correcta: q.correct_answer,
        explicacion: q.explanation,
    }
}

/// Exam ids come straight from the request path and are used in file
/// names; anything beyond the id alphabet is rejected.
pub fn validate_exam_id(exam_id: &str) -> Result<()> {
    let valid = !exam_id.is_empty()
        && exam_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::ResourceNotFound(format!("unknown exam: {exam_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, CatalogStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let store = CatalogStore::new(dir.path());
        (dir, store)
    }

    const ENGLISH: &str = r#"[
        {"number": "1", "question": "What is GRS?",
         "options": [{"letter": "A", "text": "Local", "is_correct": false},
                     {"letter": "B", "text": "Geo", "is_correct": true}],
         "correct_answer": "B", "explanation": "geo redundancy"}
    ]"#;

    const SPANISH: &str = r#"[
        {"numero": "1", "pregunta": "¿Qué es GRS?",
         "opciones": [{"letra": "A", "texto": "Local", "es_correcta": false},
                      {"letra": "B", "texto": "Geo", "es_correcta": true}],
         "respuesta_correcta": "B", "explicacion": "redundancia geográfica"}
    ]"#;

    #[test]
    fn english_catalog_is_normalized_to_spanish_shape() {
        let (_dir, store) = store_with(&[("dp-300_questions.json", ENGLISH)]);
        let questions = store.questions("dp-300", Language::En, 10, false).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].numero, "1");
        assert_eq!(questions[0].opciones[1].letra, "B");
        assert!(questions[0].opciones[1].es_correcta);
        assert_eq!(questions[0].respuesta_correcta, "B");
    }

    #[test]
    fn spanish_catalog_reads_directly() {
        let (_dir, store) = store_with(&[("dp-300_questions_es.json", SPANISH)]);
        let questions = store.questions("dp-300", Language::Es, 0, false).unwrap();
        assert_eq!(questions[0].pregunta, "¿Qué es GRS?");
    }

    #[test]
    fn missing_catalog_is_resource_not_found() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.questions("az-204", Language::Es, 10, false),
            Err(AppError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn limit_truncates_and_zero_means_all() {
        let many: Vec<serde_json::Value> = (1..=5)
            .map(|i| {
                serde_json::json!({
                    "numero": i.to_string(),
                    "pregunta": format!("q{i}"),
                    "opciones": [],
                    "respuesta_correcta": "",
                    "explicacion": ""
                })
            })
            .collect();
        let raw = serde_json::to_string(&many).unwrap();
        let (_dir, store) = store_with(&[("az-204_questions_es.json", raw.as_str())]);

        assert_eq!(store.questions("az-204", Language::Es, 2, false).unwrap().len(), 2);
        assert_eq!(store.questions("az-204", Language::Es, 0, false).unwrap().len(), 5);
    }

    #[test]
    fn list_exams_scans_question_files() {
        let (_dir, store) = store_with(&[
            ("dp-300_questions.json", ENGLISH),
            ("dp-300_questions_es.json", SPANISH),
            ("az-204_questions.json", ENGLISH),
        ]);
        let exams = store.list_exams().unwrap();
        let ids: Vec<&str> = exams.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["az-204", "dp-300"]);
    }

    #[test]
    fn manifest_overrides_directory_scan() {
        let manifest = r#"[{"id": "dp-300", "name": "DP-300: Administering Azure SQL"}]"#;
        let (_dir, store) = store_with(&[
            ("exams.json", manifest),
            ("az-204_questions.json", ENGLISH),
        ]);
        let exams = store.list_exams().unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].name, "DP-300: Administering Azure SQL");
    }

    #[test]
    fn traversal_like_exam_ids_are_rejected() {
        let (_dir, store) = store_with(&[]);
        assert!(store.questions("../etc", Language::Es, 0, false).is_err());
    }
}
