//! Structured question records, one per language.
//!
//! The extraction model returns both language variants in a single reply;
//! `reconcile` then enforces the exactly-one-correct-option invariant,
//! letting a community-discussion verdict override the source marking.

use serde::{Deserialize, Serialize};

/// Supported record languages. English is the primary extraction language
/// (the source PDFs are English), Spanish is the secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Single uppercase letter, unique within the record.
    pub letter: char,
    pub text: String,
    /// Marked correct in the source document.
    #[serde(default)]
    pub is_correct_per_source: bool,
    /// Correct according to the community discussion, when one exists and
    /// takes a position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct_per_discussion: Option<bool>,
    /// Reconciled verdict; discussion overrides source.
    #[serde(default)]
    pub is_correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: u32,
    /// One-paragraph synopsis.
    pub short_summary: String,
    /// Full question body, diagram/image content inlined as prose.
    pub context: String,
    /// Only present on the primary-language record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_explanation: Option<String>,
    pub options: Vec<QuestionOption>,
    /// Letter of the resolved correct option.
    pub correct_answer: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_discussion: Option<String>,
}

/// Both language variants of one extracted question, as returned by the
/// model in a single reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BilingualRecord {
    pub en: QuestionRecord,
    pub es: QuestionRecord,
}

impl QuestionRecord {
    /// Recomputes every option's `is_correct` from the source marking and
    /// the discussion verdict, then resyncs `correct_answer`.
    ///
    /// Discussion overrides source when present. If the flags resolve to
    /// anything other than exactly one correct option, the discussion
    /// choice wins, then the source marking, then the option named by
    /// `correct_answer`.
    pub fn reconcile(&mut self) {
        for opt in &mut self.options {
            opt.is_correct = opt.is_correct_per_discussion.unwrap_or(opt.is_correct_per_source);
        }

        let correct_count = self.options.iter().filter(|o| o.is_correct).count();
        if correct_count != 1 {
            let winner = self
                .options
                .iter()
                .position(|o| o.is_correct_per_discussion == Some(true))
                .or_else(|| self.options.iter().position(|o| o.is_correct_per_source))
                .or_else(|| {
                    let named = self.correct_answer.trim().chars().next();
                    self.options.iter().position(|o| Some(o.letter) == named)
                });

            if let Some(idx) = winner {
                for (i, opt) in self.options.iter_mut().enumerate() {
                    opt.is_correct = i == idx;
                }
            }
        }

        if let Some(opt) = self.options.iter().find(|o| o.is_correct) {
            self.correct_answer = opt.letter.to_string();
        }
    }

    /// Structural checks on a freshly parsed record. Returns the first
    /// problem found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id == 0 {
            return Err("question id must be positive".into());
        }
        for opt in &self.options {
            if !opt.letter.is_ascii_uppercase() {
                return Err(format!("option letter {:?} is not an uppercase letter", opt.letter));
            }
        }
        let mut letters: Vec<char> = self.options.iter().map(|o| o.letter).collect();
        letters.sort_unstable();
        letters.dedup();
        if letters.len() != self.options.len() {
            return Err("duplicate option letters".into());
        }
        Ok(())
    }
}

impl BilingualRecord {
    pub fn record(&self, lang: Language) -> &QuestionRecord {
        match lang {
            Language::En => &self.en,
            Language::Es => &self.es,
        }
    }

    pub fn reconcile(&mut self) {
        self.en.reconcile();
        self.es.reconcile();
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        self.en.validate()?;
        self.es.validate()
    }
}
