//! Markdown rendering of extracted question records.
//!
//! Pure functions: any syntactically valid record renders without error,
//! optional sections are omitted outright instead of producing empty
//! headers. Section order is fixed and identical in both languages so the
//! aggregated per-exam documents stay deterministic; only the labels are
//! localized.

use crate::app::locator::PageRange;
use crate::app::record::{Language, QuestionRecord};

/// Summary and full documents for one record in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocs {
    pub summary: String,
    pub full: String,
}

struct Labels {
    question: &'static str,
    pages: &'static str,
    image_explanation: &'static str,
    options: &'static str,
    correct_answer: &'static str,
    explanation: &'static str,
    discussion: &'static str,
    correct_marker: &'static str,
}

const EN: Labels = Labels {
    question: "Question",
    pages: "Pages",
    image_explanation: "🖼️ Image Description",
    options: "Options",
    correct_answer: "✅ Correct Answer",
    explanation: "📝 Explanation",
    discussion: "💬 Community Discussion",
    correct_marker: "✅ Correct",
};

const ES: Labels = Labels {
    question: "Pregunta",
    pages: "Páginas",
    image_explanation: "🖼️ Descripción de la Imagen",
    options: "Opciones",
    correct_answer: "✅ Respuesta Correcta",
    explanation: "📝 Explicación",
    discussion: "💬 Discusión de la Comunidad",
    correct_marker: "✅ Correcta",
};

fn labels(lang: Language) -> &'static Labels {
    match lang {
        Language::En => &EN,
        Language::Es => &ES,
    }
}

pub fn render(record: &QuestionRecord, range: PageRange, lang: Language) -> RenderedDocs {
    RenderedDocs {
        summary: render_summary(record, range, lang),
        full: render_full(record, range, lang),
    }
}

fn render_summary(record: &QuestionRecord, range: PageRange, lang: Language) -> String {
    let l = labels(lang);
    let mut out = String::new();

    out.push_str(&format!(
        "## {} #{} ({} {})\n\n",
        l.question,
        record.id,
        l.pages,
        range.display_one_based()
    ));

    if !record.short_summary.trim().is_empty() {
        out.push_str(record.short_summary.trim());
        out.push_str("\n\n");
    }

    if !record.correct_answer.trim().is_empty() {
        out.push_str(&format!(
            "**{}:** {}\n",
            l.correct_answer,
            record.correct_answer.trim()
        ));
    }

    out
}

fn render_full(record: &QuestionRecord, range: PageRange, lang: Language) -> String {
    let l = labels(lang);
    let mut out = String::new();

    out.push_str(&format!("## {} #{}\n\n", l.question, record.id));
    out.push_str(&format!("_{} {}_\n\n", l.pages, range.display_one_based()));

    if !record.context.trim().is_empty() {
        out.push_str(record.context.trim());
        out.push_str("\n\n");
    }

    if let Some(image_explanation) = record
        .image_explanation
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        out.push_str(&format!("### {}:\n\n{}\n\n", l.image_explanation, image_explanation));
    }

    if !record.options.is_empty() {
        out.push_str(&format!("### {}:\n\n", l.options));
        for opt in &record.options {
            if opt.is_correct {
                out.push_str(&format!(
                    "- **{}) {}** {}\n",
                    opt.letter,
                    opt.text.trim(),
                    l.correct_marker
                ));
            } else {
                out.push_str(&format!("- {}) {}\n", opt.letter, opt.text.trim()));
            }
        }
        out.push('\n');
    }

    if !record.correct_answer.trim().is_empty() {
        out.push_str(&format!(
            "### {}: **{}**\n\n",
            l.correct_answer,
            record.correct_answer.trim()
        ));
    }

    if !record.explanation.trim().is_empty() {
        out.push_str(&format!("### {}:\n\n{}\n\n", l.explanation, record.explanation.trim()));
    }

    if let Some(discussion) = record
        .community_discussion
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        out.push_str(&format!("### {}:\n\n{}\n\n", l.discussion, discussion));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::record::QuestionOption;

    fn sample_record() -> QuestionRecord {
        QuestionRecord {
            id: 12,
            short_summary: "Pick the right storage redundancy.".into(),
            context: "You manage an Azure SQL database...".into(),
            image_explanation: Some("The diagram shows two regions.".into()),
            options: vec![
                QuestionOption {
                    letter: 'A',
                    text: "LRS".into(),
                    is_correct_per_source: false,
                    is_correct_per_discussion: None,
                    is_correct: false,
                },
                QuestionOption {
                    letter: 'B',
                    text: "GRS".into(),
                    is_correct_per_source: true,
                    is_correct_per_discussion: None,
                    is_correct: true,
                },
            ],
            correct_answer: "B".into(),
            explanation: "Geo-redundant storage replicates across regions.".into(),
            community_discussion: Some("Most voters agree with B.".into()),
        }
    }

    fn range() -> PageRange {
        PageRange::manual(9, 10, 100).unwrap()
    }

    #[test]
    fn summary_has_heading_pages_and_answer() {
        let docs = render(&sample_record(), range(), Language::En);
        assert!(docs.summary.starts_with("## Question #12 (Pages 10-11)"));
        assert!(docs.summary.contains("**✅ Correct Answer:** B"));
    }

    #[test]
    fn full_marks_only_the_correct_option() {
        let docs = render(&sample_record(), range(), Language::En);
        assert!(docs.full.contains("- A) LRS\n"));
        assert!(docs.full.contains("- **B) GRS** ✅ Correct\n"));
        assert_eq!(docs.full.matches("✅ Correct\n").count(), 1);
    }

    #[test]
    fn spanish_labels_are_localized_with_same_structure() {
        let en = render(&sample_record(), range(), Language::En).full;
        let es = render(&sample_record(), range(), Language::Es).full;
        assert!(es.starts_with("## Pregunta #12"));
        assert!(es.contains("### Opciones:"));
        assert!(es.contains("### ✅ Respuesta Correcta: **B**"));
        assert!(es.contains("### 📝 Explicación:"));
        // Same number of section headers in both languages.
        assert_eq!(
            en.matches("\n### ").count() + usize::from(en.starts_with("### ")),
            es.matches("\n### ").count() + usize::from(es.starts_with("### "))
        );
    }

    #[test]
    fn absent_optional_fields_render_no_empty_headers() {
        let mut record = sample_record();
        record.image_explanation = None;
        record.community_discussion = Some("   ".into());
        record.explanation = String::new();
        let docs = render(&record, range(), Language::En);
        assert!(!docs.full.contains("Image Description"));
        assert!(!docs.full.contains("Community Discussion"));
        assert!(!docs.full.contains("Explanation"));
    }

    #[test]
    fn rendering_is_total_over_an_empty_record() {
        let record = QuestionRecord {
            id: 1,
            short_summary: String::new(),
            context: String::new(),
            image_explanation: None,
            options: vec![],
            correct_answer: String::new(),
            explanation: String::new(),
            community_discussion: None,
        };
        let docs = render(&record, PageRange::manual(0, 0, 1).unwrap(), Language::Es);
        assert!(docs.full.starts_with("## Pregunta #1"));
        assert!(!docs.full.contains("###"));
    }

    #[test]
    fn single_page_range_renders_one_number() {
        let docs = render(&sample_record(), PageRange::manual(4, 4, 10).unwrap(), Language::En);
        assert!(docs.summary.contains("(Pages 5)"));
    }
}
