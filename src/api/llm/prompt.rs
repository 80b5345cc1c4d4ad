//! Instruction payload for the extraction request.
//!
//! One instruction plus all page images go out in a single request so the
//! model keeps cross-page context for the question.

/// System role for every extraction call.
pub fn system_message() -> &'static str {
    "You are an expert transcriber of certification exam questions. \
     You turn page images into structured JSON. \
     Reply with a single JSON object only: no prose, no markdown code fences."
}

/// User instruction for one question. The images attached to the same
/// message are the consecutive PDF pages holding the question.
pub fn user_instruction(question_id: u32) -> String {
    format!(
        r#"The attached images are consecutive pages of an exam PDF containing question #{id} (marked "Question #{id}"). The last page may already show the start of question #{next}; ignore everything belonging to it.

Return one JSON object of the form {{"en": <record>, "es": <record>}} where <record> is:

{{
  "id": {id},
  "short_summary": "<one-paragraph synopsis of the question>",
  "context": "<the full question body; describe any diagram, screenshot or table inline as prose>",
  "image_explanation": "<detailed description of the images/diagrams, English record only; omit the key when the question has none>",
  "options": [
    {{
      "letter": "A",
      "text": "<option text>",
      "is_correct_per_source": <true if the source marks this option correct>,
      "is_correct_per_discussion": <true/false if the community discussion takes a position on this option, otherwise omit>,
      "is_correct": <the reconciled verdict>
    }}
  ],
  "correct_answer": "<letter of the reconciled correct option>",
  "explanation": "<the source's explanation>",
  "community_discussion": "<summary of the discussion section; omit the key when there is none>"
}}

Rules:
1. Transcribe the question text and every option exactly; record the source's marked answer in is_correct_per_source.
2. If the pages contain a community discussion or comments section, summarize it in community_discussion and fill is_correct_per_discussion wherever the discussion takes a position. When the community favors a different answer than the source, is_correct and correct_answer must follow the discussion, and the explanation must state that override explicitly.
3. Exactly one option per record has "is_correct": true.
4. The "en" and "es" records must each be complete on their own. In the Spanish record keep technical and domain terminology untranslated: product and service names, SQL/CLI keywords, code, and the option letters.
5. Omit image_explanation from the Spanish record."#,
        id = question_id,
        next = question_id + 1,
    )
}
