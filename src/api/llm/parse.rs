//! Reply parsing: direct parse, one code-fence repair, then failure.
//!
//! Vision models routinely wrap JSON in a markdown fence despite being told
//! not to. That is the one malformation repaired here; anything else is
//! reported to the caller unretried.

use crate::app::record::BilingualRecord;

/// Outcome of parsing one model reply.
#[derive(Debug)]
pub enum ReplyParse {
    /// Parsed as-is.
    Direct(BilingualRecord),
    /// Parsed after stripping a surrounding code fence.
    Repaired(BilingualRecord),
    Failed { error: String },
}

pub fn parse_reply(raw: &str) -> ReplyParse {
    let trimmed = raw.trim();
    let first_error = match serde_json::from_str::<BilingualRecord>(trimmed) {
        Ok(record) => return ReplyParse::Direct(record),
        Err(e) => e,
    };

    if let Some(stripped) = strip_code_fence(trimmed) {
        return match serde_json::from_str::<BilingualRecord>(stripped) {
            Ok(record) => ReplyParse::Repaired(record),
            Err(e) => ReplyParse::Failed {
                error: format!("reply is not a bilingual record even after fence repair: {e}"),
            },
        };
    }

    ReplyParse::Failed {
        error: format!("reply is not a bilingual record: {first_error}"),
    }
}

/// Removes a surrounding ``` / ```json fence. Returns None when the reply
/// is not fenced, so the caller can tell repair apart from a plain retry.
fn strip_code_fence(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix("```")?;
    // Language tag on the opening fence ("json", "JSON", ...).
    let rest = rest
        .split_once('\n')
        .map(|(first_line, body)| {
            if first_line.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
                body
            } else {
                rest
            }
        })
        .unwrap_or(rest);
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    Some(rest.trim())
}
