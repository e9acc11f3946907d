//! Normalization of classifier output into the canonical verdict.
//!
//! Backends are asked for bare JSON but often wrap it in prose or markdown
//! fences. A strict parse is tried first; if that fails, the first balanced
//! JSON object in the text is extracted and parsed again.

use tracing::{debug, warn};
use vdetect_models::{ClassificationError, ClassificationResult, NormalizedResult};

/// Longest prefix of raw output included in debug logs.
const RAW_LOG_LIMIT: usize = 512;

/// Parse raw classifier output into a verdict.
///
/// Scores outside `[0, 100]` are clamped. The raw text never appears in the
/// returned error.
pub fn normalize(raw: &str) -> ClassificationResult<NormalizedResult> {
    let mut result = match parse_strict(raw) {
        Ok(result) => result,
        Err(strict_err) => {
            debug!(
                raw = %truncate(raw, RAW_LOG_LIMIT),
                "Strict parse failed ({}), attempting repair", strict_err
            );
            let candidate = extract_json_object(raw).ok_or_else(|| {
                warn!(raw_len = raw.len(), "Classifier output contains no JSON object");
                ClassificationError::unparseable(format!("no JSON object found: {}", strict_err))
            })?;
            parse_strict(candidate).map_err(|e| {
                warn!(raw_len = raw.len(), "Repaired classifier output still invalid: {}", e);
                ClassificationError::unparseable(e.to_string())
            })?
        }
    };

    if result.clamp_scores() {
        warn!("Classifier returned scores outside [0, 100]; clamped");
    }

    Ok(result)
}

fn parse_strict(text: &str) -> Result<NormalizedResult, serde_json::Error> {
    serde_json::from_str(text.trim())
}

/// Extract the first `{ ... }` span whose braces balance.
///
/// Braces inside JSON strings are ignored. If the object never closes, the
/// span runs to the last `}` in the text.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
