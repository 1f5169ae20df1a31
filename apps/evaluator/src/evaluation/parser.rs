//! Response Parser — normalises the service's reply and decodes it as a partial evaluation.
//!
//! Accepted wrapping, after trimming surrounding whitespace:
//! - opening fence "```json" (any case) or a bare "```"
//! - closing fence "```" at the very end (optional, also stripped without an opening fence)
//!
//! Anything else is decoded as is. Decode failures are never repaired. A blank reply is
//! `EmptyResponse`, not a decode failure.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::EvaluationError;

const FENCE: &str = "```";
const JSON_TAG: &str = "json";

/// Decoded reply. Every field is optional; defaults are substituted by the scorer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvaluation {
    #[serde(default)]
    pub match_score: Option<Value>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub strengths: Option<Vec<String>>,
    #[serde(default)]
    pub missing_requirements: Option<Vec<String>>,
    #[serde(default)]
    pub verdict: Option<String>,
}

impl RawEvaluation {
    /// The reported score as an integer. Integral floats count; fractions, strings
    /// and nulls do not.
    pub fn reported_score(&self) -> Option<i64> {
        match self.match_score.as_ref()? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }
}

/// Strips code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix(FENCE) else {
        return text.strip_suffix(FENCE).map(str::trim_end).unwrap_or(text);
    };

    let rest = match rest.get(..JSON_TAG.len()) {
        Some(tag) if tag.eq_ignore_ascii_case(JSON_TAG) => &rest[JSON_TAG.len()..],
        _ => rest,
    };
    let rest = rest.trim_start();

    rest.strip_suffix(FENCE).map(str::trim).unwrap_or(rest)
}

/// Decodes the service reply into a `RawEvaluation`.
pub fn parse_response(raw: &str) -> Result<RawEvaluation, EvaluationError> {
    if raw.trim().is_empty() {
        return Err(EvaluationError::EmptyResponse);
    }
    let cleaned = strip_json_fences(raw);
    serde_json::from_str::<RawEvaluation>(cleaned).map_err(|e| {
        EvaluationError::MalformedResponse {
            reason: e.to_string(),
            raw: cleaned.to_string(),
        }
    })
}
