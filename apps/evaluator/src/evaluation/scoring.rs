//! Scoring — pluggable, trait-based match scorer over a decoded reply.
//!
//! `TrustScorer` (default) keeps the service-reported score.
//! `HeuristicScorer` ignores it and classifies by keywords in the summary.
//!
//! Either way the verdict is recomputed from the final score; the service's own label is
//! never written out.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::errors::EvaluationError;
use crate::evaluation::parser::RawEvaluation;
use crate::models::evaluation::{EvaluationResult, Verdict};

pub const DEFAULT_SUMMARY: &str = "No summary available.";

const HEURISTIC_STRONG: u8 = 85;
const HEURISTIC_POSSIBLE: u8 = 60;
const HEURISTIC_FALLBACK: u8 = 30;

/// Which score is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    #[default]
    Trust,
    Heuristic,
}

impl ScoringMode {
    pub fn scorer(self) -> Arc<dyn MatchScorer> {
        match self {
            ScoringMode::Trust => Arc::new(TrustScorer),
            ScoringMode::Heuristic => Arc::new(HeuristicScorer),
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown scoring mode '{0}' (expected 'trust' or 'heuristic')")]
pub struct UnknownScoringMode(pub String);

impl FromStr for ScoringMode {
    type Err = UnknownScoringMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust" => Ok(ScoringMode::Trust),
            "heuristic" => Ok(ScoringMode::Heuristic),
            other => Err(UnknownScoringMode(other.to_string())),
        }
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Trust => f.write_str("trust"),
            ScoringMode::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// Implement this to change how the final match score is chosen.
pub trait MatchScorer: Send + Sync {
    fn score(&self, raw: &RawEvaluation) -> Result<u8, EvaluationError>;

    fn mode(&self) -> ScoringMode;
}

/// Uses the reported `match_score` when it is an integer in 0–100.
pub struct TrustScorer;

impl MatchScorer for TrustScorer {
    fn score(&self, raw: &RawEvaluation) -> Result<u8, EvaluationError> {
        raw.reported_score()
            .filter(|s| (0..=100).contains(s))
            .and_then(|s| u8::try_from(s).ok())
            .ok_or(EvaluationError::ScoreMissing)
    }

    fn mode(&self) -> ScoringMode {
        ScoringMode::Trust
    }
}

/// Case-insensitive keyword match on the summary: "strong" → 85, "possible" → 60, else 30.
pub struct HeuristicScorer;

impl MatchScorer for HeuristicScorer {
    fn score(&self, raw: &RawEvaluation) -> Result<u8, EvaluationError> {
        let summary = raw.summary.as_deref().unwrap_or_default().to_lowercase();
        let score = if summary.contains("strong") {
            HEURISTIC_STRONG
        } else if summary.contains("possible") {
            HEURISTIC_POSSIBLE
        } else {
            HEURISTIC_FALLBACK
        };
        Ok(score)
    }

    fn mode(&self) -> ScoringMode {
        ScoringMode::Heuristic
    }
}

/// Applies `scorer`, derives the verdict and fills defaults for missing fields.
pub fn build_result(
    raw: RawEvaluation,
    scorer: &dyn MatchScorer,
) -> Result<EvaluationResult, EvaluationError> {
    let match_score = scorer.score(&raw)?;
    let verdict = Verdict::from_score(match_score);

    if let Some(reported) = raw.verdict.as_deref() {
        if !reported.trim().eq_ignore_ascii_case(verdict.label()) {
            warn!(
                "Reported verdict '{}' disagrees with score {}, using '{}'",
                reported, match_score, verdict
            );
        }
    }

    Ok(EvaluationResult {
        match_score,
        summary: raw.summary.unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        strengths: raw.strengths.unwrap_or_default(),
        missing_requirements: raw.missing_requirements.unwrap_or_default(),
        verdict,
    })
}
