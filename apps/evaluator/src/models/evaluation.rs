use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Categorical outcome derived from the final match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "strong match")]
    StrongMatch,
    #[serde(rename = "possible match")]
    PossibleMatch,
    #[serde(rename = "not a match")]
    NotAMatch,
}

impl Verdict {
    /// score ≥ 80 → strong, 50–79 → possible, below 50 → not a match.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Verdict::StrongMatch,
            50..=79 => Verdict::PossibleMatch,
            _ => Verdict::NotAMatch,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::StrongMatch => "strong match",
            Verdict::PossibleMatch => "possible match",
            Verdict::NotAMatch => "not a match",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A loaded input text. Immutable once read.
#[derive(Debug, Clone)]
pub struct Document {
    pub source: PathBuf,
    pub text: String,
}

/// One candidate to evaluate against the shared job description.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub candidate_id: String,
    pub cv_path: PathBuf,
}

/// Final evaluation written to `cv<id>_evaluation.json`. Never mutated once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub match_score: u8,
    pub summary: String,
    pub strengths: Vec<String>,
    pub missing_requirements: Vec<String>,
    pub verdict: Verdict,
}
