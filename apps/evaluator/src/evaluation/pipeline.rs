//! Evaluation pipeline — runs candidates one after another against a shared job description.
//!
//! Flow per candidate: load → build prompt → generate → parse → score → persist.
//! A failure skips that candidate only; the batch always runs to the end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::errors::EvaluationError;
use crate::evaluation::loader::load_document;
use crate::evaluation::parser::parse_response;
use crate::evaluation::prompts::build_evaluation_prompt;
use crate::evaluation::report::{self, PersistedPaths};
use crate::evaluation::scoring::{build_result, MatchScorer};
use crate::llm_client::GenerationService;
use crate::models::evaluation::{Document, EvaluationRequest, EvaluationResult, Verdict};

pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Evaluated,
    Skipped,
}

/// One line of the run manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub candidate_id: String,
    pub source: PathBuf,
    pub status: CandidateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

/// Manifest written to `run_summary.json` after every batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub model: String,
    pub scoring_mode: String,
    pub job_description: PathBuf,
    pub candidates: Vec<CandidateRecord>,
}

impl RunSummary {
    pub fn evaluated(&self) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.status == CandidateStatus::Evaluated)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.candidates.len() - self.evaluated()
    }
}

/// A successfully evaluated candidate.
#[derive(Debug, Clone)]
pub struct CandidateOutcome {
    pub result: EvaluationResult,
    pub paths: PersistedPaths,
}

/// Drives evaluations. Holds the injected service and scorer; no global state.
pub struct Evaluator {
    service: Arc<dyn GenerationService>,
    scorer: Arc<dyn MatchScorer>,
    output_dir: PathBuf,
    save_prompts: bool,
}

impl Evaluator {
    pub fn new(
        service: Arc<dyn GenerationService>,
        scorer: Arc<dyn MatchScorer>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            service,
            scorer,
            output_dir,
            save_prompts: false,
        }
    }

    pub fn with_saved_prompts(mut self, save_prompts: bool) -> Self {
        self.save_prompts = save_prompts;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs one candidate end to end. Nothing is written unless scoring succeeds;
    /// the optional prompt dump follows the persisted result.
    pub async fn evaluate_candidate(
        &self,
        jd: &Document,
        request: &EvaluationRequest,
    ) -> Result<CandidateOutcome, EvaluationError> {
        let id = request.candidate_id.as_str();
        info!("Evaluating CV{id}...");

        let cv = load_document(&request.cv_path).await?;
        let prompt = build_evaluation_prompt(&jd.text, &cv.text);
        debug!(
            "Built prompt for CV{id} from {} and {} ({} chars)",
            jd.source.display(),
            cv.source.display(),
            prompt.len()
        );

        info!("Calling {} for CV{id}...", self.service.model());
        let raw_text = self.service.generate(&prompt).await?;

        let raw = parse_response(&raw_text)?;
        let result = build_result(raw, self.scorer.as_ref())?;

        println!("{}", report::render_console(&result, id));

        let paths = report::persist(&result, id, &self.output_dir).await?;
        if self.save_prompts {
            report::save_prompt(&prompt, id, &self.output_dir).await;
        }
        Ok(CandidateOutcome { result, paths })
    }

    /// Evaluates every CV in order. Candidate ids are 1-based positions in `cv_paths`.
    pub async fn run_batch(&self, jd_path: &Path, cv_paths: &[PathBuf]) -> RunSummary {
        let started_at = Utc::now();
        let jd = load_document(jd_path).await;
        if let Err(e) = &jd {
            error!("Job description unavailable: {e}");
        }

        let mut candidates = Vec::with_capacity(cv_paths.len());
        for (idx, cv_path) in cv_paths.iter().enumerate() {
            let request = EvaluationRequest {
                candidate_id: (idx + 1).to_string(),
                cv_path: cv_path.clone(),
            };

            let outcome = match &jd {
                Ok(jd) => self.evaluate_candidate(jd, &request).await,
                Err(e) => Err(reload_error(jd_path, e)),
            };

            candidates.push(record_outcome(&request, outcome));
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now(),
            model: self.service.model().to_string(),
            scoring_mode: self.scorer.mode().to_string(),
            job_description: jd_path.to_path_buf(),
            candidates,
        };

        self.write_summary(&summary).await;
        info!(
            "Batch finished: {} evaluated, {} skipped",
            summary.evaluated(),
            summary.skipped()
        );
        summary
    }

    async fn write_summary(&self, summary: &RunSummary) {
        if let Err(e) = self.write_summary_file(summary).await {
            error!("Could not write run summary: {e}");
        }
    }

    async fn write_summary_file(&self, summary: &RunSummary) -> Result<(), EvaluationError> {
        let path = self.output_dir.join(RUN_SUMMARY_FILE);
        report::ensure_dir(&self.output_dir).await?;
        let json = report::to_json_pretty(summary).map_err(|e| EvaluationError::Persist {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|source| EvaluationError::Persist {
                path: path.clone(),
                source,
            })
    }
}

/// `EvaluationError` is not `Clone`; each candidate gets its own copy of the JD failure.
fn reload_error(jd_path: &Path, err: &EvaluationError) -> EvaluationError {
    match err {
        EvaluationError::NotFound { .. } => EvaluationError::NotFound {
            path: jd_path.to_path_buf(),
        },
        EvaluationError::EmptyDocument { .. } => EvaluationError::EmptyDocument {
            path: jd_path.to_path_buf(),
        },
        EvaluationError::ReadError { source, .. } => EvaluationError::ReadError {
            path: jd_path.to_path_buf(),
            source: std::io::Error::new(source.kind(), source.to_string()),
        },
        other => EvaluationError::ReadError {
            path: jd_path.to_path_buf(),
            source: std::io::Error::other(other.to_string()),
        },
    }
}

fn record_outcome(
    request: &EvaluationRequest,
    outcome: Result<CandidateOutcome, EvaluationError>,
) -> CandidateRecord {
    let id = &request.candidate_id;
    match outcome {
        Ok(outcome) => {
            if outcome.paths.report.is_none() {
                warn!(
                    "CV{id}: {} was saved without its report",
                    outcome.paths.json.display()
                );
            }
            CandidateRecord {
                candidate_id: id.clone(),
                source: request.cv_path.clone(),
                status: CandidateStatus::Evaluated,
                error: None,
                error_kind: None,
                match_score: Some(outcome.result.match_score),
                verdict: Some(outcome.result.verdict),
            }
        }
        Err(e) => {
            match &e {
                EvaluationError::MalformedResponse { reason, raw } => {
                    error!("Error parsing JSON response for CV{id} ({reason}): {raw}")
                }
                EvaluationError::EmptyDocument { .. } => {
                    warn!("Skipping CV{id} due to missing text data: {e}")
                }
                _ => error!("Skipping CV{id}: {e}"),
            }
            CandidateRecord {
                candidate_id: id.clone(),
                source: request.cv_path.clone(),
                status: CandidateStatus::Skipped,
                error: Some(e.to_string()),
                error_kind: Some(e.kind().to_string()),
                match_score: None,
                verdict: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::evaluation::scoring::{HeuristicScorer, TrustScorer};
    use crate::llm_client::{LlmError, UnavailableService};

    const STRONG_REPLY: &str = r#"{"match_score":88,"summary":"Strong candidate","strengths":["Go"],"missing_requirements":[],"verdict":"strong match"}"#;

    /// Replays canned replies in call order and records the prompts it saw.
    struct FakeService {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerationService for FakeService {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn output_files(dir: &Path, id: &str) -> (PathBuf, PathBuf) {
        (
            dir.join(report::json_file_name(id)),
            dir.join(report::report_file_name(id)),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_strong_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires 5 years Go experience");
        let cv = write(dir.path(), "cv1.txt", "5 years Go, 2 years Rust");

        let service = FakeService::new(vec![Ok(STRONG_REPLY.to_string())]);
        let evaluator = Evaluator::new(service.clone(), Arc::new(TrustScorer), out.clone());

        let summary = evaluator.run_batch(&jd, &[cv]).await;
        assert_eq!(summary.evaluated(), 1);

        let (json_path, report_path) = output_files(&out, "1");
        let result: EvaluationResult =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(result.match_score, 88);
        assert_eq!(result.verdict, Verdict::StrongMatch);
        assert_eq!(result.strengths, vec!["Go".to_string()]);

        let md = std::fs::read_to_string(report_path).unwrap();
        assert!(md.lines().any(|l| l == "## Match Score: 88"));

        let prompts = service.prompts.lock().unwrap();
        assert!(prompts[0].contains("Requires 5 years Go experience"));
        assert!(prompts[0].contains("5 years Go, 2 years Rust"));
    }

    #[tokio::test]
    async fn test_missing_cv_is_skipped_without_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cv2 = write(dir.path(), "cv2.txt", "Go developer");

        let service = FakeService::new(vec![Ok(STRONG_REPLY.to_string())]);
        let evaluator = Evaluator::new(service.clone(), Arc::new(TrustScorer), out.clone());

        let summary = evaluator
            .run_batch(&jd, &[dir.path().join("missing.txt"), cv2])
            .await;

        assert_eq!(summary.candidates[0].status, CandidateStatus::Skipped);
        assert_eq!(summary.candidates[0].error_kind.as_deref(), Some("not_found"));
        assert_eq!(summary.candidates[1].status, CandidateStatus::Evaluated);
        assert_eq!(service.calls(), 1);

        let (json1, report1) = output_files(&out, "1");
        assert!(!json1.exists());
        assert!(!report1.exists());
        assert!(output_files(&out, "2").0.exists());
    }

    #[tokio::test]
    async fn test_missing_job_description_skips_everyone() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let cv = write(dir.path(), "cv1.txt", "Go developer");

        let service = FakeService::new(vec![]);
        let evaluator = Evaluator::new(service.clone(), Arc::new(TrustScorer), out.clone());

        let summary = evaluator
            .run_batch(&dir.path().join("jd.txt"), &[cv.clone(), cv])
            .await;

        assert_eq!(summary.skipped(), 2);
        assert!(summary
            .candidates
            .iter()
            .all(|c| c.error_kind.as_deref() == Some("not_found")));
        assert_eq!(service.calls(), 0);
        assert!(!output_files(&out, "1").0.exists());
        assert!(!output_files(&out, "2").0.exists());
    }

    #[tokio::test]
    async fn test_malformed_reply_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cv1 = write(dir.path(), "cv1.txt", "Java developer");
        let cv2 = write(dir.path(), "cv2.txt", "Go developer");

        let service = FakeService::new(vec![
            Ok("I think this candidate is great!".to_string()),
            Ok(format!("```json\n{STRONG_REPLY}\n```")),
        ]);
        let evaluator = Evaluator::new(service, Arc::new(TrustScorer), out.clone());

        let summary = evaluator.run_batch(&jd, &[cv1, cv2]).await;

        assert_eq!(
            summary.candidates[0].error_kind.as_deref(),
            Some("malformed_response")
        );
        assert!(!output_files(&out, "1").0.exists());
        assert_eq!(summary.candidates[1].match_score, Some(88));
        assert!(output_files(&out, "2").1.exists());
    }

    #[tokio::test]
    async fn test_service_failures_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cvs: Vec<PathBuf> = (1..=4)
            .map(|i| write(dir.path(), &format!("cv{i}.txt"), "Go developer"))
            .collect();

        let service = FakeService::new(vec![
            Err(LlmError::EmptyContent),
            Err(LlmError::Api {
                status: 500,
                message: "internal".to_string(),
            }),
            Ok(r#"{"summary": "no score here"}"#.to_string()),
            Ok(STRONG_REPLY.to_string()),
        ]);
        let evaluator = Evaluator::new(service, Arc::new(TrustScorer), out.clone());

        let summary = evaluator.run_batch(&jd, &cvs).await;
        let kinds: Vec<Option<&str>> = summary
            .candidates
            .iter()
            .map(|c| c.error_kind.as_deref())
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some("empty_response"),
                Some("service_call"),
                Some("score_missing"),
                None
            ]
        );
        for id in ["1", "2", "3"] {
            assert!(!output_files(&out, id).0.exists());
        }
        assert!(output_files(&out, "4").0.exists());
    }

    #[tokio::test]
    async fn test_heuristic_mode_recomputes_score() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cv = write(dir.path(), "cv1.txt", "Go developer");

        let service = FakeService::new(vec![Ok(STRONG_REPLY.to_string())]);
        let evaluator = Evaluator::new(service, Arc::new(HeuristicScorer), out.clone());

        let summary = evaluator.run_batch(&jd, &[cv]).await;
        assert_eq!(summary.scoring_mode, "heuristic");
        assert_eq!(summary.candidates[0].match_score, Some(85));
        assert_eq!(summary.candidates[0].verdict, Some(Verdict::StrongMatch));
    }

    #[tokio::test]
    async fn test_run_summary_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cv = write(dir.path(), "cv1.txt", "Go developer");

        let service = FakeService::new(vec![Ok(STRONG_REPLY.to_string())]);
        let evaluator = Evaluator::new(service, Arc::new(TrustScorer), out.clone());
        evaluator.run_batch(&jd, &[cv]).await;

        let text = std::fs::read_to_string(out.join(RUN_SUMMARY_FILE)).unwrap();
        let manifest: RunSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(manifest.model, "fake-model");
        assert_eq!(manifest.scoring_mode, "trust");
        assert_eq!(manifest.candidates.len(), 1);
        assert!(manifest.finished_at >= manifest.started_at);
    }

    #[tokio::test]
    async fn test_saved_prompt_matches_sent_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cv = write(dir.path(), "cv1.txt", "Go developer");

        let service = FakeService::new(vec![Ok(STRONG_REPLY.to_string())]);
        let evaluator = Evaluator::new(service.clone(), Arc::new(TrustScorer), out.clone())
            .with_saved_prompts(true);
        evaluator.run_batch(&jd, &[cv]).await;

        let saved = std::fs::read_to_string(out.join(report::prompt_file_name("1"))).unwrap();
        assert_eq!(saved, service.prompts.lock().unwrap()[0]);
    }

    #[tokio::test]
    async fn test_failed_candidate_leaves_no_prompt_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cv = write(dir.path(), "cv1.txt", "Go developer");

        let service = FakeService::new(vec![Ok("not json".to_string())]);
        let evaluator = Evaluator::new(service.clone(), Arc::new(TrustScorer), out.clone())
            .with_saved_prompts(true);
        let summary = evaluator.run_batch(&jd, &[cv]).await;

        assert_eq!(service.calls(), 1);
        assert_eq!(summary.skipped(), 1);
        assert!(!out.join(report::prompt_file_name("1")).exists());
    }

    #[tokio::test]
    async fn test_blank_reply_is_empty_response() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cv = write(dir.path(), "cv1.txt", "Go developer");

        let service = FakeService::new(vec![Ok("  \n ".to_string())]);
        let evaluator = Evaluator::new(service, Arc::new(TrustScorer), out.clone());
        let summary = evaluator.run_batch(&jd, &[cv]).await;

        assert_eq!(
            summary.candidates[0].error_kind.as_deref(),
            Some("empty_response")
        );
        assert!(!output_files(&out, "1").0.exists());
    }

    #[tokio::test]
    async fn test_unavailable_service_skips_everyone_and_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let jd = write(dir.path(), "jd.txt", "Requires Go");
        let cv1 = write(dir.path(), "cv1.txt", "Go developer");
        let cv2 = write(dir.path(), "cv2.txt", "Rust developer");

        let service = Arc::new(UnavailableService::new("gemini-2.5-flash", "API key is empty"));
        let evaluator = Evaluator::new(service, Arc::new(TrustScorer), out.clone());
        let summary = evaluator.run_batch(&jd, &[cv1, cv2]).await;

        assert_eq!(summary.skipped(), 2);
        for record in &summary.candidates {
            assert_eq!(record.status, CandidateStatus::Skipped);
            assert_eq!(record.error_kind.as_deref(), Some("service_init"));
            assert!(record
                .error
                .as_deref()
                .is_some_and(|e| e.contains("API key is empty")));
        }
        assert!(!output_files(&out, "1").0.exists());
        assert!(!output_files(&out, "2").0.exists());

        let text = std::fs::read_to_string(out.join(RUN_SUMMARY_FILE)).unwrap();
        let manifest: RunSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(manifest.model, "gemini-2.5-flash");
        assert_eq!(manifest.skipped(), 2);
    }
}
