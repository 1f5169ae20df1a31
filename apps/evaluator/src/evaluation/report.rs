//! Reporter — console summary, JSON result and markdown report per candidate.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info};

use crate::errors::EvaluationError;
use crate::models::evaluation::EvaluationResult;

pub fn json_file_name(candidate_id: &str) -> String {
    format!("cv{candidate_id}_evaluation.json")
}

pub fn report_file_name(candidate_id: &str) -> String {
    format!("cv{candidate_id}_evaluation_report.md")
}

pub fn prompt_file_name(candidate_id: &str) -> String {
    format!("cv{candidate_id}_prompt.txt")
}

/// Where a candidate's outputs landed. `report` is `None` when only the JSON was written.
#[derive(Debug, Clone)]
pub struct PersistedPaths {
    pub json: PathBuf,
    pub report: Option<PathBuf>,
}

/// Serializes with 4-space indentation.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn render_console(result: &EvaluationResult, candidate_id: &str) -> String {
    let mut out = format!("\n--- Evaluation Results for CV{candidate_id} ---\n");
    out.push_str(&format!("Match Score: {}\n", result.match_score));
    out.push_str(&format!("Summary: {}\n", result.summary));
    out.push_str("Strengths:\n");
    for strength in &result.strengths {
        out.push_str(&format!("  - {strength}\n"));
    }
    out.push_str("Missing Requirements:\n");
    for req in &result.missing_requirements {
        out.push_str(&format!("  - {req}\n"));
    }
    out.push_str(&format!("Verdict: {}\n", result.verdict));
    out.push_str("\n--- End of Evaluation ---\n");
    out
}

pub fn render_markdown(result: &EvaluationResult, candidate_id: &str) -> String {
    let mut md = format!("# CV{candidate_id} Evaluation Report\n\n");
    md.push_str(&format!("## Match Score: {}\n\n", result.match_score));
    md.push_str(&format!("### Summary:\n{}\n\n", result.summary));
    md.push_str("### Strengths:\n");
    push_bullets(&mut md, &result.strengths);
    md.push_str("### Missing Requirements:\n");
    push_bullets(&mut md, &result.missing_requirements);
    md.push_str(&format!("### Verdict:\n{}\n", result.verdict));
    md
}

fn push_bullets(md: &mut String, items: &[String]) {
    if items.is_empty() {
        md.push_str("_None_\n");
    }
    for item in items {
        md.push_str(&format!("- {item}\n"));
    }
    md.push('\n');
}

async fn write_file(path: &Path, contents: &str) -> Result<(), EvaluationError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| EvaluationError::Persist {
            path: path.to_path_buf(),
            source,
        })
}

pub async fn ensure_dir(dir: &Path) -> Result<(), EvaluationError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| EvaluationError::Persist {
            path: dir.to_path_buf(),
            source,
        })
}

/// Writes the JSON result, then the markdown report.
///
/// A report failure after the JSON is on disk is logged and swallowed; the JSON stands.
pub async fn persist(
    result: &EvaluationResult,
    candidate_id: &str,
    output_dir: &Path,
) -> Result<PersistedPaths, EvaluationError> {
    ensure_dir(output_dir).await?;

    let json_path = output_dir.join(json_file_name(candidate_id));
    let json = to_json_pretty(result).map_err(|e| EvaluationError::Persist {
        path: json_path.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    write_file(&json_path, &json).await?;
    info!("Evaluation saved to: {}", json_path.display());

    let report_path = output_dir.join(report_file_name(candidate_id));
    let report = match write_file(&report_path, &render_markdown(result, candidate_id)).await {
        Ok(()) => {
            info!("Report saved: {}", report_path.display());
            Some(report_path)
        }
        Err(e) => {
            error!("Error generating report for CV{candidate_id}: {e}");
            None
        }
    };

    Ok(PersistedPaths {
        json: json_path,
        report,
    })
}

/// Saves the composed prompt for inspection. Failures are logged only.
pub async fn save_prompt(prompt: &str, candidate_id: &str, output_dir: &Path) {
    let path = output_dir.join(prompt_file_name(candidate_id));
    let outcome = match ensure_dir(output_dir).await {
        Ok(()) => write_file(&path, prompt).await,
        Err(e) => Err(e),
    };
    if let Err(e) = outcome {
        error!("Could not save prompt for CV{candidate_id}: {e}");
    }
}
