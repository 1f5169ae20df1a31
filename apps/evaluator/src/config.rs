use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::evaluation::scoring::ScoringMode;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Input locations. Candidate ids are the 1-based position in `--cv`.
#[derive(Debug, Clone, Parser)]
#[command(name = "cv-evaluator", version, about = "Score candidate CVs against a job description")]
pub struct Cli {
    /// Job description text file.
    #[arg(long, default_value = "sample_inputs/jd.txt")]
    pub jd: PathBuf,

    /// Candidate CV text file. Repeat for each candidate.
    #[arg(
        long = "cv",
        default_values = ["sample_inputs/cv1.txt", "sample_inputs/cv2.txt", "sample_inputs/cv3.txt"]
    )]
    pub cvs: Vec<PathBuf>,

    /// Overrides OUTPUT_DIR.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Overrides SCORING_MODE (`trust` or `heuristic`).
    #[arg(long)]
    pub scoring_mode: Option<ScoringMode>,
}

/// Runtime configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    /// `None` leaves the service call unbounded.
    pub request_timeout: Option<Duration>,
    pub scoring_mode: ScoringMode,
    pub output_dir: PathBuf,
    pub save_prompts: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: env_or("GEMINI_MODEL", DEFAULT_MODEL),
            gemini_api_base: env_or("GEMINI_API_BASE", DEFAULT_API_BASE),
            request_timeout: parse_timeout(std::env::var("REQUEST_TIMEOUT_SECS").ok().as_deref())?,
            scoring_mode: parse_scoring_mode(std::env::var("SCORING_MODE").ok().as_deref())?,
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "outputs")),
            save_prompts: parse_flag(std::env::var("SAVE_PROMPTS").ok().as_deref()),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Command-line values win over the environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(mode) = cli.scoring_mode {
            self.scoring_mode = mode;
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_timeout(raw: Option<&str>) -> Result<Option<Duration>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let secs = raw
        .parse::<u64>()
        .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?;
    if secs == 0 {
        bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
    }
    Ok(Some(Duration::from_secs(secs)))
}

fn parse_scoring_mode(raw: Option<&str>) -> Result<ScoringMode> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw
            .parse::<ScoringMode>()
            .context("SCORING_MODE must be 'trust' or 'heuristic'"),
        None => Ok(ScoringMode::default()),
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}
