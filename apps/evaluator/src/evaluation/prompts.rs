// Prompt template for CV evaluation.

/// Evaluation prompt template. Replace `{jd_text}` and `{cv_text}` before sending.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate how well the candidate CV below matches the job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "match_score": 0,
  "summary": "One or two sentences on overall fit",
  "strengths": ["Requirement the candidate clearly meets"],
  "missing_requirements": ["Requirement the CV does not evidence"],
  "verdict": "strong match"
}

Rules:
- "match_score" is an integer from 0 to 100.
- "summary" is a string.
- "strengths" and "missing_requirements" are arrays of strings; use [] when there are none.
- "verdict" is exactly one of: "strong match", "possible match", "not a match".
- Judge only from the text provided. Do NOT invent experience the CV does not state.

Job Description:
{jd_text}

Candidate CV:
{cv_text}"#;

/// Builds the evaluation prompt. Deterministic: same inputs, same string.
pub fn build_evaluation_prompt(jd_text: &str, cv_text: &str) -> String {
    // This order keeps placeholder-like text inside either document literal.
    EVALUATION_PROMPT_TEMPLATE
        .replace("{cv_text}", cv_text)
        .replacen("{jd_text}", jd_text, 1)
}
