// Prompt constants for resume evaluation.
// The field names below are the contract with parser.rs; change both together.

use crate::evaluation::models::JobRole;

pub const FIELD_SKILLS: &str = "skills";
pub const FIELD_EXPERIENCE_SUMMARY: &str = "experience_summary";
pub const FIELD_MATCH_SCORE: &str = "match_score";
pub const FIELD_MISSING_SKILLS: &str = "missing_skills";

/// Keeps the answer machine-readable; the parser still tolerates fences.
const JSON_ONLY: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// System instruction for resume analysis.
pub fn analysis_system() -> String {
    format!(
        "You are an experienced technical recruiter who evaluates resumes against job \
        descriptions. {JSON_ONLY}"
    )
}

/// Analysis prompt template.
/// Replace: {job_role}, {job_description}, {resume_text}
const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following resume and job description. Extract key skills, summarize work experience, and calculate a match score (0-100) for the job role: {job_role}.

Return a JSON object with EXACTLY these four fields and no others:
{
  "skills": ["Python", "SQL"],
  "experience_summary": "Two years building reporting pipelines",
  "match_score": 75,
  "missing_skills": ["AWS"]
}

Field rules:
- skills: array of strings, skills found in the resume
- experience_summary: string, short summary of the work experience
- match_score: integer between 0 and 100 indicating alignment with the job role
- missing_skills: array of strings, skills from the job description not found in the resume
Use an empty array when there is nothing to list.

JOB DESCRIPTION:
{job_description}

RESUME:
{resume_text}"#;

/// Builds the analysis prompt. Pure and deterministic.
pub fn build_prompt(resume_text: &str, job_description: &str, job_role: JobRole) -> String {
    // Resume text goes last so braces inside it are never re-substituted.
    ANALYSIS_PROMPT_TEMPLATE
        .replace("{job_role}", job_role.label())
        .replace("{job_description}", job_description)
        .replace("{resume_text}", resume_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt("Python, SQL", "Analyze data", JobRole::DataScientist);
        let b = build_prompt("Python, SQL", "Analyze data", JobRole::DataScientist);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_contains_inputs_and_all_fields() {
        let prompt = build_prompt("Python, SQL", "Needs AWS", JobRole::DataScientist);
        assert!(prompt.contains("job role: Data Scientist"));
        assert!(prompt.contains("Needs AWS"));
        assert!(prompt.ends_with("Python, SQL"));
        for field in [
            FIELD_SKILLS,
            FIELD_EXPERIENCE_SUMMARY,
            FIELD_MATCH_SCORE,
            FIELD_MISSING_SKILLS,
        ] {
            assert!(prompt.contains(&format!("\"{field}\"")), "missing {field}");
        }
    }

    #[test]
    fn test_placeholders_in_resume_are_left_alone() {
        let prompt = build_prompt("uses {job_role} literally", "jd", JobRole::DataAnalyst);
        assert!(prompt.contains("uses {job_role} literally"));
    }

    #[test]
    fn test_system_demands_json() {
        assert!(analysis_system().contains("valid JSON only"));
    }
}
