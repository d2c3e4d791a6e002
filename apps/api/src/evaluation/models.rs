use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_EMAIL: &str = "N/A";

/// Role a resume is scored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobRole {
    DataScientist,
    SoftwareEngineer,
    DataAnalyst,
    MachineLearningEngineer,
    DataEngineer,
}

impl JobRole {
    pub const ALL: [JobRole; 5] = [
        JobRole::DataScientist,
        JobRole::SoftwareEngineer,
        JobRole::DataAnalyst,
        JobRole::MachineLearningEngineer,
        JobRole::DataEngineer,
    ];

    pub fn label(self) -> &'static str {
        match self {
            JobRole::DataScientist => "Data Scientist",
            JobRole::SoftwareEngineer => "Software Engineer",
            JobRole::DataAnalyst => "Data Analyst",
            JobRole::MachineLearningEngineer => "Machine Learning Engineer",
            JobRole::DataEngineer => "Data Engineer",
        }
    }
}

impl fmt::Display for JobRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownJobRole(pub String);

impl fmt::Display for UnknownJobRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job role '{}'", self.0)
    }
}

impl std::error::Error for UnknownJobRole {}

impl FromStr for JobRole {
    type Err = UnknownJobRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        JobRole::ALL
            .into_iter()
            .find(|r| r.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownJobRole(wanted.to_string()))
    }
}

impl Serialize for JobRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for JobRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Resume as handed to the pipeline: either an uploaded document or text.
#[derive(Debug, Clone)]
pub enum ResumeInput {
    Document { bytes: Bytes, content_type: String },
    Text(String),
}

/// Who the resume belongs to. Blank values fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateIdentity {
    pub name: String,
    pub email: String,
}

impl CandidateIdentity {
    pub fn new(name: Option<&str>, email: Option<&str>) -> Self {
        Self {
            name: non_blank(name).unwrap_or(DEFAULT_NAME).to_string(),
            email: non_blank(email).unwrap_or(DEFAULT_EMAIL).to_string(),
        }
    }
}

impl Default for CandidateIdentity {
    fn default() -> Self {
        Self::new(None, None)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// One row of bulk input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub identity: CandidateIdentity,
    pub resume_text: String,
}

impl CandidateRecord {
    pub fn new(name: Option<&str>, email: Option<&str>, resume_text: &str) -> Self {
        Self {
            identity: CandidateIdentity::new(name, email),
            resume_text: resume_text.to_string(),
        }
    }
}

/// Validated input to the model stage. Construct through [`EvaluationRequest::new`].
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    resume_text: String,
    job_description: String,
    job_role: JobRole,
}

impl EvaluationRequest {
    /// Rejects blank resume text or job description before any model call.
    pub fn new(
        resume_text: String,
        job_description: &str,
        job_role: JobRole,
    ) -> Result<Self, String> {
        if resume_text.trim().is_empty() {
            return Err("resume text is empty".to_string());
        }
        if job_description.trim().is_empty() {
            return Err("job description is empty".to_string());
        }
        Ok(Self {
            resume_text,
            job_description: job_description.trim().to_string(),
            job_role,
        })
    }

    pub fn resume_text(&self) -> &str {
        &self.resume_text
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn job_role(&self) -> JobRole {
        self.job_role
    }

    pub fn into_resume_text(self) -> String {
        self.resume_text
    }
}

/// The four fields the model is asked for, after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationFields {
    pub skills: Vec<String>,
    pub experience_summary: String,
    pub match_score: u8,
    pub missing_skills: Vec<String>,
}

/// A completed evaluation of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub candidate_id: Uuid,
    pub name: String,
    pub email: String,
    pub job_role: JobRole,
    pub skills: Vec<String>,
    pub experience_summary: String,
    /// 0 – 100
    pub match_score: u8,
    pub missing_skills: Vec<String>,
    pub resume_text: String,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn new(
        identity: CandidateIdentity,
        job_role: JobRole,
        fields: EvaluationFields,
        resume_text: String,
    ) -> Self {
        Self {
            candidate_id: Uuid::new_v4(),
            name: identity.name,
            email: identity.email,
            job_role,
            skills: fields.skills,
            experience_summary: fields.experience_summary,
            match_score: fields.match_score,
            missing_skills: fields.missing_skills,
            resume_text,
            evaluated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_role_parse_case_insensitive() {
        assert_eq!(
            "machine learning engineer".parse::<JobRole>().unwrap(),
            JobRole::MachineLearningEngineer
        );
        assert_eq!(" Data Scientist ".parse::<JobRole>().unwrap(), JobRole::DataScientist);
    }

    #[test]
    fn test_job_role_unknown_rejected() {
        let err = "Astronaut".parse::<JobRole>().unwrap_err();
        assert_eq!(err, UnknownJobRole("Astronaut".to_string()));
    }

    #[test]
    fn test_job_role_serializes_as_label() {
        let json = serde_json::to_string(&JobRole::DataEngineer).unwrap();
        assert_eq!(json, r#""Data Engineer""#);
        let back: JobRole = serde_json::from_str(&json).unwrap();
        assert_eq!(back, JobRole::DataEngineer);
    }

    #[test]
    fn test_identity_defaults_for_missing_and_blank() {
        let id = CandidateIdentity::new(None, Some("   "));
        assert_eq!(id.name, "Unknown");
        assert_eq!(id.email, "N/A");

        let id = CandidateIdentity::new(Some(" Jane Smith "), Some("jane@example.com"));
        assert_eq!(id.name, "Jane Smith");
        assert_eq!(id.email, "jane@example.com");
    }

    #[test]
    fn test_request_rejects_blank_resume() {
        let err = EvaluationRequest::new("  \n ".to_string(), "Build models", JobRole::DataScientist)
            .unwrap_err();
        assert!(err.contains("resume"));
    }

    #[test]
    fn test_request_rejects_blank_job_description() {
        let err = EvaluationRequest::new("Python".to_string(), "", JobRole::DataScientist)
            .unwrap_err();
        assert!(err.contains("job description"));
    }

    #[test]
    fn test_results_get_distinct_ids() {
        let fields = EvaluationFields {
            skills: vec![],
            experience_summary: String::new(),
            match_score: 50,
            missing_skills: vec![],
        };
        let a = EvaluationResult::new(
            CandidateIdentity::default(),
            JobRole::DataAnalyst,
            fields.clone(),
            "a".to_string(),
        );
        let b = EvaluationResult::new(
            CandidateIdentity::default(),
            JobRole::DataAnalyst,
            fields,
            "b".to_string(),
        );
        assert_ne!(a.candidate_id, b.candidate_id);
    }
}
