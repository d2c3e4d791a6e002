//! Axum route handlers for the Evaluation API.

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::aggregator::{
    candidate_rows, distribution, summarize, CandidateRow, ScoreBucket, ScoreSummary,
};
use crate::evaluation::bulk::read_candidates;
use crate::evaluation::extractor::DocumentKind;
use crate::evaluation::models::{CandidateIdentity, EvaluationResult, JobRole, ResumeInput};
use crate::evaluation::service::BatchReport;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct JobRolesResponse {
    pub job_roles: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub report: BatchReport,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsResponse {
    /// `null` until the session holds at least one result.
    pub summary: Option<ScoreSummary>,
    pub distribution: Vec<ScoreBucket>,
    pub candidates: Vec<CandidateRow>,
}

struct UploadedFile {
    bytes: Bytes,
    content_type: Option<String>,
    file_name: Option<String>,
}

/// Multipart body split into the `file` part and plain text fields.
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let content_type = field.content_type().map(str::to_string);
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await?;
                form.file = Some(UploadedFile {
                    bytes,
                    content_type,
                    file_name,
                });
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn job_description(&self) -> Result<&str, AppError> {
        self.text("job_description")
            .filter(|jd| !jd.trim().is_empty())
            .ok_or_else(|| AppError::Validation("job_description is required".to_string()))
    }

    fn job_role(&self) -> Result<JobRole, AppError> {
        self.text("job_role")
            .ok_or_else(|| AppError::Validation("job_role is required".to_string()))?
            .parse()
            .map_err(|e| AppError::Validation(format!("{e}")))
    }
}

/// Declared content type, or a guess from the file name when the client sent
/// none (or only the generic octet-stream).
fn resolve_content_type(file: &UploadedFile) -> String {
    let declared = file
        .content_type
        .as_deref()
        .filter(|ct| !ct.starts_with("application/octet-stream"));
    match declared {
        Some(ct) => ct.to_string(),
        None => file
            .file_name
            .as_deref()
            .and_then(DocumentKind::from_file_name)
            .map(|kind| kind.mime().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/job-roles
pub async fn handle_job_roles() -> Json<JobRolesResponse> {
    Json(JobRolesResponse {
        job_roles: JobRole::ALL.iter().map(|r| r.label()).collect(),
    })
}

/// POST /api/v1/evaluations
///
/// Evaluates one resume, uploaded as `file` (PDF or text) or sent inline as
/// `resume_text`. The result is returned, not stored.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EvaluationResult>, AppError> {
    let form = UploadForm::read(multipart).await?;
    let job_description = form.job_description()?;
    let job_role = form.job_role()?;

    let input = match (&form.file, form.text("resume_text")) {
        (Some(file), _) => ResumeInput::Document {
            bytes: file.bytes.clone(),
            content_type: resolve_content_type(file),
        },
        (None, Some(text)) => ResumeInput::Text(text.to_string()),
        (None, None) => {
            return Err(AppError::Validation(
                "either a file or resume_text is required".to_string(),
            ))
        }
    };
    let identity = CandidateIdentity::new(form.text("name"), form.text("email"));

    let result = state
        .evaluator
        .evaluate(input, job_description, job_role, identity)
        .await?;

    Ok(Json(result))
}

/// POST /api/v1/sessions/:session_id/batches
///
/// Evaluates every row of an uploaded CSV and appends the successes to the
/// session's results. The batch runs in its own task, so a client that hangs
/// up does not lose the results already computed.
pub async fn handle_batch(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<BatchResponse>, AppError> {
    let form = UploadForm::read(multipart).await?;
    let job_description = form.job_description()?.to_string();
    let job_role = form.job_role()?;
    let file = form
        .file
        .as_ref()
        .ok_or_else(|| AppError::Validation("a CSV file is required".to_string()))?;

    let records = read_candidates(&file.bytes)?;
    info!(
        "Session {session_id}: received batch of {} records",
        records.len()
    );

    let guard = state.sessions.begin_batch(session_id).ok_or_else(|| {
        AppError::Conflict(format!("a batch is already running for session {session_id}"))
    })?;
    // Held from here on: a clear while the batch runs detaches this set, so
    // late results never reappear in the session.
    let results = state.sessions.results(session_id).await;

    let evaluator = state.evaluator.clone();
    let task = tokio::spawn(async move {
        let report = evaluator
            .evaluate_batch(records, &job_description, job_role, guard.token())
            .await;
        results.append(report.results.iter().cloned()).await;
        info!(
            "Session {session_id} now holds {} results",
            results.len().await
        );
        report
    });

    let report = task
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("batch task failed: {e}")))?;

    Ok(Json(BatchResponse { session_id, report }))
}

/// POST /api/v1/sessions/:session_id/batches/cancel
pub async fn handle_cancel_batch(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Json<CancelResponse> {
    let cancelled = state.sessions.cancel_batch(session_id);
    Json(CancelResponse { cancelled })
}

/// Results of a session, empty when the session does not exist.
async fn session_results(state: &AppState, session_id: Uuid) -> Vec<EvaluationResult> {
    match state.sessions.get(session_id).await {
        Some(set) => set.list().await,
        None => Vec::new(),
    }
}

/// GET /api/v1/sessions/:session_id/results
pub async fn handle_list_results(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Json<Vec<EvaluationResult>> {
    Json(session_results(&state, session_id).await)
}

/// GET /api/v1/sessions/:session_id/results/:candidate_id
pub async fn handle_get_result(
    State(state): State<AppState>,
    Path((session_id, candidate_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EvaluationResult>, AppError> {
    let found = match state.sessions.get(session_id).await {
        Some(set) => set.get(candidate_id).await,
        None => None,
    };
    found
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
}

/// GET /api/v1/sessions/:session_id/analytics
pub async fn handle_analytics(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Json<AnalyticsResponse> {
    let results = session_results(&state, session_id).await;
    Json(AnalyticsResponse {
        summary: summarize(&results),
        distribution: distribution(&results),
        candidates: candidate_rows(&results),
    })
}

/// DELETE /api/v1/sessions/:session_id
pub async fn handle_clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> StatusCode {
    state.sessions.clear(session_id).await;
    StatusCode::NO_CONTENT
}
