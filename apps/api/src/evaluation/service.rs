//! Evaluation Service: orchestrates the pipeline.
//!
//! Flow: extract (for documents) → validate → build prompt → invoke model
//!       (with bounded retry) → parse → EvaluationResult.
//!
//! The batch variant evaluates records independently. A failed record is
//! logged and reported in the [`BatchReport`] but never aborts the batch,
//! and it leaves no placeholder in the result sequence.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::evaluation::extractor::{self, ExtractionError};
use crate::evaluation::models::{
    CandidateIdentity, CandidateRecord, EvaluationRequest, EvaluationResult, JobRole, ResumeInput,
};
use crate::evaluation::parser::{self, ParseError};
use crate::evaluation::prompts::{analysis_system, build_prompt};
use crate::llm_client::{ModelClient, ModelError};

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InvalidRequest,
    Extraction,
    Model,
    Parse,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("model invocation failed: {0}")]
    Model(#[from] ModelError),

    #[error("model output rejected: {0}")]
    Parse(#[from] ParseError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::InvalidRequest(_) => Stage::InvalidRequest,
            PipelineError::Extraction(_) => Stage::Extraction,
            PipelineError::Model(_) => Stage::Model,
            PipelineError::Parse(_) => Stage::Parse,
        }
    }
}

/// Exponential backoff for transient model errors: base, 2×base, 4×base, …
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(1u32 << attempt.saturating_sub(1).min(16))
            .unwrap_or(Duration::MAX)
    }
}

/// A record the batch could not evaluate.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Zero-based position in the input.
    pub row: usize,
    pub name: String,
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Successful evaluations, in input order.
    pub results: Vec<EvaluationResult>,
    pub total_records: usize,
    pub skipped_empty: usize,
    pub failures: Vec<BatchFailure>,
    /// Records left unevaluated because the batch was cancelled.
    pub cancelled: usize,
}

enum Slot {
    Done(Box<EvaluationResult>),
    Failed(BatchFailure),
    Skipped,
    Cancelled,
}

pub struct EvaluationService {
    model: Arc<dyn ModelClient>,
    retry: RetryPolicy,
    batch_concurrency: usize,
}

impl EvaluationService {
    pub fn new(model: Arc<dyn ModelClient>, retry: RetryPolicy, batch_concurrency: usize) -> Self {
        Self {
            model,
            retry,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    /// Evaluates one candidate, surfacing the first failure untouched.
    pub async fn evaluate(
        &self,
        input: ResumeInput,
        job_description: &str,
        job_role: JobRole,
        identity: CandidateIdentity,
    ) -> Result<EvaluationResult, PipelineError> {
        let resume_text = match input {
            ResumeInput::Document {
                bytes,
                content_type,
            } => extractor::extract_blocking(bytes, content_type).await?,
            ResumeInput::Text(text) => text,
        };

        let request = EvaluationRequest::new(resume_text, job_description, job_role)
            .map_err(PipelineError::InvalidRequest)?;

        self.run(request, identity).await
    }

    async fn run(
        &self,
        request: EvaluationRequest,
        identity: CandidateIdentity,
    ) -> Result<EvaluationResult, PipelineError> {
        let prompt = build_prompt(
            request.resume_text(),
            request.job_description(),
            request.job_role(),
        );
        let raw = self.invoke_with_retry(&prompt).await?;
        let fields = parser::parse(&raw)?;

        info!(
            "Evaluated '{}' for {}: match_score={}",
            identity.name,
            request.job_role(),
            fields.match_score
        );

        let job_role = request.job_role();
        Ok(EvaluationResult::new(
            identity,
            job_role,
            fields,
            request.into_resume_text(),
        ))
    }

    async fn invoke_with_retry(&self, prompt: &str) -> Result<String, ModelError> {
        let system = analysis_system();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.model.invoke(prompt, &system).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_before(attempt);
                    warn!(
                        "Model call attempt {} failed ({}), retrying after {}ms...",
                        attempt,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Evaluates every record independently under partial-failure semantics.
    ///
    /// Once `cancel` fires, no new record starts and in-flight evaluations
    /// are abandoned; everything already completed is still returned.
    pub async fn evaluate_batch(
        &self,
        records: Vec<CandidateRecord>,
        job_description: &str,
        job_role: JobRole,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let total_records = records.len();
        info!(
            "Starting batch of {} records for {} (concurrency {})",
            total_records, job_role, self.batch_concurrency
        );

        let mut slots: Vec<Option<Slot>> = (0..total_records).map(|_| None).collect();

        let mut outcomes = stream::iter(records.into_iter().enumerate())
            .map(|(row, record)| async move {
                let slot = self
                    .evaluate_record(row, record, job_description, job_role, cancel)
                    .await;
                (row, slot)
            })
            .buffer_unordered(self.batch_concurrency);

        while let Some((row, slot)) = outcomes.next().await {
            slots[row] = Some(slot);
        }

        let mut report = BatchReport {
            results: Vec::new(),
            total_records,
            skipped_empty: 0,
            failures: Vec::new(),
            cancelled: 0,
        };

        for slot in slots.into_iter().flatten() {
            match slot {
                Slot::Done(result) => report.results.push(*result),
                Slot::Failed(failure) => report.failures.push(failure),
                Slot::Skipped => report.skipped_empty += 1,
                Slot::Cancelled => report.cancelled += 1,
            }
        }

        info!(
            "Batch finished: {} evaluated, {} skipped, {} failed, {} cancelled",
            report.results.len(),
            report.skipped_empty,
            report.failures.len(),
            report.cancelled
        );
        report
    }

    async fn evaluate_record(
        &self,
        row: usize,
        record: CandidateRecord,
        job_description: &str,
        job_role: JobRole,
        cancel: &CancellationToken,
    ) -> Slot {
        if cancel.is_cancelled() {
            return Slot::Cancelled;
        }
        if record.resume_text.trim().is_empty() {
            return Slot::Skipped;
        }

        let name = record.identity.name.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Slot::Cancelled,
            outcome = self.evaluate(
                ResumeInput::Text(record.resume_text),
                job_description,
                job_role,
                record.identity,
            ) => outcome,
        };

        match outcome {
            Ok(result) => Slot::Done(Box::new(result)),
            Err(e) => {
                warn!("Batch row {row} ('{name}') failed at {:?}: {e}", e.stage());
                Slot::Failed(BatchFailure {
                    row,
                    name,
                    stage: e.stage(),
                    message: e.to_string(),
                })
            }
        }
    }
}
