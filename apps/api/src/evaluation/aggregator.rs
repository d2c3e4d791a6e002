//! Aggregator: summary statistics and distribution over evaluation results.

use serde::Serialize;
use uuid::Uuid;

use crate::evaluation::models::EvaluationResult;

/// Width of one score-distribution bucket (20 buckets over 0–100).
pub const BUCKET_WIDTH: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean_score: f64,
    pub max_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreBucket {
    pub lower: u8,
    /// Inclusive only for the last bucket, which also holds 100.
    pub upper: u8,
    pub count: usize,
}

/// List-view projection of a result (no resume text).
#[derive(Debug, Clone, Serialize)]
pub struct CandidateRow {
    pub candidate_id: Uuid,
    pub name: String,
    pub email: String,
    pub match_score: u8,
    pub skills: Vec<String>,
    pub experience_summary: String,
}

/// `None` is the empty state: there is no mean of zero scores.
pub fn summarize(results: &[EvaluationResult]) -> Option<ScoreSummary> {
    let max_score = results.iter().map(|r| r.match_score).max()?;
    let total: u64 = results.iter().map(|r| u64::from(r.match_score)).sum();

    Some(ScoreSummary {
        count: results.len(),
        mean_score: total as f64 / results.len() as f64,
        max_score,
    })
}

pub fn distribution(results: &[EvaluationResult]) -> Vec<ScoreBucket> {
    let bucket_count = 100 / BUCKET_WIDTH as usize;
    let mut buckets: Vec<ScoreBucket> = (0..bucket_count)
        .map(|i| ScoreBucket {
            lower: i as u8 * BUCKET_WIDTH,
            upper: (i as u8 + 1) * BUCKET_WIDTH,
            count: 0,
        })
        .collect();

    for result in results {
        let idx = (result.match_score / BUCKET_WIDTH) as usize;
        buckets[idx.min(bucket_count - 1)].count += 1;
    }
    buckets
}

pub fn candidate_rows(results: &[EvaluationResult]) -> Vec<CandidateRow> {
    results
        .iter()
        .map(|r| CandidateRow {
            candidate_id: r.candidate_id,
            name: r.name.clone(),
            email: r.email.clone(),
            match_score: r.match_score,
            skills: r.skills.clone(),
            experience_summary: r.experience_summary.clone(),
        })
        .collect()
}
