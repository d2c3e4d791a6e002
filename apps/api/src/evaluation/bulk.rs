//! Bulk Reader: CSV upload → candidate records.
//!
//! Recognized columns: `name`, `email`, `resume_text` (matched
//! case-insensitively, surrounding whitespace ignored). Anything else is
//! ignored. Blank name/email cells fall back to "Unknown"/"N/A".

use thiserror::Error;

use crate::evaluation::models::CandidateRecord;

const COL_NAME: &str = "name";
const COL_EMAIL: &str = "email";
const COL_RESUME_TEXT: &str = "resume_text";

#[derive(Debug, Error)]
pub enum BulkInputError {
    #[error("unable to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
}

pub fn read_candidates(data: &[u8]) -> Result<Vec<CandidateRecord>, BulkInputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let position = |column: &str| {
        headers
            .iter()
            .position(|h| h.trim_start_matches('\u{feff}').eq_ignore_ascii_case(column))
    };

    let name_idx = position(COL_NAME);
    let email_idx = position(COL_EMAIL);
    let text_idx = position(COL_RESUME_TEXT).ok_or(BulkInputError::MissingColumn(COL_RESUME_TEXT))?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i));
        records.push(CandidateRecord::new(
            cell(name_idx),
            cell(email_idx),
            cell(Some(text_idx)).unwrap_or_default(),
        ));
    }

    Ok(records)
}
