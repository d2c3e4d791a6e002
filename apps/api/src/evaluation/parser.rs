//! Response Parser: strict validation of the model's JSON answer.
//!
//! Nothing is trusted: every field is checked for presence and shape, and an
//! out-of-range score is rejected rather than clamped.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::evaluation::models::EvaluationFields;
use crate::evaluation::prompts::{
    FIELD_EXPERIENCE_SUMMARY, FIELD_MATCH_SCORE, FIELD_MISSING_SKILLS, FIELD_SKILLS,
};

pub const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' has the wrong shape: expected {expected}")]
    WrongShape {
        field: &'static str,
        expected: &'static str,
    },

    #[error("match_score {0} is outside 0-100")]
    ScoreOutOfRange(String),
}

pub fn parse(raw: &str) -> Result<EvaluationFields, ParseError> {
    let text = strip_json_fences(raw);
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    Ok(EvaluationFields {
        skills: string_list(object, FIELD_SKILLS)?,
        experience_summary: required(object, FIELD_EXPERIENCE_SUMMARY)?
            .as_str()
            .ok_or(ParseError::WrongShape {
                field: FIELD_EXPERIENCE_SUMMARY,
                expected: "a string",
            })?
            .to_string(),
        match_score: match_score(required(object, FIELD_MATCH_SCORE)?)?,
        missing_skills: string_list(object, FIELD_MISSING_SKILLS)?,
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(stripped)
        }
        None => text,
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ParseError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ParseError::MissingField(field)),
        Some(v) => Ok(v),
    }
}

fn string_list(object: &Map<String, Value>, field: &'static str) -> Result<Vec<String>, ParseError> {
    let wrong_shape = ParseError::WrongShape {
        field,
        expected: "an array of strings",
    };
    let items = required(object, field)?
        .as_array()
        .ok_or_else(|| wrong_shape.clone())?;
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(|| wrong_shape.clone()))
        .collect()
}

/// Accepts an integer, an integral float, or a string holding an integer.
fn match_score(value: &Value) -> Result<u8, ParseError> {
    let wrong_shape = ParseError::WrongShape {
        field: FIELD_MATCH_SCORE,
        expected: "an integer",
    };

    let score: i64 = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i
            } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
                if f < i64::MIN as f64 || f > i64::MAX as f64 {
                    return Err(ParseError::ScoreOutOfRange(n.to_string()));
                }
                f as i64
            } else {
                return Err(wrong_shape);
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| wrong_shape)?,
        _ => return Err(wrong_shape),
    };

    if !(0..=MAX_SCORE).contains(&score) {
        return Err(ParseError::ScoreOutOfRange(score.to_string()));
    }
    Ok(score as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{"skills":["Python","SQL"],"experience_summary":"2 years","match_score":75,"missing_skills":["AWS"]}"#;

    #[test]
    fn test_parses_plain_object() {
        let fields = parse(SAMPLE).unwrap();
        assert_eq!(fields.skills, vec!["Python", "SQL"]);
        assert_eq!(fields.experience_summary, "2 years");
        assert_eq!(fields.match_score, 75);
        assert_eq!(fields.missing_skills, vec!["AWS"]);
    }

    #[test]
    fn test_fenced_response_parses_identically() {
        let fenced = format!("```json\n{SAMPLE}\n```");
        assert_eq!(parse(&fenced).unwrap(), parse(SAMPLE).unwrap());

        let bare_fence = format!("  ```\n{SAMPLE}\n```  \n");
        assert_eq!(parse(&bare_fence).unwrap(), parse(SAMPLE).unwrap());
    }

    #[test]
    fn test_reparsing_serialized_output_is_idempotent() {
        let first = parse(SAMPLE).unwrap();
        let reserialized = serde_json::to_string(&first).unwrap();
        assert_eq!(parse(&reserialized).unwrap(), first);
    }

    #[test]
    fn test_missing_match_score_is_error() {
        let raw = r#"{"skills":[],"experience_summary":"x","missing_skills":[]}"#;
        assert_eq!(parse(raw).unwrap_err(), ParseError::MissingField("match_score"));
    }

    #[test]
    fn test_null_field_counts_as_missing() {
        let raw = r#"{"skills":null,"experience_summary":"x","match_score":1,"missing_skills":[]}"#;
        assert_eq!(parse(raw).unwrap_err(), ParseError::MissingField("skills"));
    }

    #[test]
    fn test_skills_with_non_string_item_rejected() {
        let raw = r#"{"skills":["Go", 3],"experience_summary":"x","match_score":1,"missing_skills":[]}"#;
        assert!(matches!(
            parse(raw).unwrap_err(),
            ParseError::WrongShape { field: "skills", .. }
        ));
    }

    #[test]
    fn test_summary_must_be_string() {
        let raw = r#"{"skills":[],"experience_summary":["x"],"match_score":1,"missing_skills":[]}"#;
        assert!(matches!(
            parse(raw).unwrap_err(),
            ParseError::WrongShape { field: "experience_summary", .. }
        ));
    }

    #[test]
    fn test_score_coercions() {
        let with = |score: &str| {
            format!(r#"{{"skills":[],"experience_summary":"","match_score":{score},"missing_skills":[]}}"#)
        };
        assert_eq!(parse(&with("80.0")).unwrap().match_score, 80);
        assert_eq!(parse(&with("\"42\"")).unwrap().match_score, 42);
        assert_eq!(parse(&with("0")).unwrap().match_score, 0);
        assert_eq!(parse(&with("100")).unwrap().match_score, 100);
    }

    #[test]
    fn test_score_out_of_range_rejected_not_clamped() {
        let with = |score: &str| {
            format!(r#"{{"skills":[],"experience_summary":"","match_score":{score},"missing_skills":[]}}"#)
        };
        assert!(matches!(parse(&with("101")).unwrap_err(), ParseError::ScoreOutOfRange(_)));
        assert!(matches!(parse(&with("-1")).unwrap_err(), ParseError::ScoreOutOfRange(_)));
        assert!(matches!(
            parse(&with("18446744073709551615")).unwrap_err(),
            ParseError::ScoreOutOfRange(_)
        ));
    }

    #[test]
    fn test_score_wrong_shape() {
        let with = |score: &str| {
            format!(r#"{{"skills":[],"experience_summary":"","match_score":{score},"missing_skills":[]}}"#)
        };
        assert!(matches!(
            parse(&with("72.5")).unwrap_err(),
            ParseError::WrongShape { field: "match_score", .. }
        ));
        assert!(matches!(
            parse(&with("\"high\"")).unwrap_err(),
            ParseError::WrongShape { field: "match_score", .. }
        ));
        assert!(matches!(
            parse(&with("true")).unwrap_err(),
            ParseError::WrongShape { field: "match_score", .. }
        ));
    }

    #[test]
    fn test_non_object_and_garbage() {
        assert_eq!(parse("[1,2]").unwrap_err(), ParseError::NotAnObject);
        assert!(matches!(parse("Sure! Here is").unwrap_err(), ParseError::InvalidJson(_)));
        assert!(matches!(parse("").unwrap_err(), ParseError::InvalidJson(_)));
    }

    #[test]
    fn test_strip_json_fences_variants() {
        assert_eq!(strip_json_fences("```json\n{\"k\": 1}\n```"), "{\"k\": 1}");
        assert_eq!(strip_json_fences("```\n{\"k\": 1}\n```"), "{\"k\": 1}");
        assert_eq!(strip_json_fences("{\"k\": 1}"), "{\"k\": 1}");
        assert_eq!(strip_json_fences("```json\n{\"k\": 1}"), "{\"k\": 1}");
    }
}
