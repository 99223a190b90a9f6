use serde_json::Value;
use thiserror::Error;

use crate::models::{RecommendationResult, SimulationInput, SimulationResult, StudentInput};

pub const SKILL_MAX: u32 = 100;
pub const DISPOSITION_MAX: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("location is required")]
    EmptyLocation,
    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response is missing required field `{0}`")]
    MissingField(String),
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Blocks submission when the location is blank. Numeric ranges are
/// enforced by the input surface, not here.
pub fn validate_student_input(input: StudentInput) -> Result<StudentInput, ValidationError> {
    if input.location.trim().is_empty() {
        return Err(ValidationError::EmptyLocation);
    }
    Ok(input)
}

/// Location check plus range checks, for inputs that never went
/// through a clamping widget (CSV rows, hand-written JSON).
pub fn validate_student_input_strict(
    input: StudentInput,
) -> Result<StudentInput, ValidationError> {
    let input = validate_student_input(input)?;
    check_ranges(&input.skill_scores(), SKILL_MAX)?;
    check_ranges(&input.disposition_scores(), DISPOSITION_MAX)?;
    Ok(input)
}

pub fn validate_simulation_input(input: SimulationInput) -> Result<SimulationInput, ValidationError> {
    check_ranges(
        &[
            ("stress_level", input.stress_level),
            ("risk_level", input.risk_level),
        ],
        DISPOSITION_MAX,
    )?;
    Ok(input)
}

fn check_ranges(fields: &[(&'static str, u32)], max: u32) -> Result<(), ValidationError> {
    match fields.iter().find(|(_, value)| *value > max) {
        Some((name, _)) => Err(ValidationError::OutOfRange(*name)),
        None => Ok(()),
    }
}

/// Lenient: only `recommended_stream` and `confidence_score` are
/// required, absent lists come back empty and absent text stays `None`.
pub fn parse_recommendation_result(raw: &str) -> Result<RecommendationResult, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    require_fields(&value, &["recommended_stream", "confidence_score"])?;
    Ok(serde_json::from_value(strip_nulls(value))?)
}

/// Strict: all three scores must be present.
pub fn parse_simulation_result(raw: &str) -> Result<SimulationResult, ParseError> {
    let value: Value = serde_json::from_str(raw)?;
    require_fields(
        &value,
        &["baseline_score", "scenario_score", "score_improvement"],
    )?;
    Ok(serde_json::from_value(value)?)
}

fn require_fields(value: &Value, names: &[&str]) -> Result<(), ParseError> {
    for name in names {
        match value.get(name) {
            None | Some(Value::Null) => return Err(ParseError::MissingField(name.to_string())),
            Some(_) => {}
        }
    }
    Ok(())
}

// `null` is treated as absent: members fall back to `#[serde(default)]`
// and list entries are dropped.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other,
    }
}
