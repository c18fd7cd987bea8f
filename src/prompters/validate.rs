//! Input validators shared by text prompters.

use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

type ValidatorCallback = dyn Fn(&str) -> Result<String, String> + Send + Sync;
type SharedValidatorCallback = Arc<ValidatorCallback>;

/// Built-in validation helpers.
#[derive(Clone)]
pub enum Validator {
    None,
    NonEmpty,
    Integer,
    PositiveNumber,
    Decimal,
    Date,
    Time,
    OneOf(Vec<String>),
    Custom(SharedValidatorCallback),
}

impl Validator {
    pub fn validate(&self, input: &str) -> Result<String, ValidationError> {
        match self {
            Validator::None => Ok(input.to_string()),
            Validator::NonEmpty => {
                if input.trim().is_empty() {
                    Err(ValidationError::new("Value cannot be empty"))
                } else {
                    Ok(input.trim().to_string())
                }
            }
            Validator::Integer => input
                .trim()
                .parse::<i64>()
                .map(|v| v.to_string())
                .map_err(|_| ValidationError::new("Enter a whole number (e.g., 42)")),
            Validator::PositiveNumber => input
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::new("Enter a numeric value"))
                .and_then(|v| {
                    if v > 0.0 {
                        Ok(v.to_string())
                    } else {
                        Err(ValidationError::new("Value must be greater than zero"))
                    }
                }),
            Validator::Decimal => input
                .trim()
                .parse::<f64>()
                .map(|v| v.to_string())
                .map_err(|_| ValidationError::new("Enter a numeric value")),
            Validator::Date => NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
                .map(|d| d.to_string())
                .map_err(|_| ValidationError::new("Use YYYY-MM-DD format")),
            Validator::Time => NaiveTime::parse_from_str(input.trim(), "%H:%M")
                .map(|t| t.format("%H:%M").to_string())
                .map_err(|_| ValidationError::new("Use 24-hour HH:MM format")),
            Validator::OneOf(options) => {
                let normalized = input.trim().to_lowercase();
                options
                    .iter()
                    .find(|candidate| candidate.to_lowercase() == normalized)
                    .cloned()
                    .ok_or_else(|| ValidationError::new(one_of_message(input, options)))
            }
            Validator::Custom(func) => func(input).map_err(ValidationError::new),
        }
    }
}

/// Builds the OneOf failure message, suggesting the closest option when the
/// input resembles one.
fn one_of_message(input: &str, options: &[String]) -> String {
    let trimmed = input.trim();
    let suggestion = options
        .iter()
        .map(|candidate| (candidate, strsim::jaro_winkler(&trimmed.to_lowercase(), &candidate.to_lowercase())))
        .filter(|(_, score)| *score >= 0.8)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(candidate, _)| candidate);

    match suggestion {
        Some(candidate) => format!(
            "Value must be one of: {} (did you mean `{}`?)",
            options.join(", "),
            candidate
        ),
        None => format!("Value must be one of: {}", options.join(", ")),
    }
}
