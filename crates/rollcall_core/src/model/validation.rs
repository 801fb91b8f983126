//! Input validation errors shared by session and signup models.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Malformed caller input rejected before any store access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// Capacity is neither positive nor the unlimited sentinel.
    InvalidCapacity(i64),
    /// Email does not look like `local@domain`.
    InvalidEmail(String),
    /// Session would end before it starts.
    EndBeforeStart { start_at: i64, end_at: i64 },
    /// Persisted or caller-provided enum text is unknown.
    UnknownValue {
        field: &'static str,
        value: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::InvalidCapacity(value) => write!(
                f,
                "capacity must be a positive integer or -1 for unlimited, got {value}"
            ),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::EndBeforeStart { start_at, end_at } => {
                write!(f, "session end {end_at} is earlier than start {start_at}")
            }
            Self::UnknownValue { field, value } => {
                write!(f, "unknown value `{value}` for `{field}`")
            }
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and rejects it when nothing remains.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{require_text, ValidationError};

    #[test]
    fn require_text_trims_surrounding_whitespace() {
        assert_eq!(require_text("topic", "  Negotiation  ").unwrap(), "Negotiation");
    }

    #[test]
    fn require_text_rejects_blank() {
        assert_eq!(
            require_text("topic", " \t ").unwrap_err(),
            ValidationError::BlankField("topic")
        );
    }
}
