//! Text validation enforced at the persistence boundary.
//!
//! Every write path that stores user-authored text goes through
//! [`require_meaningful_text`] so that a blank or whitespace-only body can
//! never reach storage, no matter which handler or service issued the write.

use crate::domain::error::DomainError;

/// Upper bounds for user-authored fields. Carried by repository
/// implementations so limits stay configurable without touching callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldLimits {
    pub max_text_chars: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            max_text_chars: 500,
        }
    }
}

/// Rejects text that is empty or contains only Unicode whitespace, and text
/// exceeding the configured character limit. Returns the input untouched on
/// success; stored text keeps its original surrounding whitespace.
pub fn require_meaningful_text<'a>(
    field: &'static str,
    text: &'a str,
    limits: &FieldLimits,
) -> Result<&'a str, DomainError> {
    if text.chars().all(char::is_whitespace) {
        return Err(DomainError::validation(format!(
            "{field} must contain at least one non-whitespace character"
        )));
    }
    enforce_length(field, text, limits)
}

/// Bounds the length of text that is allowed to be empty, such as a group
/// description.
pub fn enforce_length<'a>(
    field: &'static str,
    text: &'a str,
    limits: &FieldLimits,
) -> Result<&'a str, DomainError> {
    let chars = text.chars().count();
    if chars > limits.max_text_chars {
        return Err(DomainError::validation(format!(
            "{field} is {chars} characters, the limit is {}",
            limits.max_text_chars
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_text() {
        let limits = FieldLimits::default();
        assert!(require_meaningful_text("text", "", &limits).is_err());
    }

    #[test]
    fn rejects_whitespace_only_text() {
        let limits = FieldLimits::default();
        for text in ["   ", "\t", "\n\n", " \t\r\n ", "\u{00a0}\u{2003}"] {
            assert!(
                require_meaningful_text("text", text, &limits).is_err(),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_text_with_surrounding_whitespace_unchanged() {
        let limits = FieldLimits::default();
        let accepted = require_meaningful_text("text", "  hello  ", &limits).unwrap();
        assert_eq!(accepted, "  hello  ");
    }

    #[test]
    fn enforces_character_limit() {
        let limits = FieldLimits { max_text_chars: 5 };
        assert!(require_meaningful_text("text", "hello", &limits).is_ok());
        assert!(require_meaningful_text("text", "hello!", &limits).is_err());
    }

    #[test]
    fn length_check_allows_empty_text() {
        let limits = FieldLimits { max_text_chars: 5 };
        assert!(enforce_length("description", "", &limits).is_ok());
        assert!(enforce_length("description", "short", &limits).is_ok());
        assert!(enforce_length("description", "toolong", &limits).is_err());
    }
}
