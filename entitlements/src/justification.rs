//! Justification policy (component D).

use core::UserId;
use errors::CoreError;
use regex::Regex;

/// Validates a caller-supplied justification string against a configured
/// pattern. The pattern is compiled once at construction so a bad regex
/// fails fast rather than on every `check` call.
pub struct JustificationPolicy {
    pattern: Regex,
    hint: String,
}

impl JustificationPolicy {
    pub fn new(pattern: &str, hint: impl Into<String>) -> Result<Self, CoreError> {
        let pattern = Regex::new(pattern)?;
        Ok(Self { pattern, hint: hint.into() })
    }

    /// Accepts if `justification` is non-empty and matches the configured
    /// pattern. `user` is accepted for parity with the source contract but
    /// does not currently affect the outcome.
    pub fn check(&self, justification: &str, _user: &UserId) -> Result<(), CoreError> {
        if justification.is_empty() || !self.pattern.is_match(justification) {
            return Err(CoreError::invalid_argument(format!(
                "justification does not match required pattern: {}",
                self.hint
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn hint(&self) -> &str {
        &self.hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("1", "alice@example.com")
    }

    #[test]
    fn accepts_matching_justification() {
        let policy = JustificationPolicy::new(r"^case-\d+$", "must look like case-123").unwrap();
        assert!(policy.check("case-123", &user()).is_ok());
    }

    #[test]
    fn rejects_empty_justification() {
        let policy = JustificationPolicy::new(".*", "anything").unwrap();
        assert!(policy.check("", &user()).is_err());
    }

    #[test]
    fn rejects_non_matching_justification() {
        let policy = JustificationPolicy::new(r"^case-\d+$", "must look like case-123").unwrap();
        assert!(policy.check("not-a-case", &user()).is_err());
    }

    #[test]
    fn construction_fails_fast_on_bad_regex() {
        assert!(JustificationPolicy::new("(unterminated", "n/a").is_err());
    }
}
