//! Sentinel-condition classifier.
//!
//! Pure functions over an [`IamCondition`](crate::types::IamCondition).
//! Conditions are matched as opaque, trimmed byte strings — never parsed or
//! evaluated as real CEL expressions. A condition carrying the sentinel
//! marker plus any additional conjunct is deliberately not recognized.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::types::{ActivationType, IamCondition};

const JIT_MARKER: &str = "has({}.jitAccessConstraint)";
const MPA_MARKER: &str = "has({}.multiPartyApprovalConstraint)";
const ACTIVATED_TITLE: &str = "JIT access activation";

#[must_use]
pub fn is_jit_marker(cond: Option<&IamCondition>) -> bool {
    cond.is_some_and(|c| c.expression.trim() == JIT_MARKER)
}

#[must_use]
pub fn is_mpa_marker(cond: Option<&IamCondition>) -> bool {
    cond.is_some_and(|c| c.expression.trim() == MPA_MARKER)
}

#[must_use]
pub fn is_approval_marker(cond: Option<&IamCondition>, activation_type: ActivationType) -> bool {
    match activation_type {
        ActivationType::Jit => is_jit_marker(cond),
        ActivationType::Mpa => is_mpa_marker(cond),
    }
}

#[must_use]
pub fn is_activated(cond: Option<&IamCondition>) -> bool {
    cond.is_some_and(|c| c.title.as_deref() == Some(ACTIVATED_TITLE))
}

/// Parses the two timestamps out of an activated condition's expression and
/// returns `start <= now < end`. A malformed or non-activated expression
/// evaluates to `false` rather than erroring — a corrupted binding must not
/// take down eligibility discovery for a whole project.
#[must_use]
pub fn evaluate(expr: &str, now: DateTime<Utc>) -> bool {
    match parse_window(expr) {
        Some((start, end)) => start <= now && now < end,
        None => false,
    }
}

/// Parses the `[start, end)` window out of an activated condition's
/// expression. `None` means the expression is malformed, distinct from a
/// well-formed window the caller falls outside of.
#[must_use]
pub fn parse_window(expr: &str) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let expr = expr.trim();
    let prefix = "(request.time >= timestamp(\"";
    let rest = expr.strip_prefix(prefix)?;
    let (start_str, rest) = rest.split_once("\") && request.time < timestamp(\"")?;
    let end_str = rest.strip_suffix("\"))")?;
    let start = DateTime::parse_from_rfc3339(start_str).ok()?.with_timezone(&Utc);
    let end = DateTime::parse_from_rfc3339(end_str).ok()?.with_timezone(&Utc);
    Some((start, end))
}

/// Produces `(expression, title)` for a temporary, activated binding
/// covering `[start, start + duration)`, truncated to seconds, UTC.
#[must_use]
pub fn temporary_condition_for(start: DateTime<Utc>, duration: Duration) -> IamCondition {
    let end = start + duration;
    let start_str = start.to_rfc3339_opts(SecondsFormat::Secs, true);
    let end_str = end.to_rfc3339_opts(SecondsFormat::Secs, true);
    IamCondition {
        expression: format!(
            "(request.time >= timestamp(\"{start_str}\") && request.time < timestamp(\"{end_str}\"))"
        ),
        title: Some(ACTIVATED_TITLE.to_string()),
        description: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cond(expr: &str) -> IamCondition {
        IamCondition { expression: expr.to_string(), title: None, description: None }
    }

    #[test]
    fn recognizes_exact_jit_marker() {
        assert!(is_jit_marker(Some(&cond("has({}.jitAccessConstraint)"))));
        assert!(is_jit_marker(Some(&cond("  has({}.jitAccessConstraint)  "))));
        assert!(!is_jit_marker(Some(&cond("has({}.mpaConstraint)"))));
        assert!(!is_jit_marker(None));
    }

    #[test]
    fn rejects_marker_with_extra_conjunct() {
        let tampered = cond("has({}.jitAccessConstraint) && true");
        assert!(!is_jit_marker(Some(&tampered)));
    }

    #[test]
    fn recognizes_mpa_marker() {
        assert!(is_mpa_marker(Some(&cond("has({}.multiPartyApprovalConstraint)"))));
    }

    #[test]
    fn is_approval_marker_dispatches_on_type() {
        let jit = cond("has({}.jitAccessConstraint)");
        assert!(is_approval_marker(Some(&jit), ActivationType::Jit));
        assert!(!is_approval_marker(Some(&jit), ActivationType::Mpa));
    }

    #[test]
    fn activated_title_is_exact() {
        let activated = IamCondition {
            expression: "(request.time >= timestamp(\"2026-01-01T00:00:00Z\") && request.time < timestamp(\"2026-01-01T00:05:00Z\"))".into(),
            title: Some("JIT access activation".into()),
            description: None,
        };
        assert!(is_activated(Some(&activated)));
        assert!(!is_activated(Some(&cond("anything"))));
    }

    #[test]
    fn temporary_condition_evaluates_true_within_window() {
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let duration = Duration::minutes(5);
        let condition = temporary_condition_for(start, duration);
        assert_eq!(condition.title.as_deref(), Some("JIT access activation"));

        let mid = start + Duration::minutes(2);
        assert!(evaluate(&condition.expression, mid));

        let after = start + Duration::minutes(6);
        assert!(!evaluate(&condition.expression, after));

        let before = start - Duration::minutes(1);
        assert!(!evaluate(&condition.expression, before));
    }

    #[test]
    fn evaluate_invariant_start_inclusive_end_exclusive() {
        let start: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let duration = Duration::minutes(5);
        let condition = temporary_condition_for(start, duration);
        assert!(evaluate(&condition.expression, start));
        assert!(!evaluate(&condition.expression, start + duration));
    }

    #[test]
    fn malformed_expression_evaluates_false_not_error() {
        assert!(!evaluate("garbage", Utc::now()));
        assert!(!evaluate(
            "(request.time >= timestamp(\"not-a-date\") && request.time < timestamp(\"also-not\"))",
            Utc::now()
        ));
    }
}
