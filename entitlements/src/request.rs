//! Activation request constructors (component E).
//!
//! `core::ActivationRequest` is an immutable value object; this module owns
//! the invariant-enforcing constructors the spec requires, since those
//! invariants are policy (configured bounds), not structural.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use core::{ActivationRequest, ActivationRequestKind, ProjectId, ProjectRoleBinding, UserId};
use errors::CoreError;

/// Builds a JIT self-approval request. All requested entitlements must
/// share the same project and be of activation type JIT.
pub fn new_jit_request(
    requesting_user: UserId,
    entitlements: BTreeSet<ProjectRoleBinding>,
    justification: String,
    start: DateTime<Utc>,
    duration: Duration,
    max_roles: usize,
    max_duration: Duration,
) -> Result<ActivationRequest, CoreError> {
    if entitlements.is_empty() {
        return Err(CoreError::invalid_argument("a JIT request must name at least one role"));
    }
    if entitlements.len() > max_roles {
        return Err(CoreError::invalid_argument(format!(
            "JIT request names {} roles, exceeding the configured max of {max_roles}",
            entitlements.len()
        )));
    }
    same_project(&entitlements)?;
    validate_duration(duration, max_duration)?;

    let end = start + duration;
    Ok(ActivationRequest {
        id: ActivationRequest::generate_id(ActivationRequestKind::JitSelfApproval),
        kind: ActivationRequestKind::JitSelfApproval,
        requesting_user,
        entitlements,
        justification,
        start_time: start,
        end_time: end,
        reviewers: BTreeSet::new(),
    })
}

/// Builds an MPA request. Exactly one entitlement, activation type MPA, and
/// a reviewer set within `[min_reviewers, max_reviewers]` excluding the
/// requesting user.
#[allow(clippy::too_many_arguments)]
pub fn new_mpa_request(
    requesting_user: UserId,
    entitlement: ProjectRoleBinding,
    reviewers: BTreeSet<UserId>,
    justification: String,
    start: DateTime<Utc>,
    duration: Duration,
    min_reviewers: usize,
    max_reviewers: usize,
    max_duration: Duration,
) -> Result<ActivationRequest, CoreError> {
    validate_duration(duration, max_duration)?;

    if reviewers.contains(&requesting_user) {
        return Err(CoreError::invalid_argument("requesting user cannot be their own reviewer"));
    }
    if reviewers.len() < min_reviewers || reviewers.len() > max_reviewers {
        return Err(CoreError::invalid_argument(format!(
            "MPA request has {} reviewers, must be between {min_reviewers} and {max_reviewers}",
            reviewers.len()
        )));
    }

    let mut entitlements = BTreeSet::new();
    entitlements.insert(entitlement);

    let end = start + duration;
    Ok(ActivationRequest {
        id: ActivationRequest::generate_id(ActivationRequestKind::Mpa),
        kind: ActivationRequestKind::Mpa,
        requesting_user,
        entitlements,
        justification,
        start_time: start,
        end_time: end,
        reviewers: reviewers.into_iter().map(|u| u.email).collect(),
    })
}

fn same_project(entitlements: &BTreeSet<ProjectRoleBinding>) -> Result<ProjectId, CoreError> {
    let mut iter = entitlements.iter();
    let first = iter
        .next()
        .ok_or_else(|| CoreError::invalid_argument("a request must name at least one role"))?;
    for other in iter {
        if other.project_id != first.project_id {
            return Err(CoreError::invalid_argument(
                "all entitlements in a single request must belong to the same project",
            ));
        }
    }
    Ok(first.project_id.clone())
}

fn validate_duration(duration: Duration, max_duration: Duration) -> Result<(), CoreError> {
    if duration < Duration::minutes(1) {
        return Err(CoreError::invalid_argument("activation duration must be at least 1 minute"));
    }
    if duration > max_duration {
        return Err(CoreError::invalid_argument(format!(
            "activation duration {}s exceeds the configured ceiling of {}s",
            duration.num_seconds(),
            max_duration.num_seconds()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rb(project: &str, role: &str) -> ProjectRoleBinding {
        ProjectRoleBinding::new(ProjectId(project.to_string()), role)
    }

    fn user(email: &str) -> UserId {
        UserId::new(email, email)
    }

    #[test]
    fn jit_request_generates_prefixed_id() {
        let mut entitlements = BTreeSet::new();
        entitlements.insert(rb("project-1", "roles/browser"));
        let request = new_jit_request(
            user("alice@example.com"),
            entitlements,
            "case-123".into(),
            Utc::now(),
            Duration::minutes(5),
            5,
            Duration::hours(8),
        )
        .unwrap();
        assert!(request.id.starts_with("jit-"));
        assert_eq!(request.kind, ActivationRequestKind::JitSelfApproval);
    }

    #[test]
    fn jit_request_rejects_mixed_projects() {
        let mut entitlements = BTreeSet::new();
        entitlements.insert(rb("project-1", "roles/browser"));
        entitlements.insert(rb("project-2", "roles/browser"));
        let err = new_jit_request(
            user("alice@example.com"),
            entitlements,
            "case-123".into(),
            Utc::now(),
            Duration::minutes(5),
            5,
            Duration::hours(8),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }

    #[test]
    fn jit_request_rejects_duration_outside_bounds() {
        let mut entitlements = BTreeSet::new();
        entitlements.insert(rb("project-1", "roles/browser"));
        let too_short = new_jit_request(
            user("alice@example.com"),
            entitlements.clone(),
            "case-123".into(),
            Utc::now(),
            Duration::seconds(30),
            5,
            Duration::hours(8),
        );
        assert!(too_short.is_err());

        let too_long = new_jit_request(
            user("alice@example.com"),
            entitlements,
            "case-123".into(),
            Utc::now(),
            Duration::hours(9),
            5,
            Duration::hours(8),
        );
        assert!(too_long.is_err());
    }

    #[test]
    fn mpa_request_generates_prefixed_id_and_excludes_requester() {
        let mut reviewers = BTreeSet::new();
        reviewers.insert(user("bob@example.com"));
        let request = new_mpa_request(
            user("alice@example.com"),
            rb("project-1", "roles/iam.admin"),
            reviewers,
            "ticket-9".into(),
            Utc::now(),
            Duration::minutes(10),
            1,
            3,
            Duration::hours(8),
        )
        .unwrap();
        assert!(request.id.starts_with("mpa-"));
        assert_eq!(request.entitlements.len(), 1);
    }

    #[test]
    fn mpa_request_rejects_requester_as_reviewer() {
        let mut reviewers = BTreeSet::new();
        reviewers.insert(user("alice@example.com"));
        let err = new_mpa_request(
            user("alice@example.com"),
            rb("project-1", "roles/iam.admin"),
            reviewers,
            "ticket-9".into(),
            Utc::now(),
            Duration::minutes(10),
            1,
            3,
            Duration::hours(8),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }

    #[test]
    fn mpa_request_rejects_reviewer_count_outside_bounds() {
        let request = new_mpa_request(
            user("alice@example.com"),
            rb("project-1", "roles/iam.admin"),
            BTreeSet::new(),
            "ticket-9".into(),
            Utc::now(),
            Duration::minutes(10),
            1,
            3,
            Duration::hours(8),
        );
        assert!(request.is_err());
    }
}
