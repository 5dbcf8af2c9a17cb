//! IAM binding mutator (component H).
//!
//! Read-modify-write against a project's IAM policy, serialized by the
//! platform's etag-based optimistic concurrency, with a bounded exponential
//! backoff retry on conflict — the same `backoff`-crate shape as
//! `azure-pim-cli`'s retry helper, adapted to an async read-modify-write
//! loop instead of a single request.

use std::time::Duration as StdDuration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use chrono::{DateTime, Utc};
use core::{sentinel, PolicyBinding, PrincipalRef, ProjectId, ResourceManager};
use errors::{CoreError, CoreResult, ErrorKind};
use std::sync::Arc;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 100;

#[derive(Debug, Clone, Copy, Default)]
pub struct MutationOptions {
    pub purge_existing_temporary_bindings: bool,
    pub fail_if_binding_exists: bool,
}

pub struct IamBindingMutator {
    resources: Arc<dyn ResourceManager>,
}

impl IamBindingMutator {
    #[must_use]
    pub fn new(resources: Arc<dyn ResourceManager>) -> Self {
        Self { resources }
    }

    pub async fn apply_temporary_binding(
        &self,
        project: &ProjectId,
        principal: &PrincipalRef,
        role: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        reason: &str,
        options: MutationOptions,
    ) -> CoreResult<()> {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(StdDuration::from_millis(INITIAL_BACKOFF_MS))
            .build();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_apply(project, principal, role, start, end, reason, options).await {
                Ok(()) => return Ok(()),
                Err(err) if is_conflict(&err) && attempt < MAX_ATTEMPTS => {
                    warn!(project = %project.0, role, attempt, "etag conflict applying binding, retrying");
                    if let Some(delay) = backoff.next_backoff() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) if is_conflict(&err) => {
                    warn!(project = %project.0, role, attempt, "etag conflict retries exhausted");
                    return Err(CoreError::ConflictRetryExhausted { resource: project.0.clone(), attempts: attempt });
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_apply(
        &self,
        project: &ProjectId,
        principal: &PrincipalRef,
        role: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        reason: &str,
        options: MutationOptions,
    ) -> CoreResult<()> {
        let mut policy = self.resources.get_iam_policy(project).await?;

        if options.purge_existing_temporary_bindings {
            policy.bindings.retain(|b| !is_prior_temporary_grant(b, principal, role));
        }

        let new_binding = PolicyBinding {
            role: role.to_string(),
            members: vec![principal.clone()],
            condition: Some(sentinel::temporary_condition_for(start, end - start)),
        };

        if options.fail_if_binding_exists && policy.bindings.iter().any(|b| b.structurally_equal(&new_binding, false)) {
            return Err(CoreError::already_exists(format!("{}:{}", project.0, role)));
        }

        policy.bindings.push(new_binding);
        self.resources.set_iam_policy(project, &policy, reason).await
    }
}

fn is_prior_temporary_grant(binding: &PolicyBinding, principal: &PrincipalRef, role: &str) -> bool {
    binding.role == role
        && binding.members.len() == 1
        && binding.members[0] == *principal
        && sentinel::is_activated(binding.condition.as_ref())
}

fn is_conflict(err: &CoreError) -> bool {
    err.kind() == ErrorKind::ConflictRetryExhausted
}
