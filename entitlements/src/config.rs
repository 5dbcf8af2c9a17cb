//! Engine configuration.
//!
//! Mirrors `idp_sync::config::IdpSyncConfig`'s shape: a `serde`-deserializable
//! struct with `#[serde(default)]` fields, a hand-written `Default` impl,
//! and `validator`-derived bounds checked explicitly rather than relying on
//! type-level invariants.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Policy options consulted by the catalog, justification policy, activator,
/// and request constructors. See the configuration table in the design
/// notes for the meaning of each field.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Root resource identifier for discovery queries.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Max duration, in seconds, for a granted activation.
    #[serde(default = "default_activation_timeout_seconds")]
    #[validate(range(min = 60))]
    pub activation_timeout_seconds: i64,

    /// Max lifetime, in seconds, of an approval token.
    #[serde(default = "default_activation_request_timeout_seconds")]
    #[validate(range(min = 60))]
    pub activation_request_timeout_seconds: i64,

    /// Regex the justification must match.
    #[serde(default = "default_justification_pattern")]
    pub justification_pattern: String,

    /// Minimum number of MPA reviewers.
    #[serde(default = "default_min_reviewers")]
    #[validate(range(min = 1))]
    pub min_reviewers: usize,

    /// Maximum number of MPA reviewers.
    #[serde(default = "default_max_reviewers")]
    pub max_reviewers: usize,

    /// Maximum number of roles per JIT self-approval request.
    #[serde(default = "default_max_jit_roles")]
    #[validate(range(min = 1))]
    pub max_jit_roles_per_self_approval: usize,

    /// Alternate project-discovery query against the resource manager.
    #[serde(default)]
    pub available_projects_query: Option<String>,

    /// Tag predicate a project must carry to be eligible, as a dotted path.
    #[serde(default)]
    pub required_project_tag_path: Option<String>,

    /// Bound on the fan-out executor's worker count (§5).
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1))]
    pub max_concurrency: usize,
}

fn default_scope() -> String {
    "organizations/0".to_string()
}

fn default_activation_timeout_seconds() -> i64 {
    8 * 3600
}

fn default_activation_request_timeout_seconds() -> i64 {
    3600
}

fn default_justification_pattern() -> String {
    ".+".to_string()
}

fn default_min_reviewers() -> usize {
    1
}

fn default_max_reviewers() -> usize {
    3
}

fn default_max_jit_roles() -> usize {
    5
}

fn default_max_concurrency() -> usize {
    16
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            activation_timeout_seconds: default_activation_timeout_seconds(),
            activation_request_timeout_seconds: default_activation_request_timeout_seconds(),
            justification_pattern: default_justification_pattern(),
            min_reviewers: default_min_reviewers(),
            max_reviewers: default_max_reviewers(),
            max_jit_roles_per_self_approval: default_max_jit_roles(),
            available_projects_query: None,
            required_project_tag_path: None,
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn activation_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.activation_timeout_seconds)
    }

    #[must_use]
    pub fn activation_request_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.activation_request_timeout_seconds)
    }
}
