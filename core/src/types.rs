use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of resource an entitlement or binding is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Project,
    Folder,
    Organization,
}

impl ResourceKind {
    fn segment(self) -> &'static str {
        match self {
            ResourceKind::Project => "projects",
            ResourceKind::Folder => "folders",
            ResourceKind::Organization => "organizations",
        }
    }
}

/// An immutable resource identifier: `//cloudresourcemanager.googleapis.com/<type>s/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceId {
    #[must_use]
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "//cloudresourcemanager.googleapis.com/{}/{}",
            self.kind.segment(),
            self.id
        )
    }
}

impl PartialEq for ResourceId {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.id == other.id
    }
}
impl Eq for ResourceId {}

/// A `ResourceId` known to be a project; projects compare by id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    #[must_use]
    pub fn resource(&self) -> ResourceId {
        ResourceId::new(ResourceKind::Project, self.0.clone())
    }
}

impl PartialEq for ProjectId {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for ProjectId {}
impl PartialOrd for ProjectId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ProjectId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}
impl Hash for ProjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// A user identity: `(id, email)`, equal and hashed by email alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserId {
    pub id: String,
    pub email: String,
}

impl UserId {
    #[must_use]
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self { id: id.into(), email: email.into() }
    }

    #[must_use]
    pub fn principal(&self) -> PrincipalRef {
        PrincipalRef::User(self.email.clone())
    }
}

impl PartialEq for UserId {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email
    }
}
impl Eq for UserId {}
impl PartialOrd for UserId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for UserId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.email.cmp(&other.email)
    }
}
impl Hash for UserId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.email.hash(state);
    }
}

/// A group identity: its email.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    #[must_use]
    pub fn principal(&self) -> PrincipalRef {
        PrincipalRef::Group(self.0.clone())
    }
}

/// A member of a principal set, tagged `user:` or `group:` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PrincipalRef {
    User(String),
    Group(String),
}

impl PrincipalRef {
    #[must_use]
    pub fn email(&self) -> &str {
        match self {
            PrincipalRef::User(email) | PrincipalRef::Group(email) => email,
        }
    }
}

impl std::fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalRef::User(email) => write!(f, "user:{email}"),
            PrincipalRef::Group(email) => write!(f, "group:{email}"),
        }
    }
}

impl From<PrincipalRef> for String {
    fn from(value: PrincipalRef) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for PrincipalRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Some(email) = value.strip_prefix("user:") {
            Ok(PrincipalRef::User(email.to_string()))
        } else if let Some(email) = value.strip_prefix("group:") {
            Ok(PrincipalRef::Group(email.to_string()))
        } else {
            Err(format!("not a principal reference: {value}"))
        }
    }
}

/// `(resourceFullName, roleName)`, with canonical `toString` `resource:role`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleBinding {
    pub resource_full_name: String,
    pub role: String,
}

impl std::fmt::Display for RoleBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource_full_name, self.role)
    }
}

/// A `RoleBinding` restricted to project resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRoleBinding {
    pub project_id: ProjectId,
    pub role: String,
}

impl ProjectRoleBinding {
    #[must_use]
    pub fn new(project_id: ProjectId, role: impl Into<String>) -> Self {
        Self { project_id, role: role.into() }
    }

    #[must_use]
    pub fn role_binding(&self) -> RoleBinding {
        RoleBinding {
            resource_full_name: self.project_id.resource().full_name(),
            role: self.role.clone(),
        }
    }
}

/// An IAM condition: an expression plus an optional title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamCondition {
    pub expression: String,
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// The activation flavor an entitlement or request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationType {
    Jit,
    Mpa,
}

/// The lifecycle state of an entitlement, ordered `Available < Active < ActivationPending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntitlementStatus {
    Available,
    Active,
    ActivationPending,
}

/// A potential or actual role assignment for a user, with status and activation type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: String,
    pub display_name: String,
    pub activation_type: ActivationType,
    pub status: EntitlementStatus,
    pub role_binding: ProjectRoleBinding,
}

impl PartialEq for Entitlement {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for Entitlement {}

impl PartialOrd for Entitlement {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entitlement {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.status
            .cmp(&other.status)
            .then_with(|| self.display_name.cmp(&other.display_name))
    }
}

/// The set of eligible and active entitlements for a user on a scope.
///
/// `available` is sorted by `(status, displayName)` via `Entitlement`'s `Ord`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitlementSet {
    pub available: BTreeSet<Entitlement>,
    pub active: BTreeSet<ProjectRoleBinding>,
    pub warnings: BTreeSet<String>,
}

impl PartialOrd for ProjectRoleBinding {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ProjectRoleBinding {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.project_id
            .cmp(&other.project_id)
            .then_with(|| self.role.cmp(&other.role))
    }
}

/// Whether a request is a self-approved JIT elevation or requires peer approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationRequestKind {
    JitSelfApproval,
    Mpa,
}

/// An immutable activation request, either JIT (self-approval) or MPA (peer approval).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub id: String,
    pub kind: ActivationRequestKind,
    pub requesting_user: UserId,
    pub entitlements: BTreeSet<ProjectRoleBinding>,
    pub justification: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub reviewers: BTreeSet<String>,
}

impl PartialEq for ActivationRequest {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for ActivationRequest {}

impl ActivationRequest {
    /// Generates a fresh opaque id, `jit-<uuid>` or `mpa-<uuid>`.
    #[must_use]
    pub fn generate_id(kind: ActivationRequestKind) -> String {
        let prefix = match kind {
            ActivationRequestKind::JitSelfApproval => "jit",
            ActivationRequestKind::Mpa => "mpa",
        };
        format!("{prefix}-{}", Uuid::new_v4())
    }
}

/// The outcome of a successful `Activator::activate` call; ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activation {
    pub request: ActivationRequest,
    pub activation_time: DateTime<Utc>,
}

/// A single binding in an external IAM policy document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyBinding {
    pub role: String,
    pub members: Vec<PrincipalRef>,
    pub condition: Option<IamCondition>,
}

impl PolicyBinding {
    /// Binding equality per §4.H: role equal, member sets equal
    /// (order-insensitive), condition equal (title, expression, description).
    /// `ignore_condition` supports the diagnostic-tooling equality variant.
    #[must_use]
    pub fn structurally_equal(&self, other: &Self, ignore_condition: bool) -> bool {
        if self.role != other.role {
            return false;
        }
        let mut a: Vec<&PrincipalRef> = self.members.iter().collect();
        let mut b: Vec<&PrincipalRef> = other.members.iter().collect();
        a.sort_by_key(|p| p.to_string());
        b.sort_by_key(|p| p.to_string());
        if a != b {
            return false;
        }
        ignore_condition || self.condition == other.condition
    }
}

/// A project's IAM policy: a list of bindings plus an opaque concurrency token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    pub bindings: Vec<PolicyBinding>,
    pub etag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_equality_ignores_id() {
        let a = UserId::new("1", "alice@example.com");
        let b = UserId::new("2", "alice@example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn principal_ref_round_trips_through_string() {
        let p = PrincipalRef::User("alice@example.com".into());
        let s: String = p.clone().into();
        assert_eq!(s, "user:alice@example.com");
        assert_eq!(PrincipalRef::try_from(s).unwrap(), p);
    }

    #[test]
    fn entitlement_orders_by_status_then_name() {
        let rb = ProjectRoleBinding::new(ProjectId("project-1".into()), "roles/browser");
        let available = Entitlement {
            id: "a".into(),
            display_name: "zeta".into(),
            activation_type: ActivationType::Jit,
            status: EntitlementStatus::Available,
            role_binding: rb.clone(),
        };
        let active = Entitlement {
            id: "b".into(),
            display_name: "alpha".into(),
            activation_type: ActivationType::Jit,
            status: EntitlementStatus::Active,
            role_binding: rb,
        };
        assert!(available < active);
    }

    #[test]
    fn resource_id_full_name_matches_format() {
        let r = ResourceId::new(ResourceKind::Project, "project-1");
        assert_eq!(
            r.full_name(),
            "//cloudresourcemanager.googleapis.com/projects/project-1"
        );
    }

    #[test]
    fn binding_equality_is_order_insensitive_on_members() {
        let a = PolicyBinding {
            role: "roles/browser".into(),
            members: vec![
                PrincipalRef::User("a@example.com".into()),
                PrincipalRef::User("b@example.com".into()),
            ],
            condition: None,
        };
        let b = PolicyBinding {
            role: "roles/browser".into(),
            members: vec![
                PrincipalRef::User("b@example.com".into()),
                PrincipalRef::User("a@example.com".into()),
            ],
            condition: None,
        };
        assert!(a.structurally_equal(&b, false));
    }
}
