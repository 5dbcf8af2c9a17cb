//! Shared types and collaborator traits for the entitlement activation engine.

pub mod collaborators;
pub mod sentinel;
pub mod types;

pub use collaborators::{
    AnalysisResult, Diagnosable, DiagnosticResult, DirectoryGroups, JwksProvider, JwtSigner,
    NotificationEnvelope, NotificationSink, PolicyAnalyzer, PolicyWithSource, ResourceManager,
    SecretStore, Tag,
};
pub use sentinel::{evaluate, is_activated, is_approval_marker, is_jit_marker, is_mpa_marker, temporary_condition_for};
pub use types::{
    Activation, ActivationRequest, ActivationRequestKind, ActivationType, Entitlement,
    EntitlementSet, EntitlementStatus, GroupId, IamCondition, Policy, PolicyBinding, PrincipalRef,
    ProjectId, ProjectRoleBinding, ResourceId, ResourceKind, RoleBinding, UserId,
};
