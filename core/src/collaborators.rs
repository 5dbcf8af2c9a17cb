//! Narrow collaborator interfaces consumed by the entitlement engine.
//!
//! Concrete implementations (cloud SDK clients, HTTP-backed JWKS fetchers,
//! mail/pub-sub delivery) live outside this crate; the engine only ever
//! depends on these traits, mirroring `idp_sync::okta::IdpClient`.

use async_trait::async_trait;
use errors::CoreResult;

use crate::types::{GroupId, PolicyBinding, Policy, ProjectId, ResourceId, UserId};

/// A single principal/resource pair found by a policy analysis query, plus
/// the condition (if any) governing it.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub resource: ResourceId,
    pub binding: PolicyBinding,
}

/// `PolicyAnalyzer.findAccessibleResourcesByUser` / `findPermissionedPrincipalsByResource`
/// / `getEffectiveIamPolicies`.
#[async_trait]
pub trait PolicyAnalyzer: Send + Sync {
    async fn find_accessible_resources_by_user(
        &self,
        scope: &ResourceId,
        user: &UserId,
        permission_filter: Option<&str>,
        resource_filter: Option<&str>,
        expand_resources: bool,
    ) -> CoreResult<Vec<AnalysisResult>>;

    async fn find_permissioned_principals_by_resource(
        &self,
        scope: &ResourceId,
        resource_full_name: &str,
        role: &str,
    ) -> CoreResult<Vec<AnalysisResult>>;

    async fn get_effective_iam_policies(
        &self,
        scope: &ResourceId,
        project_id: &ProjectId,
    ) -> CoreResult<Vec<PolicyWithSource>>;
}

#[derive(Debug, Clone)]
pub struct PolicyWithSource {
    pub source: ResourceId,
    pub policy: Policy,
}

#[derive(Debug, Clone)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// `ResourceManager.getProjectEffectiveTags` / `searchProjects` /
/// `getIamPolicy` / `setIamPolicy` / `getAncestry`.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    async fn get_project_effective_tags(&self, resource_full_name: &str) -> CoreResult<Vec<Tag>>;

    async fn search_projects(&self, query: &str) -> CoreResult<Vec<ProjectId>>;

    async fn get_iam_policy(&self, project: &ProjectId) -> CoreResult<Policy>;

    async fn set_iam_policy(
        &self,
        project: &ProjectId,
        policy: &Policy,
        reason: &str,
    ) -> CoreResult<()>;

    async fn get_ancestry(&self, project: &ProjectId) -> CoreResult<Vec<ResourceId>>;
}

/// `DirectoryGroups.listDirectGroupMemberships` / `listDirectGroupMembers`.
#[async_trait]
pub trait DirectoryGroups: Send + Sync {
    async fn list_direct_group_memberships(&self, user: &UserId) -> CoreResult<Vec<GroupId>>;

    async fn list_direct_group_members(&self, group_email: &str) -> CoreResult<Vec<UserId>>;
}

/// `JwtSigner.sign` — signs a payload as the named service account and
/// returns the encoded JWT.
#[async_trait]
pub trait JwtSigner: Send + Sync {
    async fn sign(&self, service_account: &str, payload: &str) -> CoreResult<String>;

    fn jwks_url_for(&self, service_account: &str) -> String;
}

/// `JwksProvider` — fetches the public key material published at a JWKS
/// URL. Generic "fetch public keys over HTTP", not a cloud-SDK call, so it
/// is kept separate from `JwtSigner`.
#[async_trait]
pub trait JwksProvider: Send + Sync {
    async fn fetch_pem(&self, jwks_url: &str, key_id: Option<&str>) -> CoreResult<String>;
}

/// `SecretStore.get` — fetches a secret's raw bytes, or `None` if absent.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, secret_path: &str) -> CoreResult<Option<Vec<u8>>>;
}

/// A notification event ready for delivery; see `entitlements::notifier`.
#[derive(Debug, Clone)]
pub struct NotificationEnvelope {
    pub kind: &'static str,
    pub payload: serde_json::Value,
}

/// `NotificationSink.send` / `canSend`.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn can_send(&self) -> bool;

    async fn send(&self, event: &NotificationEnvelope) -> CoreResult<()>;
}

/// The outcome of a single diagnosable's self-check.
#[derive(Debug, Clone)]
pub struct DiagnosticResult {
    pub name: String,
    pub successful: bool,
    pub details: Option<String>,
}

/// A single collaborator self-check used by the readiness aggregator.
#[async_trait]
pub trait Diagnosable: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> DiagnosticResult;
}
