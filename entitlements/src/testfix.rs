//! Hand-built fake collaborators shared by this crate's test modules.
//!
//! No `testcontainers`, no `wiremock` — these are plain in-memory stand-ins,
//! the way `idp_sync`'s own unit tests construct fixtures inline.

#![cfg(test)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use core::{
    ActivationType, Diagnosable, DiagnosticResult, EntitlementSet, EntitlementStatus, GroupId,
    JwksProvider, JwtSigner, NotificationEnvelope, NotificationSink, Policy, ProjectId,
    ProjectRoleBinding, Tag, UserId,
};
use errors::{CoreError, CoreResult};

use crate::repository::EntitlementRepository;

#[derive(Default)]
pub struct StubRepository {
    pub holders: BTreeSet<UserId>,
    pub projects: BTreeSet<ProjectId>,
    pub entitlement_sets: BTreeMap<String, EntitlementSet>,
}

impl StubRepository {
    pub fn with_holders(holders: BTreeSet<UserId>) -> Self {
        Self { holders, ..Self::default() }
    }

    pub fn with_entitlement_set(project_id: &ProjectId, set: EntitlementSet) -> Self {
        let mut sets = BTreeMap::new();
        sets.insert(project_id.0.clone(), set);
        Self { entitlement_sets: sets, ..Self::default() }
    }
}

#[async_trait]
impl EntitlementRepository for StubRepository {
    async fn find_projects_with_entitlements(&self, _user: &UserId) -> CoreResult<BTreeSet<ProjectId>> {
        Ok(self.projects.clone())
    }

    async fn find_entitlements(
        &self,
        _user: &UserId,
        project_id: &ProjectId,
        _types: &[ActivationType],
        _statuses: &[EntitlementStatus],
    ) -> CoreResult<EntitlementSet> {
        Ok(self.entitlement_sets.get(&project_id.0).cloned().unwrap_or_default())
    }

    async fn find_entitlement_holders(
        &self,
        _binding: &ProjectRoleBinding,
        _activation_type: ActivationType,
    ) -> CoreResult<BTreeSet<UserId>> {
        Ok(self.holders.clone())
    }
}

#[derive(Default)]
pub struct FakeResourceManager {
    pub policies: Mutex<BTreeMap<String, Policy>>,
    pub search_results: BTreeMap<String, Vec<ProjectId>>,
    pub tags: BTreeMap<String, Vec<Tag>>,
    pub set_policy_calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl core::ResourceManager for FakeResourceManager {
    async fn get_project_effective_tags(&self, resource_full_name: &str) -> CoreResult<Vec<Tag>> {
        Ok(self.tags.get(resource_full_name).cloned().unwrap_or_default())
    }

    async fn search_projects(&self, query: &str) -> CoreResult<Vec<ProjectId>> {
        Ok(self.search_results.get(query).cloned().unwrap_or_default())
    }

    async fn get_iam_policy(&self, project: &ProjectId) -> CoreResult<Policy> {
        Ok(self.policies.lock().unwrap().get(&project.0).cloned().unwrap_or_default())
    }

    async fn set_iam_policy(&self, project: &ProjectId, policy: &Policy, reason: &str) -> CoreResult<()> {
        self.set_policy_calls.lock().unwrap().push((project.0.clone(), reason.to_string()));
        self.policies.lock().unwrap().insert(project.0.clone(), policy.clone());
        Ok(())
    }

    async fn get_ancestry(&self, _project: &ProjectId) -> CoreResult<Vec<core::ResourceId>> {
        Ok(Vec::new())
    }
}

impl FakeResourceManager {
    pub fn seed_policy(&mut self, project: &ProjectId, policy: Policy) {
        self.policies.get_mut().unwrap().insert(project.0.clone(), policy);
    }
}

/// A `ResourceManager` fake whose `set_iam_policy` rejects the first N
/// calls with an etag conflict, to exercise the mutator's retry loop.
pub struct FlakyResourceManager {
    pub inner: FakeResourceManager,
    pub conflicts_remaining: Mutex<u32>,
}

impl FlakyResourceManager {
    pub fn new(inner: FakeResourceManager, conflicts: u32) -> Self {
        Self { inner, conflicts_remaining: Mutex::new(conflicts) }
    }
}

#[async_trait]
impl core::ResourceManager for FlakyResourceManager {
    async fn get_project_effective_tags(&self, resource_full_name: &str) -> CoreResult<Vec<Tag>> {
        self.inner.get_project_effective_tags(resource_full_name).await
    }

    async fn search_projects(&self, query: &str) -> CoreResult<Vec<ProjectId>> {
        self.inner.search_projects(query).await
    }

    async fn get_iam_policy(&self, project: &ProjectId) -> CoreResult<Policy> {
        self.inner.get_iam_policy(project).await
    }

    async fn set_iam_policy(&self, project: &ProjectId, policy: &Policy, reason: &str) -> CoreResult<()> {
        let mut remaining = self.conflicts_remaining.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(CoreError::ConflictRetryExhausted { resource: project.0.clone(), attempts: 1 });
        }
        drop(remaining);
        self.inner.set_iam_policy(project, policy, reason).await
    }

    async fn get_ancestry(&self, project: &ProjectId) -> CoreResult<Vec<core::ResourceId>> {
        self.inner.get_ancestry(project).await
    }
}

#[derive(Default)]
pub struct FakeDirectoryGroups {
    pub memberships: BTreeMap<String, Vec<GroupId>>,
    pub members: BTreeMap<String, Vec<UserId>>,
}

#[async_trait]
impl core::DirectoryGroups for FakeDirectoryGroups {
    async fn list_direct_group_memberships(&self, user: &UserId) -> CoreResult<Vec<GroupId>> {
        Ok(self.memberships.get(&user.email).cloned().unwrap_or_default())
    }

    async fn list_direct_group_members(&self, group_email: &str) -> CoreResult<Vec<UserId>> {
        Ok(self.members.get(group_email).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct FakeNotificationSink {
    pub sendable: bool,
    pub sent: Mutex<Vec<String>>,
}

impl FakeNotificationSink {
    pub fn enabled() -> Self {
        Self { sendable: true, sent: Mutex::new(Vec::new()) }
    }

    pub fn disabled() -> Self {
        Self { sendable: false, sent: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl NotificationSink for FakeNotificationSink {
    fn can_send(&self) -> bool {
        self.sendable
    }

    async fn send(&self, event: &NotificationEnvelope) -> CoreResult<()> {
        self.sent.lock().unwrap().push(event.kind.to_string());
        Ok(())
    }
}

pub struct FakeDiagnosable {
    pub name: String,
    pub successful: bool,
}

#[async_trait]
impl Diagnosable for FakeDiagnosable {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> DiagnosticResult {
        DiagnosticResult { name: self.name.clone(), successful: self.successful, details: None }
    }
}

/// Stands in for a remote `signJwt`-style signer: returns an opaque token
/// string without touching real RSA key material, since the activator-level
/// tests that use this fake never call `TokenSigner::verify`.
#[derive(Default)]
pub struct FakeJwtSigner {
    pub calls: Mutex<Vec<String>>,
}

#[async_trait]
impl JwtSigner for FakeJwtSigner {
    async fn sign(&self, service_account: &str, payload: &str) -> CoreResult<String> {
        self.calls.lock().unwrap().push(payload.to_string());
        Ok(format!("header.{}.signature", general_purpose_encode(payload, service_account)))
    }

    fn jwks_url_for(&self, service_account: &str) -> String {
        format!("https://jwks.example.com/{service_account}")
    }
}

fn general_purpose_encode(payload: &str, service_account: &str) -> String {
    format!("{}-{}", service_account.len(), payload.len())
}

#[derive(Default)]
pub struct FakeJwksProvider;

#[async_trait]
impl JwksProvider for FakeJwksProvider {
    async fn fetch_pem(&self, _jwks_url: &str, _key_id: Option<&str>) -> CoreResult<String> {
        Err(CoreError::feature_not_available("fake JWKS provider does not hold real key material"))
    }
}
