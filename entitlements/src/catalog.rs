//! Project role catalog (component C): wraps a repository and the
//! resource-manager collaborator, applying policy options atop raw
//! eligibility data.

use std::collections::BTreeSet;
use std::sync::Arc;

use core::{ActivationRequest, ActivationType, EntitlementSet, EntitlementStatus, ProjectId, ProjectRoleBinding, ResourceManager, UserId};
use errors::{CoreError, CoreResult};

use crate::config::EngineConfig;
use crate::repository::EntitlementRepository;

pub struct ProjectRoleCatalog {
    repository: Arc<dyn EntitlementRepository>,
    resources: Arc<dyn ResourceManager>,
    available_projects_query: Option<String>,
    config: EngineConfig,
}

impl ProjectRoleCatalog {
    #[must_use]
    pub fn new(
        repository: Arc<dyn EntitlementRepository>,
        resources: Arc<dyn ResourceManager>,
        available_projects_query: Option<String>,
        config: EngineConfig,
    ) -> Self {
        Self { repository, resources, available_projects_query, config }
    }

    /// The policy options this catalog's operations are governed by.
    #[must_use]
    pub fn options(&self) -> &EngineConfig {
        &self.config
    }

    /// Delegates to the repository unless an override query is configured,
    /// in which case it searches via the resource-manager collaborator
    /// instead of the policy-analyzer projects query.
    pub async fn list_projects(&self, user: &UserId) -> CoreResult<BTreeSet<ProjectId>> {
        if let Some(query) = &self.available_projects_query {
            let projects = self.resources.search_projects(query).await?;
            return Ok(projects.into_iter().collect());
        }
        self.repository.find_projects_with_entitlements(user).await
    }

    pub async fn list_entitlements(
        &self,
        user: &UserId,
        project_id: &ProjectId,
        types: &[ActivationType],
        statuses: &[EntitlementStatus],
    ) -> CoreResult<EntitlementSet> {
        self.repository.find_entitlements(user, project_id, types, statuses).await
    }

    /// Returns potential MPA reviewers, excluding the requesting user — a
    /// user can never approve their own request (invariant 3).
    pub async fn list_reviewers(&self, user: &UserId, binding: &ProjectRoleBinding) -> CoreResult<BTreeSet<UserId>> {
        let mut holders = self.repository.find_entitlement_holders(binding, ActivationType::Mpa).await?;
        holders.remove(user);
        Ok(holders)
    }

    /// Confirms every requested role binding appears in the user's
    /// AVAILABLE set for the request's activation type.
    pub async fn verify_user_can_activate(&self, user: &UserId, request: &ActivationRequest) -> CoreResult<()> {
        let activation_type = match request.kind {
            core::ActivationRequestKind::JitSelfApproval => ActivationType::Jit,
            core::ActivationRequestKind::Mpa => ActivationType::Mpa,
        };

        for entitlement in &request.entitlements {
            let set = self
                .repository
                .find_entitlements(user, &entitlement.project_id, &[activation_type], &[EntitlementStatus::Available])
                .await?;

            let eligible = set
                .available
                .iter()
                .any(|e| e.role_binding == *entitlement && e.activation_type == activation_type);

            if !eligible {
                return Err(CoreError::access_denied(format!(
                    "user {} is not eligible to activate {}",
                    user.email,
                    entitlement.role_binding()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testfix::{FakeResourceManager, StubRepository};

    #[tokio::test]
    async fn list_reviewers_excludes_requesting_user() {
        let binding = ProjectRoleBinding::new(ProjectId("project-1".into()), "roles/iam.admin");
        let mut holders = BTreeSet::new();
        holders.insert(UserId::new("alice@example.com", "alice@example.com"));
        holders.insert(UserId::new("bob@example.com", "bob@example.com"));

        let repo = Arc::new(StubRepository::with_holders(holders));
        let resources = Arc::new(FakeResourceManager::default());
        let catalog = ProjectRoleCatalog::new(repo, resources, None, EngineConfig::default());

        let reviewers = catalog
            .list_reviewers(&UserId::new("alice@example.com", "alice@example.com"), &binding)
            .await
            .unwrap();

        assert!(!reviewers.contains(&UserId::new("alice@example.com", "alice@example.com")));
        assert!(reviewers.contains(&UserId::new("bob@example.com", "bob@example.com")));
    }

    #[tokio::test]
    async fn list_projects_uses_override_query_when_configured() {
        let mut resources = FakeResourceManager::default();
        resources.search_results.insert("tag:team=payments".into(), vec![ProjectId("project-9".into())]);
        let resources = Arc::new(resources);
        let repo = Arc::new(StubRepository::default());
        let catalog = ProjectRoleCatalog::new(repo, resources, Some("tag:team=payments".into()), EngineConfig::default());

        let projects = catalog.list_projects(&UserId::new("alice@example.com", "alice@example.com")).await.unwrap();
        assert_eq!(projects, BTreeSet::from([ProjectId("project-9".into())]));
    }

    #[tokio::test]
    async fn options_returns_the_configured_engine_config() {
        let repo = Arc::new(StubRepository::default());
        let resources = Arc::new(FakeResourceManager::default());
        let mut config = EngineConfig::default();
        config.max_reviewers = 7;
        let catalog = ProjectRoleCatalog::new(repo, resources, None, config);

        assert_eq!(catalog.options().max_reviewers, 7);
    }
}
