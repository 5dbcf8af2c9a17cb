//! Entitlement repository (component B): two variants of the same contract,
//! both deriving eligible/active role bindings from raw IAM policy analysis.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use core::{
    sentinel, ActivationType, Entitlement, EntitlementSet, EntitlementStatus, GroupId,
    PrincipalRef, ProjectId, ProjectRoleBinding, ResourceId, UserId,
};
use core::{DirectoryGroups, PolicyAnalyzer, ResourceManager};
use errors::{CoreError, CoreResult};
use futures::future::join_all;

/// The contract shared by both repository variants.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    async fn find_projects_with_entitlements(&self, user: &UserId) -> CoreResult<BTreeSet<ProjectId>>;

    async fn find_entitlements(
        &self,
        user: &UserId,
        project_id: &ProjectId,
        types: &[ActivationType],
        statuses: &[EntitlementStatus],
    ) -> CoreResult<EntitlementSet>;

    async fn find_entitlement_holders(
        &self,
        binding: &ProjectRoleBinding,
        activation_type: ActivationType,
    ) -> CoreResult<BTreeSet<UserId>>;
}

/// Backed by the policy-analyzer collaborator (expand-resources queries
/// plus a per-project tag filter).
pub struct PolicyAnalyzerRepository {
    analyzer: Arc<dyn PolicyAnalyzer>,
    resources: Arc<dyn ResourceManager>,
    groups: Arc<dyn DirectoryGroups>,
    scope: ResourceId,
    required_tag_path: Option<String>,
}

impl PolicyAnalyzerRepository {
    #[must_use]
    pub fn new(
        analyzer: Arc<dyn PolicyAnalyzer>,
        resources: Arc<dyn ResourceManager>,
        groups: Arc<dyn DirectoryGroups>,
        scope: ResourceId,
        required_tag_path: Option<String>,
    ) -> Self {
        Self { analyzer, resources, groups, scope, required_tag_path }
    }
}

#[async_trait]
impl EntitlementRepository for PolicyAnalyzerRepository {
    async fn find_projects_with_entitlements(&self, user: &UserId) -> CoreResult<BTreeSet<ProjectId>> {
        let results = self
            .analyzer
            .find_accessible_resources_by_user(&self.scope, user, Some("resourcemanager.projects.get"), None, true)
            .await?;

        let mut projects: BTreeSet<ProjectId> = results
            .into_iter()
            .filter_map(|r| project_id_from_full_name(&r.resource.id))
            .collect();

        if let Some(tag_path) = &self.required_tag_path {
            let candidates: Vec<ProjectId> = projects.into_iter().collect();
            let tag_results = join_all(
                candidates.iter().map(|p| self.resources.get_project_effective_tags(&p.resource().full_name())),
            )
            .await;

            let mut kept = BTreeSet::new();
            for (project, tags) in candidates.into_iter().zip(tag_results) {
                let tags = tags?;
                if tags.iter().any(|t| format!("{}/{}", t.key, t.value) == *tag_path || t.key == *tag_path) {
                    kept.insert(project);
                }
            }
            projects = kept;
        }

        Ok(projects)
    }

    async fn find_entitlements(
        &self,
        user: &UserId,
        project_id: &ProjectId,
        types: &[ActivationType],
        statuses: &[EntitlementStatus],
    ) -> CoreResult<EntitlementSet> {
        let resource_full_name = project_id.resource().full_name();
        let results = self
            .analyzer
            .find_accessible_resources_by_user(&self.scope, user, None, Some(&resource_full_name), false)
            .await?;

        classify(results.into_iter(), project_id, types, statuses)
    }

    async fn find_entitlement_holders(
        &self,
        binding: &ProjectRoleBinding,
        activation_type: ActivationType,
    ) -> CoreResult<BTreeSet<UserId>> {
        let resource_full_name = binding.project_id.resource().full_name();
        let results = self
            .analyzer
            .find_permissioned_principals_by_resource(&self.scope, &resource_full_name, &binding.role)
            .await?;

        let mut holders = BTreeSet::new();
        let mut group_emails = Vec::new();
        for r in &results {
            if !sentinel::is_approval_marker(r.binding.condition.as_ref(), activation_type) {
                continue;
            }
            for member in &r.binding.members {
                match member {
                    PrincipalRef::User(email) => {
                        holders.insert(UserId::new(email.clone(), email.clone()));
                    }
                    PrincipalRef::Group(email) => group_emails.push(email.clone()),
                }
            }
        }

        let memberships = join_all(group_emails.iter().map(|email| self.groups.list_direct_group_members(email))).await;
        for membership in memberships {
            holders.extend(membership?);
        }

        Ok(holders)
    }
}

/// Backed by the asset-inventory collaborator (effective policy fetch plus
/// direct group memberships, intersected against a locally built principal
/// set).
pub struct AssetInventoryRepository {
    analyzer: Arc<dyn PolicyAnalyzer>,
    groups: Arc<dyn DirectoryGroups>,
    scope: ResourceId,
}

impl AssetInventoryRepository {
    #[must_use]
    pub fn new(analyzer: Arc<dyn PolicyAnalyzer>, groups: Arc<dyn DirectoryGroups>, scope: ResourceId) -> Self {
        Self { analyzer, groups, scope }
    }
}

#[async_trait]
impl EntitlementRepository for AssetInventoryRepository {
    async fn find_projects_with_entitlements(&self, _user: &UserId) -> CoreResult<BTreeSet<ProjectId>> {
        Err(CoreError::invalid_argument(
            "asset-inventory repository does not support project discovery; use availableProjectsQuery",
        ))
    }

    async fn find_entitlements(
        &self,
        user: &UserId,
        project_id: &ProjectId,
        types: &[ActivationType],
        statuses: &[EntitlementStatus],
    ) -> CoreResult<EntitlementSet> {
        let (policies, memberships) = tokio::try_join!(
            self.analyzer.get_effective_iam_policies(&self.scope, project_id),
            self.groups.list_direct_group_memberships(user),
        )?;

        let mut principal_set: BTreeSet<PrincipalRef> = BTreeSet::new();
        principal_set.insert(user.principal());
        for group in &memberships {
            principal_set.insert(group.principal());
        }

        let results = policies.into_iter().flat_map(|p| {
            let source = p.source.clone();
            p.policy
                .bindings
                .into_iter()
                .filter(|b| b.members.iter().any(|m| principal_set.contains(m)))
                .map(move |binding| core::AnalysisResult { resource: source.clone(), binding })
        });

        classify(results, project_id, types, statuses)
    }

    async fn find_entitlement_holders(
        &self,
        binding: &ProjectRoleBinding,
        activation_type: ActivationType,
    ) -> CoreResult<BTreeSet<UserId>> {
        let policies = self
            .analyzer
            .get_effective_iam_policies(&self.scope, &binding.project_id)
            .await?;

        let mut holders = BTreeSet::new();
        let mut group_emails = Vec::new();
        for p in policies {
            for b in p.policy.bindings {
                if b.role != binding.role {
                    continue;
                }
                if !sentinel::is_approval_marker(b.condition.as_ref(), activation_type) {
                    continue;
                }
                for member in b.members {
                    match member {
                        PrincipalRef::User(email) => {
                            holders.insert(UserId::new(email.clone(), email));
                        }
                        PrincipalRef::Group(email) => group_emails.push(email),
                    }
                }
            }
        }

        let memberships = join_all(group_emails.iter().map(|email| self.groups.list_direct_group_members(email))).await;
        for membership in memberships {
            holders.extend(membership?);
        }

        Ok(holders)
    }
}

/// Classifies raw analysis results into eligible/active entitlements,
/// applying JIT-over-MPA precedence and sentinel purity (§4.A invariant 1).
fn classify(
    results: impl Iterator<Item = core::AnalysisResult>,
    project_id: &ProjectId,
    types: &[ActivationType],
    statuses: &[EntitlementStatus],
) -> CoreResult<EntitlementSet> {
    let now = Utc::now();
    let mut by_binding: std::collections::BTreeMap<ProjectRoleBinding, ActivationType> = std::collections::BTreeMap::new();
    let mut active: BTreeSet<ProjectRoleBinding> = BTreeSet::new();
    let mut warnings: BTreeSet<String> = BTreeSet::new();

    for result in results {
        let role_binding = ProjectRoleBinding::new(project_id.clone(), result.binding.role.clone());
        let condition = result.binding.condition.as_ref();

        if sentinel::is_activated(condition) {
            if let Some(c) = condition {
                match sentinel::parse_window(&c.expression) {
                    Some((start, end)) if start <= now && now < end => {
                        active.insert(role_binding);
                    }
                    Some(_) => {}
                    None => {
                        warnings.insert(format!("malformed activation window on {}", role_binding.role_binding()));
                    }
                }
            }
            continue;
        }

        if sentinel::is_jit_marker(condition) && types.contains(&ActivationType::Jit) {
            by_binding.insert(role_binding.clone(), ActivationType::Jit);
        } else if sentinel::is_mpa_marker(condition) && types.contains(&ActivationType::Mpa) {
            by_binding.entry(role_binding).or_insert(ActivationType::Mpa);
        }
    }

    let mut available = BTreeSet::new();
    for (role_binding, activation_type) in by_binding {
        let status = if active.contains(&role_binding) {
            EntitlementStatus::Active
        } else {
            EntitlementStatus::Available
        };
        if !statuses.is_empty() && !statuses.contains(&status) {
            continue;
        }
        available.insert(Entitlement {
            id: format!("{role_binding}", role_binding = role_binding.role_binding()),
            display_name: role_binding.role.clone(),
            activation_type,
            status,
            role_binding,
        });
    }

    Ok(EntitlementSet { available, active, warnings })
}

fn project_id_from_full_name(full_name_or_id: &str) -> Option<ProjectId> {
    let id = full_name_or_id.rsplit('/').next().unwrap_or(full_name_or_id);
    if id.is_empty() {
        None
    } else {
        Some(ProjectId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::{IamCondition, PolicyBinding};

    fn analysis(role: &str, condition: Option<IamCondition>) -> core::AnalysisResult {
        core::AnalysisResult {
            resource: ResourceId::new(core::ResourceKind::Project, "project-1"),
            binding: PolicyBinding {
                role: role.to_string(),
                members: vec![PrincipalRef::User("alice@example.com".into())],
                condition,
            },
        }
    }

    fn jit_condition() -> IamCondition {
        IamCondition { expression: "has({}.jitAccessConstraint)".into(), title: None, description: None }
    }

    fn mpa_condition() -> IamCondition {
        IamCondition { expression: "has({}.multiPartyApprovalConstraint)".into(), title: None, description: None }
    }

    #[test]
    fn jit_wins_over_mpa_for_same_binding() {
        let project = ProjectId("project-1".into());
        let results = vec![
            analysis("roles/browser", Some(mpa_condition())),
            analysis("roles/browser", Some(jit_condition())),
        ];
        let set = classify(
            results.into_iter(),
            &project,
            &[ActivationType::Jit, ActivationType::Mpa],
            &[],
        )
        .unwrap();
        assert_eq!(set.available.len(), 1);
        assert_eq!(set.available.iter().next().unwrap().activation_type, ActivationType::Jit);
    }

    #[test]
    fn sentinel_purity_excludes_tampered_condition() {
        let tampered = IamCondition {
            expression: "has({}.jitAccessConstraint) && true".into(),
            title: None,
            description: None,
        };
        let project = ProjectId("project-1".into());
        let results = vec![analysis("roles/browser", Some(tampered))];
        let set = classify(results.into_iter(), &project, &[ActivationType::Jit], &[]).unwrap();
        assert!(set.available.is_empty());
    }

    #[test]
    fn malformed_activated_condition_surfaces_as_warning() {
        let project = ProjectId("project-1".into());
        let corrupted = IamCondition {
            expression: "garbage".into(),
            title: Some("JIT access activation".into()),
            description: None,
        };
        let results = vec![analysis("roles/browser", Some(corrupted))];
        let set = classify(results.into_iter(), &project, &[ActivationType::Jit], &[]).unwrap();
        assert!(set.active.is_empty());
        assert_eq!(set.warnings.len(), 1);
    }

    #[test]
    fn duplicate_jit_bindings_collapse_to_one_entitlement() {
        let project = ProjectId("project-1".into());
        let results = vec![
            analysis("roles/browser", Some(jit_condition())),
            analysis("roles/browser", Some(jit_condition())),
        ];
        let set = classify(results.into_iter(), &project, &[ActivationType::Jit], &[]).unwrap();
        assert_eq!(set.available.len(), 1);
    }
}
