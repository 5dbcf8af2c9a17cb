//! Activator (component G): orchestrates the end-to-end activation
//! pipeline, the way `storage::approval_workflow` sequences a multi-step
//! approval through its collaborators.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use core::{Activation, ActivationRequest, ProjectRoleBinding, UserId};
use errors::{CoreError, CoreResult};
use tracing::{info, warn};

use crate::catalog::ProjectRoleCatalog;
use crate::config::EngineConfig;
use crate::justification::JustificationPolicy;
use crate::mutator::{IamBindingMutator, MutationOptions};
use crate::notifier::NotificationDispatcher;
use crate::request;
use crate::token::TokenSigner;

pub struct Activator {
    catalog: Arc<ProjectRoleCatalog>,
    justification: Arc<JustificationPolicy>,
    mutator: Arc<IamBindingMutator>,
    notifier: Arc<NotificationDispatcher>,
    token_signer: Arc<TokenSigner>,
    config: EngineConfig,
    approval_url_prefix: String,
}

impl Activator {
    #[must_use]
    pub fn new(
        catalog: Arc<ProjectRoleCatalog>,
        justification: Arc<JustificationPolicy>,
        mutator: Arc<IamBindingMutator>,
        notifier: Arc<NotificationDispatcher>,
        token_signer: Arc<TokenSigner>,
        config: EngineConfig,
        approval_url_prefix: impl Into<String>,
    ) -> Self {
        Self { catalog, justification, mutator, notifier, token_signer, config, approval_url_prefix: approval_url_prefix.into() }
    }

    pub fn create_jit_request(
        &self,
        user: UserId,
        entitlements: BTreeSet<ProjectRoleBinding>,
        justification: String,
        start: DateTime<Utc>,
        duration: Duration,
    ) -> CoreResult<ActivationRequest> {
        request::new_jit_request(
            user,
            entitlements,
            justification,
            start,
            duration,
            self.config.max_jit_roles_per_self_approval,
            self.config.activation_timeout(),
        )
    }

    pub async fn create_mpa_request(
        &self,
        user: UserId,
        entitlement: ProjectRoleBinding,
        reviewers: BTreeSet<UserId>,
        justification: String,
        start: DateTime<Utc>,
        duration: Duration,
    ) -> CoreResult<ActivationRequest> {
        let request = request::new_mpa_request(
            user,
            entitlement,
            reviewers,
            justification,
            start,
            duration,
            self.config.min_reviewers,
            self.config.max_reviewers,
            self.config.activation_timeout(),
        )?;

        let (token, _issued_at, expires_at) = self.token_signer.sign(&request).await?;
        let approval_url = format!("{}/{}", self.approval_url_prefix, token);
        self.notifier.notify_request_activation(&request, &approval_url, expires_at).await?;

        info!(request_id = %request.id, beneficiary = %request.requesting_user.email, "MPA request created");
        Ok(request)
    }

    /// Self-approval (JIT) or already-approved MPA.
    pub async fn activate(&self, request: &ActivationRequest) -> CoreResult<Activation> {
        self.run_pipeline(
            request,
            MutationOptions { purge_existing_temporary_bindings: true, fail_if_binding_exists: false },
        )
        .await
    }

    /// MPA only: a reviewer approves a pending request.
    pub async fn approve(&self, approver: &UserId, request: &ActivationRequest) -> CoreResult<Activation> {
        if core::ActivationRequestKind::Mpa != request.kind {
            return Err(CoreError::invalid_argument("only MPA requests can be approved"));
        }
        if !request.reviewers.contains(&approver.email) {
            warn!(request_id = %request.id, approver = %approver.email, "approver is not a reviewer for this request");
            return Err(CoreError::access_denied("approver is not a reviewer for this request"));
        }
        if approver.email == request.requesting_user.email {
            warn!(request_id = %request.id, "approver attempted to approve their own request");
            return Err(CoreError::access_denied("cannot approve own request"));
        }

        let activation = self
            .run_pipeline(
                request,
                MutationOptions { purge_existing_temporary_bindings: true, fail_if_binding_exists: true },
            )
            .await?;

        self.notifier.notify_activation_approved(request, approver, &activation).await?;
        info!(request_id = %request.id, approver = %approver.email, "MPA request approved");
        Ok(activation)
    }

    async fn run_pipeline(&self, request: &ActivationRequest, options: MutationOptions) -> CoreResult<Activation> {
        self.catalog.verify_user_can_activate(&request.requesting_user, request).await?;
        self.justification.check(&request.justification, &request.requesting_user)?;

        let principal = request.requesting_user.principal();
        for entitlement in &request.entitlements {
            self.mutator
                .apply_temporary_binding(
                    &entitlement.project_id,
                    &principal,
                    &entitlement.role,
                    request.start_time,
                    request.end_time,
                    &request.justification,
                    options,
                )
                .await?;
        }

        Ok(Activation { request: request.clone(), activation_time: Utc::now() })
    }
}
