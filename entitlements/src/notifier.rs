//! Notification event emitter (component I).
//!
//! Fans a structured event out to every configured sink concurrently, the
//! way `storage::approval_workflow`'s `NotificationService` wrapper does for
//! timeout reminders. An event with no sink willing to carry it is a hard
//! failure for MPA (`FeatureNotAvailable`), since an approval request a
//! reviewer never hears about can never be approved.

use std::sync::Arc;

use core::{Activation, ActivationRequest, NotificationEnvelope, NotificationSink, UserId};
use errors::{CoreError, CoreResult};
use futures::future::join_all;
use tracing::warn;

pub struct NotificationDispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl NotificationDispatcher {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub async fn notify_request_activation(
        &self,
        request: &ActivationRequest,
        approval_url: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> CoreResult<()> {
        let payload = serde_json::json!({
            "requestId": request.id,
            "beneficiary": request.requesting_user.email,
            "approvalUrl": approval_url,
            "expiresAt": expires_at.to_rfc3339(),
        });
        self.dispatch(&NotificationEnvelope { kind: "RequestActivation", payload }).await
    }

    pub async fn notify_activation_approved(
        &self,
        request: &ActivationRequest,
        approver: &UserId,
        activation: &Activation,
    ) -> CoreResult<()> {
        let payload = serde_json::json!({
            "requestId": request.id,
            "approver": approver.email,
            "activationTime": activation.activation_time.to_rfc3339(),
        });
        self.dispatch(&NotificationEnvelope { kind: "ActivationApproved", payload }).await
    }

    async fn dispatch(&self, envelope: &NotificationEnvelope) -> CoreResult<()> {
        let sendable: Vec<&Arc<dyn NotificationSink>> = self.sinks.iter().filter(|s| s.can_send()).collect();
        if sendable.is_empty() {
            warn!(kind = envelope.kind, "no notification sink can deliver this event");
            return Err(CoreError::feature_not_available(format!(
                "no notification sink can deliver a {} event",
                envelope.kind
            )));
        }

        let results = join_all(sendable.iter().map(|sink| sink.send(envelope))).await;
        for result in results {
            result?;
        }
        Ok(())
    }
}
