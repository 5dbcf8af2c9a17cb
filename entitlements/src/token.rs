//! Token signer/verifier (component F).
//!
//! Encoding delegates the actual cryptographic signing to the `JwtSigner`
//! collaborator (a remote signer keyed by a service-account key, e.g. the
//! platform's own `signJwt` API) — the core never holds a private key.
//! Verification is done locally against the public key published at the
//! signing service account's JWKS URL. The token on the wire is obfuscated
//! (`.` -> `~`) to avoid casual inspection in query strings.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use core::{ActivationRequest, ActivationRequestKind, JwksProvider, JwtSigner, ProjectId, ProjectRoleBinding, UserId};
use errors::{CoreError, CoreResult};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Claims {
    beneficiary: String,
    reviewers: Vec<String>,
    justification: String,
    role: String,
    resource: String,
    start: i64,
    end: i64,
    jti: String,
    aud: String,
    iss: String,
    exp: i64,
}

fn claims_from_request(request: &ActivationRequest, service_account: &str, audience: &str) -> CoreResult<Claims> {
    if request.kind != ActivationRequestKind::Mpa {
        return Err(CoreError::invalid_argument("only MPA requests may be signed into an approval token"));
    }
    let entitlement = request
        .entitlements
        .iter()
        .next()
        .ok_or_else(|| CoreError::invalid_argument("MPA request has no entitlement"))?;

    Ok(Claims {
        beneficiary: request.requesting_user.email.clone(),
        reviewers: request.reviewers.iter().cloned().collect(),
        justification: request.justification.clone(),
        role: entitlement.role.clone(),
        resource: entitlement.project_id.resource().full_name(),
        start: request.start_time.timestamp(),
        end: request.end_time.timestamp(),
        jti: request.id.clone(),
        aud: audience.to_string(),
        iss: service_account.to_string(),
        exp: request.end_time.timestamp(),
    })
}

fn request_from_claims(claims: Claims) -> CoreResult<ActivationRequest> {
    let project_id = project_id_from_resource(&claims.resource)?;
    let mut entitlements = BTreeSet::new();
    entitlements.insert(ProjectRoleBinding::new(project_id, claims.role));

    Ok(ActivationRequest {
        id: claims.jti,
        kind: ActivationRequestKind::Mpa,
        requesting_user: UserId::new(claims.beneficiary.clone(), claims.beneficiary),
        entitlements,
        justification: claims.justification,
        start_time: Utc
            .timestamp_opt(claims.start, 0)
            .single()
            .ok_or_else(|| CoreError::invalid_token("bad start timestamp"))?,
        end_time: Utc
            .timestamp_opt(claims.end, 0)
            .single()
            .ok_or_else(|| CoreError::invalid_token("bad end timestamp"))?,
        reviewers: claims.reviewers.into_iter().collect(),
    })
}

pub struct TokenSigner {
    service_account: String,
    audience: String,
    signer: Arc<dyn JwtSigner>,
    jwks: Arc<dyn JwksProvider>,
}

impl TokenSigner {
    #[must_use]
    pub fn new(
        service_account: impl Into<String>,
        audience: impl Into<String>,
        signer: Arc<dyn JwtSigner>,
        jwks: Arc<dyn JwksProvider>,
    ) -> Self {
        Self { service_account: service_account.into(), audience: audience.into(), signer, jwks }
    }

    /// Encodes `request` (which must be a single-role MPA request) as a
    /// signed JWT via the remote signer. Returns `(obfuscated_token,
    /// issued_at, expires_at)`.
    pub async fn sign(&self, request: &ActivationRequest) -> CoreResult<(String, chrono::DateTime<Utc>, chrono::DateTime<Utc>)> {
        let claims = claims_from_request(request, &self.service_account, &self.audience)?;
        let payload = serde_json::to_string(&claims).map_err(|e| CoreError::invalid_argument(e.to_string()))?;
        let token = self.signer.sign(&self.service_account, &payload).await?;

        let issued_at = Utc::now();
        let expires_at = request.end_time;
        Ok((obfuscate(&token), issued_at, expires_at))
    }

    /// Verifies an obfuscated token against `expected_audience` and
    /// reconstructs the `ActivationRequest` it encodes.
    pub async fn verify(&self, expected_audience: &str, obfuscated_token: &str) -> CoreResult<ActivationRequest> {
        let token = deobfuscate(obfuscated_token);
        let header = jsonwebtoken::decode_header(&token).map_err(|e| CoreError::invalid_token(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(CoreError::invalid_token("only RS256 is accepted"));
        }
        let key_id = header.kid.as_deref();

        let jwks_url = self.signer.jwks_url_for(&self.service_account);
        let pem = self.jwks.fetch_pem(&jwks_url, key_id).await?;
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| CoreError::invalid_token(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[expected_audience]);

        let data = jsonwebtoken::decode::<Claims>(&token, &decoding_key, &validation)
            .map_err(|e| CoreError::invalid_token(e.to_string()))?;

        if data.claims.exp <= Utc::now().timestamp() {
            return Err(CoreError::invalid_token("token expired"));
        }

        request_from_claims(data.claims)
    }
}

fn project_id_from_resource(resource_full_name: &str) -> CoreResult<ProjectId> {
    resource_full_name
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(|id| ProjectId(id.to_string()))
        .ok_or_else(|| CoreError::invalid_token("malformed resource in token"))
}

fn obfuscate(token: &str) -> String {
    token.replace('.', "~")
}

fn deobfuscate(token: &str) -> String {
    token.replace('~', ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_request() -> ActivationRequest {
        let mut entitlements = BTreeSet::new();
        entitlements.insert(ProjectRoleBinding::new(ProjectId("project-1".into()), "roles/iam.admin"));
        let mut reviewers = BTreeSet::new();
        reviewers.insert("bob@example.com".to_string());
        let start = Utc::now();
        ActivationRequest {
            id: "mpa-abc123".into(),
            kind: ActivationRequestKind::Mpa,
            requesting_user: UserId::new("alice@example.com", "alice@example.com"),
            entitlements,
            justification: "ticket-9".into(),
            start_time: start,
            end_time: start + Duration::minutes(10),
            reviewers,
        }
    }

    #[test]
    fn obfuscation_round_trips() {
        let token = "header.payload.signature";
        let wire = obfuscate(token);
        assert_eq!(wire, "header~payload~signature");
        assert_eq!(deobfuscate(&wire), token);
    }

    #[test]
    fn obfuscation_is_idempotent_on_tokens_without_dots() {
        assert_eq!(obfuscate("nodots"), "nodots");
        assert_eq!(deobfuscate("nodots"), "nodots");
    }

    #[test]
    fn claims_round_trip_preserves_request_content() {
        let request = sample_request();
        let claims = claims_from_request(&request, "svc@project-1.iam.gserviceaccount.com", "https://activate.example.com").unwrap();
        assert_eq!(claims.beneficiary, "alice@example.com");
        assert_eq!(claims.role, "roles/iam.admin");
        assert_eq!(claims.jti, "mpa-abc123");

        let reconstructed = request_from_claims(claims).unwrap();
        assert_eq!(reconstructed.id, request.id);
        assert_eq!(reconstructed.requesting_user, request.requesting_user);
        assert_eq!(reconstructed.justification, request.justification);
        assert_eq!(reconstructed.entitlements, request.entitlements);
        assert_eq!(reconstructed.reviewers, request.reviewers);
    }

    #[test]
    fn claims_rejects_jit_requests() {
        let mut request = sample_request();
        request.kind = ActivationRequestKind::JitSelfApproval;
        let err = claims_from_request(&request, "svc@example.com", "aud").unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument { .. }));
    }
}
