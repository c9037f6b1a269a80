//! Session token issuance, verification and refresh (EdDSA JWTs).
//!
//! Tokens are signed with the private Ed25519 key; [`TokenVerifier`] only
//! needs the public key, so verification can run where the signing key is
//! never present. Expiry is checked against the injected [`Clock`] with no
//! leeway.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use super::AuthError;
use super::keys::TokenKeyPair;
use crate::clock::Clock;
use crate::models::auth::{SessionClaims, SessionIdentity};

/// Session token lifetime for web clients: 15 minutes.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 15 * 60;

/// A freshly minted token and the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: SessionClaims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims.expires_at()
    }

    /// Seconds between issuance and expiry.
    pub fn expires_in(&self) -> i64 {
        self.claims.exp - self.claims.iat
    }
}

/// Public-key-only token verification.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenVerifier {
    /// Build a verifier from an SPKI PEM public key.
    pub fn from_public_pem(pem: &str, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        let key = DecodingKey::from_ed_pem(pem.as_bytes())
            .map_err(|e| AuthError::Internal(format!("public key: {e}")))?;
        let mut validation = Validation::new(Algorithm::EdDSA);
        // Expiry is checked against the injected clock instead.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            key,
            validation,
            clock,
        })
    }

    /// Verify signature and expiry, returning the claims on success.
    ///
    /// Malformed, mis-signed and expired tokens all yield `None`.
    pub fn verify_token(&self, token: &str) -> Option<SessionClaims> {
        let claims = match decode::<SessionClaims>(token, &self.key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, "token rejected");
                return None;
            }
        };
        if self.clock.now().timestamp() >= claims.exp {
            debug!(sub = %claims.sub, "token expired");
            return None;
        }
        Some(claims)
    }
}

/// Mints, verifies and refreshes session tokens.
#[derive(Clone)]
pub struct TokenService {
    key: EncodingKey,
    verifier: TokenVerifier,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        keys: &TokenKeyPair,
        lifetime: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let key = EncodingKey::from_ed_pem(keys.private_pem.as_bytes())
            .map_err(|e| AuthError::Internal(format!("private key: {e}")))?;
        let verifier = TokenVerifier::from_public_pem(&keys.public_pem, clock.clone())?;
        Ok(Self {
            key,
            verifier,
            lifetime,
            clock,
        })
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Mint a token for `identity`, valid from now for the configured lifetime.
    pub fn generate_token(&self, identity: &SessionIdentity) -> Result<IssuedToken, AuthError> {
        let now = self.clock.now();
        self.mint(identity, now.timestamp(), (now + self.lifetime).timestamp())
    }

    pub fn verify_token(&self, token: &str) -> Option<SessionClaims> {
        self.verifier.verify_token(token)
    }

    /// Reissue a still-valid token with a fresh lifetime.
    ///
    /// Returns `Ok(None)` when the token is invalid or already expired.
    /// The new expiry is always strictly later than the old one.
    pub fn refresh_token(&self, token: &str) -> Result<Option<IssuedToken>, AuthError> {
        let Some(old) = self.verifier.verify_token(token) else {
            return Ok(None);
        };
        let now = self.clock.now();
        let exp = (now + self.lifetime).timestamp().max(old.exp + 1);
        self.mint(&old.identity(), now.timestamp(), exp).map(Some)
    }

    fn mint(
        &self,
        identity: &SessionIdentity,
        iat: i64,
        exp: i64,
    ) -> Result<IssuedToken, AuthError> {
        let claims = SessionClaims {
            sub: identity.sub.clone(),
            username: identity.username.clone(),
            tenant_id: identity.tenant_id.clone(),
            tenant_url: identity.tenant_url.clone(),
            app_uuid: identity.app_uuid.clone(),
            iat,
            exp,
        };
        let token = encode(&Header::new(Algorithm::EdDSA), &claims, &self.key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;
        Ok(IssuedToken { token, claims })
    }
}
