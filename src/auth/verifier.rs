// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token verification.
//!
//! ## Validation Order
//!
//! 1. Key set is fresh (refreshing through the cache if needed)
//! 2. Token parses and names a `kid`
//! 3. Signature verifies against the key for that `kid`
//! 4. `iss` equals the configured user pool issuer exactly
//! 5. `token_use` is `access`
//! 6. `exp` is in the future
//!
//! Every failure before step 6 is [`AuthError::InvalidToken`]; an expired but
//! otherwise valid token is [`AuthError::ExpiredToken`]. Neither the token nor
//! its claims are ever logged.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};
use tracing::debug;

use super::claims::{AccessTokenClaims, Claims};
use super::error::AuthError;
use super::jwks::{KeySetCache, VerificationKey};

/// Expected issuer for a Cognito user pool.
pub fn cognito_issuer(region: &str, user_pool_id: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/{user_pool_id}")
}

/// Validates Cognito access tokens against the pool's published keys.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: KeySetCache,
    issuer: String,
}

impl TokenVerifier {
    pub fn new(keys: KeySetCache, issuer: impl Into<String>) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The key set cache backing this verifier.
    pub fn key_set(&self) -> &KeySetCache {
        &self.keys
    }

    /// Validate an access token and extract its claims.
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let keys = self.keys.get().await?;

        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("malformed token: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".to_string()))?;

        let key = match keys.get(&kid) {
            Some(key) => key.clone(),
            None => {
                debug!(kid = %kid, "unknown signing key, refreshing key set");
                let refreshed = self.keys.refresh().await?;
                refreshed
                    .get(&kid)
                    .cloned()
                    .ok_or_else(|| AuthError::InvalidToken(format!("unknown signing key {kid}")))?
            }
        };

        let raw = self.verify_signature(token, &key)?;

        if raw.iss != self.issuer {
            return Err(AuthError::InvalidToken(format!(
                "unexpected issuer {}",
                raw.iss
            )));
        }

        if raw.token_use != "access" {
            return Err(AuthError::InvalidToken(format!(
                "token_use is {}",
                raw.token_use
            )));
        }

        if raw.exp <= chrono::Utc::now().timestamp() {
            return Err(AuthError::ExpiredToken);
        }

        Ok(Claims::from_access_token(raw))
    }

    /// Check the signature and decode the payload strictly.
    ///
    /// Issuer, use and expiry are checked by the caller so that each failure
    /// is reported in a fixed order.
    fn verify_signature(
        &self,
        token: &str,
        key: &VerificationKey,
    ) -> Result<AccessTokenClaims, AuthError> {
        let mut validation = Validation::new(key.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<AccessTokenClaims>(token, &key.key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::InvalidSignature => "signature mismatch".to_string(),
                    ErrorKind::InvalidAlgorithm => "algorithm does not match key".to_string(),
                    ErrorKind::Json(_) => format!("unexpected claim shape: {e}"),
                    _ => e.to_string(),
                };
                AuthError::InvalidToken(reason)
            })
    }
}
