// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Cache Rules
//!
//! - Keys are served while `now < valid_until` (one hour after the fetch)
//! - An expired or empty cache triggers a refresh before anything is served
//! - A failed refresh falls back to the cached keys only if they are still
//!   unexpired; otherwise verification fails closed
//! - Concurrent callers share a single in-flight fetch
//!
//! The fetch runs in its own task. A request that gives up while waiting
//! does not cancel the fetch other waiters depend on. If that task dies
//! without an outcome, the in-flight slot is still released so the next
//! caller fetches again.
//!
//! Forced refreshes are spaced by [`MIN_REFRESH_INTERVAL`] from the last
//! fetch attempt, successful or not.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use super::error::AuthError;

/// How long fetched keys stay valid.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Upper bound on a single key set fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum time since the last fetch attempt before a forced refresh may
/// fetch again.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Source of the provider's published key set.
#[async_trait]
pub trait KeySetSource: Send + Sync + 'static {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpKeySetSource {
    url: String,
    client: reqwest::Client,
}

impl HttpKeySetSource {
    /// Create a fetcher for `url`
    /// (e.g. `https://cognito-idp.us-east-1.amazonaws.com/<pool>/.well-known/jwks.json`).
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl KeySetSource for HttpKeySetSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySetUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeySetUnavailable(e.to_string()))
    }
}

/// A verification key resolved from a JWK.
#[derive(Clone)]
pub struct VerificationKey {
    pub key: DecodingKey,
    pub algorithm: Algorithm,
}

/// Usable verification keys indexed by key ID.
#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, VerificationKey>,
}

impl KeySet {
    /// Convert a JWKS, skipping keys without a `kid` or of unsupported type.
    pub fn from_jwks(jwks: &JwkSet) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                debug!("skipping JWK without kid");
                continue;
            };
            match jwk_to_verification_key(jwk) {
                Ok(key) => {
                    keys.insert(kid, key);
                }
                Err(e) => warn!(kid = %kid, error = %e, "skipping unusable JWK"),
            }
        }
        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&VerificationKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Snapshot of the cache for health and admin endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KeySetStatus {
    /// Whether unexpired keys are cached.
    pub fresh: bool,
    /// Number of usable keys in the cache.
    pub key_count: usize,
    /// Seconds since the last successful fetch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<u64>,
    /// Seconds until the cached keys expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_seconds: Option<u64>,
}

struct CacheEntry {
    keys: Arc<KeySet>,
    fetched_at: Instant,
    valid_until: Instant,
}

type RefreshOutcome = Result<Arc<KeySet>, AuthError>;
type OutcomeReceiver = watch::Receiver<Option<RefreshOutcome>>;

struct Inner {
    source: Arc<dyn KeySetSource>,
    entry: RwLock<Option<CacheEntry>>,
    in_flight: Mutex<Option<OutcomeReceiver>>,
    last_attempt: Mutex<Option<Instant>>,
}

/// Releases the in-flight slot when the refresh task finishes or unwinds.
struct InFlightGuard {
    inner: Arc<Inner>,
    rx: OutcomeReceiver,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|rx| rx.same_channel(&self.rx)) {
            slot.take();
        }
    }
}

/// Process-wide cache of the identity provider's verification keys.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct KeySetCache {
    inner: Arc<Inner>,
    ttl: Duration,
}

impl KeySetCache {
    pub fn new(source: Arc<dyn KeySetSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                entry: RwLock::new(None),
                in_flight: Mutex::new(None),
                last_attempt: Mutex::new(None),
            }),
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Cache backed by an HTTPS fetcher for `jwks_url`.
    pub fn from_url(jwks_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Arc::new(HttpKeySetSource::new(jwks_url)?)))
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Current keys, refreshing first if the cache is empty or expired.
    pub async fn get(&self) -> Result<Arc<KeySet>, AuthError> {
        if let Some(keys) = self.inner.fresh_keys() {
            return Ok(keys);
        }
        self.refresh_shared(false).await
    }

    /// Refetch now, e.g. after a key lookup missed or ahead of expiry.
    ///
    /// Returns the unexpired cached keys without fetching if the last fetch
    /// attempt was less than [`MIN_REFRESH_INTERVAL`] ago.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, AuthError> {
        self.refresh_shared(true).await
    }

    /// Warm the cache, e.g. at startup.
    pub async fn prime(&self) -> Result<usize, AuthError> {
        Ok(self.get().await?.len())
    }

    /// Check if unexpired keys are cached.
    pub fn is_fresh(&self) -> bool {
        self.inner.fresh_keys().is_some()
    }

    pub fn status(&self) -> KeySetStatus {
        let entry = self.inner.entry.read().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match entry.as_ref() {
            Some(entry) => KeySetStatus {
                fresh: now < entry.valid_until,
                key_count: entry.keys.len(),
                age_seconds: Some(now.saturating_duration_since(entry.fetched_at).as_secs()),
                expires_in_seconds: Some(entry.valid_until.saturating_duration_since(now).as_secs()),
            },
            None => KeySetStatus {
                fresh: false,
                key_count: 0,
                age_seconds: None,
                expires_in_seconds: None,
            },
        }
    }

    async fn refresh_shared(&self, forced: bool) -> Result<Arc<KeySet>, AuthError> {
        let mut rx = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            // Re-check under the slot lock: a refresh may have just landed.
            let cached = if forced {
                self.inner.throttled_keys()
            } else {
                self.inner.fresh_keys()
            };
            if let Some(keys) = cached {
                return Ok(keys);
            }

            match slot.as_ref() {
                Some(rx) => rx.clone(),
                None => {
                    let rx = self.spawn_refresh();
                    *slot = Some(rx.clone());
                    rx
                }
            }
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| {
            Err(AuthError::KeySetUnavailable(
                "key set refresh ended without a result".to_string(),
            ))
        })
    }

    fn spawn_refresh(&self) -> OutcomeReceiver {
        let (tx, rx) = watch::channel(None);
        let guard = InFlightGuard {
            inner: Arc::clone(&self.inner),
            rx: rx.clone(),
        };
        let ttl = self.ttl;
        tokio::spawn(async move {
            let outcome = guard.inner.run_refresh(ttl).await;
            drop(guard);
            tx.send_replace(Some(outcome));
        });
        rx
    }
}

impl Inner {
    fn fresh_keys(&self) -> Option<Arc<KeySet>> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|entry| Instant::now() < entry.valid_until)
            .map(|entry| Arc::clone(&entry.keys))
    }

    /// Unexpired keys, if a fetch was attempted too recently to force another.
    fn throttled_keys(&self) -> Option<Arc<KeySet>> {
        let last_attempt = *self
            .last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let recent = last_attempt.is_some_and(|at| {
            Instant::now().saturating_duration_since(at) < MIN_REFRESH_INTERVAL
        });
        if recent {
            self.fresh_keys()
        } else {
            None
        }
    }

    async fn run_refresh(&self, ttl: Duration) -> RefreshOutcome {
        *self
            .last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        let fetched = match tokio::time::timeout(FETCH_TIMEOUT, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::KeySetUnavailable(format!(
                "fetch timed out after {}s",
                FETCH_TIMEOUT.as_secs()
            ))),
        };

        match fetched {
            Ok(jwks) => {
                let keys = Arc::new(KeySet::from_jwks(&jwks));
                let fetched_at = Instant::now();
                *self.entry.write().unwrap_or_else(PoisonError::into_inner) = Some(CacheEntry {
                    keys: Arc::clone(&keys),
                    fetched_at,
                    valid_until: fetched_at + ttl,
                });
                info!(key_count = keys.len(), "JWKS cache refreshed");
                Ok(keys)
            }
            Err(e) => match self.fresh_keys() {
                Some(keys) => {
                    warn!(error = %e, "JWKS refresh failed, serving unexpired cache");
                    Ok(keys)
                }
                None => {
                    warn!(error = %e, "JWKS refresh failed with no valid cache");
                    Err(match e {
                        AuthError::KeySetUnavailable(_) => e,
                        other => AuthError::KeySetUnavailable(other.to_string()),
                    })
                }
            },
        }
    }
}

/// Convert a JWK to a verification key.
fn jwk_to_verification_key(jwk: &Jwk) -> Result<VerificationKey, AuthError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::InvalidToken(format!("bad RSA key: {e}")))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::RS256) | None => Algorithm::RS256,
                Some(other) => {
                    return Err(AuthError::InvalidToken(format!(
                        "unsupported RSA algorithm {other:?}"
                    )))
                }
            };

            Ok(VerificationKey { key, algorithm })
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::InvalidToken(format!("bad EC key: {e}")))?;

            let algorithm = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                Some(KeyAlgorithm::ES256) | None => Algorithm::ES256,
                Some(other) => {
                    return Err(AuthError::InvalidToken(format!(
                        "unsupported EC algorithm {other:?}"
                    )))
                }
            };

            Ok(VerificationKey { key, algorithm })
        }
        _ => Err(AuthError::InvalidToken(
            "unsupported key type in JWKS".to_string(),
        )),
    }
}
