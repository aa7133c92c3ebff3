// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared-secret request signing for service-to-service calls.
//!
//! Callers sign a canonical form of the request with a key derived from a
//! long-lived secret, in the style of AWS Signature Version 4:
//!
//! ```text
//! Authorization: AWS4-HMAC-SHA256 Credential=<key id>/<yyyymmdd>/<region>/<service>/aws4_request,
//!                SignedHeaders=host;x-amz-date, Signature=<hex>
//! X-Amz-Date: 20260101T120000Z
//! ```
//!
//! ## Canonical Request
//!
//! ```text
//! <METHOD>\n<path>\n<sorted query>\n<name:value\n per signed header>\n<signed names>\n<hex sha256(body)>
//! ```
//!
//! The signing key is `HMAC("AWS4" + secret, date)`, then chained over the
//! region, the service and the literal `aws4_request`. The signature is the
//! hex HMAC of the canonical request under that key.
//!
//! ## Replay Window
//!
//! A request is accepted while its `X-Amz-Date` is within
//! [`MAX_CLOCK_SKEW`] of the server clock in either direction. There is no
//! nonce tracking: a captured request can be replayed verbatim until its
//! timestamp leaves the window.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{OriginalUri, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use http_body_util::LengthLimitError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm tag that prefixes the authorization header.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Header carrying the request timestamp.
pub const DATE_HEADER: &str = "x-amz-date";

/// `X-Amz-Date` format, e.g. `20260101T120000Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Maximum distance between the request timestamp and the server clock.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(15 * 60);

/// Largest body that will be buffered for hashing.
pub const MAX_SIGNED_BODY_BYTES: usize = 10 * 1024 * 1024;

const SCOPE_TERMINATOR: &str = "aws4_request";

/// Reasons a well-formed signed request is rejected.
///
/// Missing or malformed authorization headers are reported as
/// [`AuthError::MissingAuthHeader`] / [`AuthError::InvalidAuthHeader`] instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing X-Amz-Date header")]
    MissingTimestamp,
    #[error("invalid X-Amz-Date {0:?}")]
    InvalidTimestamp(String),
    #[error("request timestamp is {age_secs}s old")]
    Expired { age_secs: i64 },
    #[error("request timestamp is {skew_secs}s in the future")]
    FromFuture { skew_secs: i64 },
    #[error("credential scope mismatch: {0}")]
    ScopeMismatch(String),
    #[error("unknown access key {0}")]
    UnknownAccessKey(String),
    #[error("signed header {0} is not present")]
    MissingSignedHeader(String),
    #[error("signature does not match")]
    SignatureMismatch,
    #[error("request body unreadable: {0}")]
    UnreadableBody(String),
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

/// `<date>/<region>/<service>/aws4_request`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CredentialScope {
    pub date: String,
    pub region: String,
    pub service: String,
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{SCOPE_TERMINATOR}",
            self.date, self.region, self.service
        )
    }
}

/// Parsed `Authorization` header of a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAuthorization {
    pub access_key_id: String,
    pub scope: CredentialScope,
    /// Lower-cased and sorted.
    pub signed_headers: Vec<String>,
    pub signature: String,
}

impl SignedAuthorization {
    /// Parse `AWS4-HMAC-SHA256 Credential=..., SignedHeaders=..., Signature=...`.
    pub fn parse(header: &str) -> Result<Self, AuthError> {
        let rest = header
            .strip_prefix(ALGORITHM)
            .and_then(|rest| rest.strip_prefix(' '))
            .ok_or(AuthError::InvalidAuthHeader)?;

        let mut credential = None;
        let mut signed_headers = None;
        let mut signature = None;
        for part in rest.split(',').map(str::trim) {
            if let Some(value) = part.strip_prefix("Credential=") {
                credential = Some(value);
            } else if let Some(value) = part.strip_prefix("SignedHeaders=") {
                signed_headers = Some(value);
            } else if let Some(value) = part.strip_prefix("Signature=") {
                signature = Some(value);
            }
        }

        let (Some(credential), Some(signed_headers), Some(signature)) =
            (credential, signed_headers, signature)
        else {
            return Err(AuthError::InvalidAuthHeader);
        };

        let segments: Vec<&str> = credential.split('/').collect();
        let [access_key_id, date, region, service, terminator] = segments.as_slice() else {
            return Err(AuthError::InvalidAuthHeader);
        };
        if *terminator != SCOPE_TERMINATOR
            || [access_key_id, date, region, service]
                .iter()
                .any(|segment| segment.is_empty())
        {
            return Err(AuthError::InvalidAuthHeader);
        }

        let mut names: Vec<String> = signed_headers
            .split(';')
            .map(|name| name.trim().to_ascii_lowercase())
            .collect();
        if names.iter().any(String::is_empty) {
            return Err(AuthError::InvalidAuthHeader);
        }
        names.sort();
        names.dedup();

        if signature.len() != 64 || !signature.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AuthError::InvalidAuthHeader);
        }

        Ok(Self {
            access_key_id: access_key_id.to_string(),
            scope: CredentialScope {
                date: date.to_string(),
                region: region.to_string(),
                service: service.to_string(),
            },
            signed_headers: names,
            signature: signature.to_ascii_lowercase(),
        })
    }
}

/// Hex SHA-256 of the request payload.
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Sort the `&`-separated pairs of a raw query string.
fn canonical_query(query: Option<&str>) -> String {
    let mut pairs: Vec<&str> = query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .collect();
    pairs.sort_unstable();
    pairs.join("&")
}

/// Build the canonical request string that gets signed.
///
/// `signed_headers` must already be lower-cased and sorted. Repeated headers
/// are joined with `,`.
pub fn canonical_request(
    method: &str,
    path: &str,
    query: Option<&str>,
    headers: &HeaderMap,
    signed_headers: &[String],
    payload_hash: &str,
) -> Result<String, SignatureError> {
    let mut canonical_headers = String::new();
    for name in signed_headers {
        let values: Vec<&str> = headers
            .get_all(name.as_str())
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::trim)
            .collect();
        if values.is_empty() {
            return Err(SignatureError::MissingSignedHeader(name.clone()));
        }
        canonical_headers.push_str(name);
        canonical_headers.push(':');
        canonical_headers.push_str(&values.join(","));
        canonical_headers.push('\n');
    }

    Ok(format!(
        "{method}\n{path}\n{}\n{canonical_headers}\n{}\n{payload_hash}",
        canonical_query(query),
        signed_headers.join(";"),
    ))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key for a credential scope.
pub fn signing_key(secret: &str, scope: &CredentialScope) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), scope.date.as_bytes());
    let k_region = hmac_sha256(&k_date, scope.region.as_bytes());
    let k_service = hmac_sha256(&k_region, scope.service.as_bytes());
    hmac_sha256(&k_service, SCOPE_TERMINATOR.as_bytes())
}

/// Hex signature of `canonical_request` under `signing_key`.
pub fn sign(signing_key: &[u8], canonical_request: &str) -> String {
    hex::encode(hmac_sha256(signing_key, canonical_request.as_bytes()))
}

/// Access key id → shared secret.
#[derive(Clone, Default)]
pub struct CredentialStore {
    secrets: HashMap<String, String>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(
        mut self,
        access_key_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.insert(access_key_id, secret);
        self
    }

    pub fn insert(&mut self, access_key_id: impl Into<String>, secret: impl Into<String>) {
        self.secrets.insert(access_key_id.into(), secret.into());
    }

    fn secret(&self, access_key_id: &str) -> Option<&str> {
        self.secrets.get(access_key_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

// Never print secrets.
impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.secrets.keys().collect();
        ids.sort();
        f.debug_struct("CredentialStore")
            .field("access_key_ids", &ids)
            .finish()
    }
}

/// Caller verified by a request signature, attached as a request extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ServiceIdentity {
    pub access_key_id: String,
    pub scope: CredentialScope,
}

/// Verifies signed requests against a credential store.
#[derive(Debug, Clone)]
pub struct SignatureAuthenticator {
    credentials: CredentialStore,
    region: String,
    service: String,
    max_skew: Duration,
}

impl SignatureAuthenticator {
    pub fn new(
        credentials: CredentialStore,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
            max_skew: MAX_CLOCK_SKEW,
        }
    }

    pub fn with_max_skew(mut self, max_skew: Duration) -> Self {
        self.max_skew = max_skew;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Verify a buffered request as of `now`.
    ///
    /// The path is taken from [`OriginalUri`] when present, so a signature
    /// covers the full path even under a nested router.
    pub fn authenticate(
        &self,
        parts: &Parts,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ServiceIdentity, AuthError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;
        let auth = SignedAuthorization::parse(header)?;

        let raw_date = parts
            .headers
            .get(DATE_HEADER)
            .ok_or(SignatureError::MissingTimestamp)?
            .to_str()
            .map_err(|_| SignatureError::InvalidTimestamp("non-ascii".to_string()))?;
        let timestamp = NaiveDateTime::parse_from_str(raw_date, TIMESTAMP_FORMAT)
            .map_err(|_| SignatureError::InvalidTimestamp(raw_date.to_string()))?
            .and_utc();

        let max_skew = self.max_skew.as_secs() as i64;
        let age_secs = (now - timestamp).num_seconds();
        if age_secs > max_skew {
            return Err(SignatureError::Expired { age_secs }.into());
        }
        if -age_secs > max_skew {
            return Err(SignatureError::FromFuture {
                skew_secs: -age_secs,
            }
            .into());
        }

        self.check_scope(&auth.scope, &timestamp)?;

        let secret = self
            .credentials
            .secret(&auth.access_key_id)
            .ok_or_else(|| SignatureError::UnknownAccessKey(auth.access_key_id.clone()))?;

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let canonical = canonical_request(
            parts.method.as_str(),
            uri.path(),
            uri.query(),
            &parts.headers,
            &auth.signed_headers,
            &hash_payload(body),
        )?;

        let provided = hex::decode(&auth.signature).map_err(|_| AuthError::InvalidAuthHeader)?;
        let mut mac = HmacSha256::new_from_slice(&signing_key(secret, &auth.scope))
            .expect("HMAC can take key of any size");
        mac.update(canonical.as_bytes());
        mac.verify_slice(&provided)
            .map_err(|_| SignatureError::SignatureMismatch)?;

        let signature_prefix = &auth.signature[..16];
        info!(
            access_key_id = %auth.access_key_id,
            scope = %auth.scope,
            signature_prefix = %signature_prefix,
            path = %uri.path(),
            "signed request authenticated"
        );

        Ok(ServiceIdentity {
            access_key_id: auth.access_key_id,
            scope: auth.scope,
        })
    }

    fn check_scope(
        &self,
        scope: &CredentialScope,
        timestamp: &DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let date = timestamp.format("%Y%m%d").to_string();
        if scope.date != date {
            return Err(SignatureError::ScopeMismatch(format!(
                "scope date {} does not match timestamp date {date}",
                scope.date
            )));
        }
        if scope.region != self.region {
            return Err(SignatureError::ScopeMismatch(format!(
                "region {}",
                scope.region
            )));
        }
        if scope.service != self.service {
            return Err(SignatureError::ScopeMismatch(format!(
                "service {}",
                scope.service
            )));
        }
        Ok(())
    }
}

/// Middleware that verifies a signed request.
///
/// The body is buffered for hashing and handed on intact, and the verified
/// [`ServiceIdentity`] is inserted into the request extensions.
///
/// ```rust,ignore
/// Router::new()
///     .route("/echo", post(echo))
///     .layer(middleware::from_fn_with_state(authenticator, require_signature));
/// ```
pub async fn require_signature(
    State(authenticator): State<Arc<SignatureAuthenticator>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let (mut parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let bytes = to_bytes(body, MAX_SIGNED_BODY_BYTES)
        .await
        .map_err(body_error)
        .inspect_err(|e| warn!(path = %path, error = %e, "signed request body rejected"))?;

    let identity = authenticator
        .authenticate(&parts, &bytes, Utc::now())
        .inspect_err(|e| warn!(path = %path, error = %e, "signed request rejected"))?;

    parts.extensions.insert(identity);
    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

fn body_error(error: axum::Error) -> SignatureError {
    let reason = error.to_string();
    let inner = error.into_inner();
    let over_limit = std::iter::successors(
        Some(&*inner as &(dyn std::error::Error + 'static)),
        |e| e.source(),
    )
    .any(|e| e.is::<LengthLimitError>());

    if over_limit {
        SignatureError::BodyTooLarge {
            limit: MAX_SIGNED_BODY_BYTES,
        }
    } else {
        SignatureError::UnreadableBody(reason)
    }
}
