// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Router-level helpers for handler tests.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;

use super::router;
use crate::auth::signature::{
    canonical_request, hash_payload, sign, signing_key, CredentialScope, ALGORITHM, DATE_HEADER,
    TIMESTAMP_FORMAT,
};
use crate::auth::testing::{access_token, test_jwks, verifier_with, CountingKeySource};
use crate::auth::{CredentialStore, SignatureAuthenticator};
use crate::identity::testing::StubIdentityProvider;
use crate::state::AppState;

pub const SERVICE_KEY_ID: &str = "AKIDSERVICE";
pub const SERVICE_SECRET: &str = "service-shared-secret";
pub const SIGNING_REGION: &str = "us-east-1";
pub const SIGNING_SERVICE: &str = "execute-api";

pub fn app_state_with_keys(source: Arc<CountingKeySource>) -> AppState {
    let signer = SignatureAuthenticator::new(
        CredentialStore::new().with_credential(SERVICE_KEY_ID, SERVICE_SECRET),
        SIGNING_REGION,
        SIGNING_SERVICE,
    );
    AppState::new(
        verifier_with(source),
        Arc::new(StubIdentityProvider),
        signer,
    )
}

pub fn app_state() -> AppState {
    app_state_with_keys(Arc::new(CountingKeySource::new(test_jwks())))
}

/// `Bearer <token>` for a user in `groups`.
pub fn bearer(groups: &[&str]) -> String {
    format!("Bearer {}", access_token("user_123", groups))
}

pub async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub async fn get_json(
    state: AppState,
    uri: &str,
    authorization: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    send(state, builder.body(Body::empty()).unwrap()).await
}

pub async fn call_json(
    state: AppState,
    method: Method,
    uri: &str,
    body: &Value,
    authorization: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    send(state, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn post_json(state: AppState, uri: &str, body: &Value) -> (StatusCode, Value) {
    call_json(state, Method::POST, uri, body, None).await
}

/// A POST to `uri` signed with `secret` as of `at`.
pub fn signed_post(uri: &str, body: &str, secret: &str, at: DateTime<Utc>) -> Request<Body> {
    let timestamp = at.format(TIMESTAMP_FORMAT).to_string();
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::HOST, "api.example.com")
        .header(header::CONTENT_TYPE, "application/json")
        .header(DATE_HEADER, &timestamp)
        .body(Body::from(body.to_string()))
        .unwrap();

    let scope = CredentialScope {
        date: at.format("%Y%m%d").to_string(),
        region: SIGNING_REGION.to_string(),
        service: SIGNING_SERVICE.to_string(),
    };
    let signed = vec!["host".to_string(), DATE_HEADER.to_string()];
    let canonical = canonical_request(
        "POST",
        request.uri().path(),
        request.uri().query(),
        request.headers(),
        &signed,
        &hash_payload(body.as_bytes()),
    )
    .unwrap();
    let signature = sign(&signing_key(secret, &scope), &canonical);

    let authorization = format!(
        "{ALGORITHM} Credential={SERVICE_KEY_ID}/{scope}, SignedHeaders=host;x-amz-date, Signature={signature}"
    );
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, authorization.parse().unwrap());
    request
}
