// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service-to-service endpoints authenticated by request signatures.

use axum::{body::Bytes, Extension, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::ServiceIdentity;

#[derive(Debug, Serialize, ToSchema)]
pub struct EchoResponse {
    pub caller: ServiceIdentity,
    /// Request body as received, lossily decoded as UTF-8
    pub body: String,
}

/// Echo the verified caller and the signed body.
#[utoipa::path(
    post,
    path = "/api/v1/service/echo",
    tag = "Service",
    security(("sigv4" = [])),
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Signature verified", body = EchoResponse),
        (status = 401, description = "Missing, malformed, stale or invalid signature"),
    )
)]
pub async fn echo(Extension(caller): Extension<ServiceIdentity>, body: Bytes) -> Json<EchoResponse> {
    Json(EchoResponse {
        caller,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
