// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::{AdminOnly, KeySetStatus},
    state::AppState,
};

/// Verification key cache as seen by the token verifier.
#[derive(Debug, Serialize, ToSchema)]
pub struct KeySetResponse {
    /// Issuer accepted by the verifier.
    pub issuer: String,
    pub status: KeySetStatus,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/keyset",
    tag = "Admin",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Key cache status", body = KeySetResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
    )
)]
pub async fn keyset_status(
    State(state): State<AppState>,
    AdminOnly(admin): AdminOnly,
) -> Json<KeySetResponse> {
    tracing::info!(user_id = %admin.id, "admin viewed key set status");
    Json(KeySetResponse {
        issuer: state.verifier.issuer().to_string(),
        status: state.verifier.key_set().status(),
    })
}
