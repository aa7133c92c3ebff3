// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, User};

/// Response for GET /api/v1/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Cognito subject
    pub user_id: String,
    pub email: String,
    pub username: String,
    /// Cognito groups, sorted
    pub roles: Vec<String>,
    pub is_admin: bool,
}

impl From<User> for UserMeResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            username: user.username,
            roles: user.roles.into_iter().collect(),
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PingResponse {
    pub message: String,
    pub user_id: String,
}

/// Get the current authenticated user's information.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(user): Auth) -> Json<UserMeResponse> {
    Json(user.into())
}

/// Reachable by editors and admins.
#[utoipa::path(
    get,
    path = "/api/v1/editor/ping",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller holds the editor or admin role", body = PingResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Missing role"),
    )
)]
pub async fn editor_ping(Auth(user): Auth) -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".to_string(),
        user_id: user.id,
    })
}
