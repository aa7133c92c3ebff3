// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the authenticated user.
//!
//! These read the [`User`] that [`authenticate`](super::middleware::authenticate)
//! attached to the request; they never look at the token themselves.
//!
//! ```rust,ignore
//! async fn me(Auth(user): Auth) -> Json<User> {
//!     Json(user)
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::claims::User;
use super::error::AuthError;

/// Extractor for authenticated users.
///
/// Rejects with 401 `unauthorized` when no user is attached.
pub struct Auth(pub User);

impl<S: Send + Sync> FromRequestParts<S> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Extractor that requires an administrator.
pub struct AdminOnly(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin {
            warn!(user_id = %user.id, path = %parts.uri.path(), "admin access denied");
            return Err(AuthError::AdminRequired);
        }

        Ok(AdminOnly(user))
    }
}
