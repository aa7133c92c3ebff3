// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.
//!
//! The `Display` text of each variant carries the full reason and is meant
//! for server-side logs. Clients only ever see [`AuthError::client_message`],
//! which collapses every token-validity reason into `invalid token` so the
//! response cannot be used as an oracle.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::signature::SignatureError;

/// Authentication error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("authorization header is missing")]
    MissingAuthHeader,
    /// Authorization header is not in the expected format
    #[error("authorization header is malformed")]
    InvalidAuthHeader,
    /// Token is malformed, badly signed, or has the wrong issuer or use
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Token has expired
    #[error("token has expired")]
    ExpiredToken,
    /// Verification keys could not be fetched and no valid cache exists
    #[error("key set unavailable: {0}")]
    KeySetUnavailable(String),
    /// No authenticated user on the request
    #[error("no authenticated user on request")]
    Unauthenticated,
    /// Signed request failed verification
    #[error("signed request rejected: {0}")]
    Signature(#[from] SignatureError),
    /// User lacks the required permission
    #[error("missing permission {0}")]
    InsufficientPermission(String),
    /// User holds none of the required roles
    #[error("missing any of roles [{0}]")]
    InsufficientRole(String),
    /// Endpoint requires an administrator
    #[error("admin access required")]
    AdminRequired,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    error_code: &'static str,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken(_)
            | AuthError::ExpiredToken
            | AuthError::KeySetUnavailable(_) => "invalid_token",
            AuthError::Signature(SignatureError::BodyTooLarge { .. }) => "payload_too_large",
            AuthError::Unauthenticated | AuthError::Signature(_) => "unauthorized",
            AuthError::InsufficientPermission(_) => "insufficient_permissions",
            AuthError::InsufficientRole(_) => "insufficient_role",
            AuthError::AdminRequired => "admin_required",
        }
    }

    /// Message returned to the client.
    pub fn client_message(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing authorization header",
            AuthError::InvalidAuthHeader => "invalid authorization header format",
            AuthError::InvalidToken(_)
            | AuthError::ExpiredToken
            | AuthError::KeySetUnavailable(_) => "invalid token",
            AuthError::Signature(SignatureError::BodyTooLarge { .. }) => "request body too large",
            AuthError::Unauthenticated | AuthError::Signature(_) => "unauthorized",
            AuthError::InsufficientPermission(_) => "insufficient permissions",
            AuthError::InsufficientRole(_) => "insufficient role",
            AuthError::AdminRequired => "admin access required",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InsufficientPermission(_)
            | AuthError::InsufficientRole(_)
            | AuthError::AdminRequired => StatusCode::FORBIDDEN,
            AuthError::Signature(SignatureError::BodyTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            error: self.client_message(),
            error_code: self.error_code(),
        });
        (self.status_code(), body).into_response()
    }
}
