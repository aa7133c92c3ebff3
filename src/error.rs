// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::identity::IdentityError;

/// Field name to problem description.
pub type Problems = BTreeMap<&'static str, &'static str>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub problems: Option<Problems>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    problems: Option<Problems>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            problems: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    /// 400 listing every invalid field.
    pub fn validation(problems: Problems) -> Self {
        Self {
            problems: Some(problems),
            ..Self::bad_request("validation failed")
        }
    }
}

/// Default mapping for provider failures. Handlers override the messages
/// where a flow needs its own wording.
impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::UserAlreadyExists => Self::conflict("user already exists"),
            IdentityError::InvalidCredentials => Self::unauthorized("invalid email or password"),
            IdentityError::UserNotConfirmed => Self::unauthorized(
                "email not verified. Please check your email for verification code.",
            ),
            IdentityError::PasswordResetRequired => Self::unauthorized("password reset required"),
            IdentityError::InvalidVerification => {
                Self::bad_request("invalid or expired verification code")
            }
            IdentityError::Provider { kind, message } => {
                tracing::error!(kind = %kind, message = %message, "Identity provider error");
                Self::internal()
            }
            IdentityError::Transport(reason) => {
                tracing::error!(reason = %reason, "Identity provider unreachable");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            problems: self.problems,
        });
        (self.status, body).into_response()
    }
}
