// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints forwarded to the identity provider.
//!
//! Every handler validates its body first and answers 400 with the list of
//! problems before calling out.

use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, warn};

use crate::{
    error::{ApiError, Problems},
    identity::IdentityError,
    models::{
        ConfirmSignupRequest, ForgotPasswordRequest, LoginRequest, MessageResponse,
        RefreshRequest, ResetPasswordRequest, SignupRequest, SignupResponse, TokenResponse,
    },
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

fn require(problems: &mut Problems, field: &'static str, value: &str, message: &'static str) {
    if value.trim().is_empty() {
        problems.insert(field, message);
    }
}

fn check_password(
    problems: &mut Problems,
    field: &'static str,
    value: &str,
    missing: &'static str,
) {
    if value.is_empty() {
        problems.insert(field, missing);
    } else if value.chars().count() < MIN_PASSWORD_LEN {
        problems.insert(field, "password must be at least 8 characters");
    }
}

fn finish(problems: Problems) -> Result<(), ApiError> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(problems))
    }
}

impl SignupRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut problems = Problems::new();
        require(&mut problems, "email", &self.email, "email is required");
        check_password(&mut problems, "password", &self.password, "password is required");
        finish(problems)
    }
}

impl ConfirmSignupRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut problems = Problems::new();
        require(&mut problems, "email", &self.email, "email is required");
        require(&mut problems, "code", &self.code, "verification code is required");
        finish(problems)
    }
}

impl LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut problems = Problems::new();
        require(&mut problems, "email", &self.email, "email is required");
        if self.password.is_empty() {
            problems.insert("password", "password is required");
        }
        finish(problems)
    }
}

impl RefreshRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut problems = Problems::new();
        require(
            &mut problems,
            "refresh_token",
            &self.refresh_token,
            "refresh token is required",
        );
        require(&mut problems, "email", &self.email, "email is required");
        finish(problems)
    }
}

impl ForgotPasswordRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut problems = Problems::new();
        require(&mut problems, "email", &self.email, "email is required");
        finish(problems)
    }
}

impl ResetPasswordRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut problems = Problems::new();
        require(&mut problems, "email", &self.email, "email is required");
        require(&mut problems, "code", &self.code, "verification code is required");
        check_password(
            &mut problems,
            "new_password",
            &self.new_password,
            "new password is required",
        );
        finish(problems)
    }
}

/// Register a new account. Cognito emails a verification code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered", body = SignupResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "User already exists"),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    request.validate()?;

    state
        .identity
        .sign_up(&request.email, &request.password, request.name.as_deref())
        .await
        .inspect_err(|e| warn!(email = %request.email, error = %e, "signup failed"))?;

    info!(email = %request.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User registered successfully. Please check your email for verification code."
                .to_string(),
            email: request.email,
        }),
    ))
}

/// Confirm an account with the emailed code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/confirm",
    tag = "Auth",
    request_body = ConfirmSignupRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Validation failed or invalid code"),
    )
)]
pub async fn confirm(
    State(state): State<AppState>,
    Json(request): Json<ConfirmSignupRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    state
        .identity
        .confirm_sign_up(&request.email, &request.code)
        .await
        .inspect_err(|e| warn!(email = %request.email, error = %e, "confirmation failed"))?;

    info!(email = %request.email, "email verified");
    Ok(Json(MessageResponse::new(
        "Email verified successfully. You can now login.",
    )))
}

/// Exchange email and password for tokens.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid credentials or unverified email"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    request.validate()?;

    let tokens = state
        .identity
        .login(&request.email, &request.password)
        .await
        .inspect_err(|e| warn!(email = %request.email, error = %e, "login failed"))?;

    info!(email = %request.email, "user logged in");
    Ok(Json(TokenResponse {
        message: "Login successful".to_string(),
        tokens,
    }))
}

/// Exchange a refresh token for new access and ID tokens.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = TokenResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid refresh token"),
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    request.validate()?;

    let tokens = state
        .identity
        .refresh(&request.refresh_token, &request.email)
        .await
        .map_err(|e| {
            warn!(email = %request.email, error = %e, "token refresh failed");
            ApiError::unauthorized("invalid refresh token")
        })?;

    Ok(Json(TokenResponse {
        message: "Tokens refreshed successfully".to_string(),
        tokens,
    }))
}

/// Start a password reset.
///
/// Answers the same whether or not the account exists.
#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code sent if the account exists", body = MessageResponse),
        (status = 400, description = "Validation failed"),
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    if let Err(e) = state.identity.forgot_password(&request.email).await {
        warn!(email = %request.email, error = %e, "forgot password failed");
    }

    Ok(Json(MessageResponse::new(
        "If the email exists, a password reset code has been sent.",
    )))
}

/// Set a new password with the emailed reset code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Validation failed or invalid code"),
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    state
        .identity
        .confirm_forgot_password(&request.email, &request.code, &request.new_password)
        .await
        .map_err(|e| match e {
            IdentityError::InvalidVerification => {
                ApiError::bad_request("invalid or expired verification code")
            }
            other => {
                warn!(email = %request.email, error = %other, "password reset failed");
                ApiError::from(other)
            }
        })?;

    info!(email = %request.email, "password reset");
    Ok(Json(MessageResponse::new(
        "Password reset successfully. You can now login with your new password.",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{app_state, post_json};
    use crate::identity::testing::{
        BAD_CODE, GOOD_PASSWORD, GOOD_REFRESH_TOKEN, TAKEN_EMAIL, UNCONFIRMED_EMAIL, UNKNOWN_EMAIL,
    };
    use serde_json::json;

    #[tokio::test]
    async fn signup_created() {
        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/signup",
            &json!({"email": "new@example.com", "password": "long-enough", "name": "New"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "new@example.com");
        assert_eq!(
            body["message"],
            "User registered successfully. Please check your email for verification code."
        );
    }

    #[tokio::test]
    async fn signup_lists_every_problem() {
        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/signup",
            &json!({"email": "", "password": "short"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "error": "validation failed",
                "problems": {
                    "email": "email is required",
                    "password": "password must be at least 8 characters"
                }
            })
        );
    }

    #[tokio::test]
    async fn signup_conflict_for_existing_user() {
        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/signup",
            &json!({"email": TAKEN_EMAIL, "password": "long-enough"}),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "user already exists");
    }

    #[tokio::test]
    async fn confirm_flows() {
        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/confirm",
            &json!({"email": "new@example.com", "code": "123456"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Email verified successfully. You can now login.");

        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/confirm",
            &json!({"email": "new@example.com", "code": BAD_CODE}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid or expired verification code");

        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/confirm",
            &json!({"email": "new@example.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["problems"]["code"], "verification code is required");
    }

    #[tokio::test]
    async fn login_returns_tokens() {
        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/login",
            &json!({"email": "jdoe@example.com", "password": GOOD_PASSWORD}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["tokens"]["access_token"], "stub-access");
        assert_eq!(body["tokens"]["refresh_token"], "stub-refresh");
    }

    #[tokio::test]
    async fn login_failures_are_unauthorized() {
        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/login",
            &json!({"email": "jdoe@example.com", "password": "wrong-password"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid email or password");

        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/login",
            &json!({"email": UNCONFIRMED_EMAIL, "password": GOOD_PASSWORD}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body["error"],
            "email not verified. Please check your email for verification code."
        );
    }

    #[tokio::test]
    async fn refresh_flows() {
        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/refresh",
            &json!({"refresh_token": GOOD_REFRESH_TOKEN, "email": "jdoe@example.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Tokens refreshed successfully");
        assert!(body["tokens"].get("refresh_token").is_none());

        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/refresh",
            &json!({"refresh_token": "revoked", "email": "jdoe@example.com"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid refresh token");
    }

    #[tokio::test]
    async fn forgot_password_does_not_reveal_accounts() {
        for email in ["jdoe@example.com", UNKNOWN_EMAIL] {
            let (status, body) = post_json(
                app_state(),
                "/api/v1/auth/forgot-password",
                &json!({ "email": email }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(
                body["message"],
                "If the email exists, a password reset code has been sent."
            );
        }
    }

    #[tokio::test]
    async fn reset_password_flows() {
        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/reset-password",
            &json!({"email": "jdoe@example.com", "code": "123456", "new_password": "brand-new-pass"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["message"],
            "Password reset successfully. You can now login with your new password."
        );

        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/reset-password",
            &json!({"email": "jdoe@example.com", "code": BAD_CODE, "new_password": "brand-new-pass"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid or expired verification code");

        let (status, body) = post_json(
            app_state(),
            "/api/v1/auth/reset-password",
            &json!({"email": "jdoe@example.com", "code": "123456", "new_password": "short"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["problems"]["new_password"],
            "password must be at least 8 characters"
        );
    }
}
