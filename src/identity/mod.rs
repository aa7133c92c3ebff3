// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Provider
//!
//! User account flows (signup, login, password reset) are delegated to the
//! Cognito user pool. The API only forwards them and shapes the answers.
//!
//! | Operation | Cognito action |
//! |-----------|----------------|
//! | `sign_up` | `SignUp` |
//! | `confirm_sign_up` | `ConfirmSignUp` |
//! | `login` | `InitiateAuth` (`USER_PASSWORD_AUTH`) |
//! | `refresh` | `InitiateAuth` (`REFRESH_TOKEN_AUTH`) |
//! | `forgot_password` | `ForgotPassword` |
//! | `confirm_forgot_password` | `ConfirmForgotPassword` |

pub mod cognito;
pub mod secret_hash;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;

use crate::auth::TokenPair;

pub use cognito::CognitoClient;
pub use secret_hash::compute_secret_hash;

/// Identity provider errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("user email not verified")]
    UserNotConfirmed,
    #[error("password reset required")]
    PasswordResetRequired,
    #[error("invalid verification code")]
    InvalidVerification,
    /// Any other exception returned by the provider
    #[error("identity provider error {kind}: {message}")]
    Provider { kind: String, message: String },
    /// The provider could not be reached or answered garbage
    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Account operations backed by the user pool.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<(), IdentityError>;

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), IdentityError>;

    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError>;

    /// Exchange a refresh token. The provider does not rotate the refresh
    /// token, so the returned pair carries none.
    async fn refresh(&self, refresh_token: &str, email: &str) -> Result<TokenPair, IdentityError>;

    async fn forgot_password(&self, email: &str) -> Result<(), IdentityError>;

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), IdentityError>;
}
