// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Scripted identity provider for handler tests.

use async_trait::async_trait;

use super::{IdentityError, IdentityProvider};
use crate::auth::TokenPair;

pub const TAKEN_EMAIL: &str = "taken@example.com";
pub const UNCONFIRMED_EMAIL: &str = "unconfirmed@example.com";
pub const UNKNOWN_EMAIL: &str = "unknown@example.com";
pub const GOOD_PASSWORD: &str = "correct-password";
pub const BAD_CODE: &str = "000000";
pub const GOOD_REFRESH_TOKEN: &str = "valid-refresh";

pub struct StubIdentityProvider;

fn tokens(with_refresh: bool) -> TokenPair {
    TokenPair {
        access_token: "stub-access".to_string(),
        id_token: Some("stub-id".to_string()),
        refresh_token: with_refresh.then(|| "stub-refresh".to_string()),
        expires_in: 3600,
        token_type: "Bearer".to_string(),
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _name: Option<&str>,
    ) -> Result<(), IdentityError> {
        if email == TAKEN_EMAIL {
            return Err(IdentityError::UserAlreadyExists);
        }
        Ok(())
    }

    async fn confirm_sign_up(&self, _email: &str, code: &str) -> Result<(), IdentityError> {
        if code == BAD_CODE {
            return Err(IdentityError::InvalidVerification);
        }
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
        if email == UNCONFIRMED_EMAIL {
            return Err(IdentityError::UserNotConfirmed);
        }
        if password != GOOD_PASSWORD {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(tokens(true))
    }

    async fn refresh(&self, refresh_token: &str, _email: &str) -> Result<TokenPair, IdentityError> {
        if refresh_token != GOOD_REFRESH_TOKEN {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(tokens(false))
    }

    async fn forgot_password(&self, email: &str) -> Result<(), IdentityError> {
        if email == UNKNOWN_EMAIL {
            return Err(IdentityError::Provider {
                kind: "UserNotFoundException".to_string(),
                message: "Username/client id combination not found.".to_string(),
            });
        }
        Ok(())
    }

    async fn confirm_forgot_password(
        &self,
        _email: &str,
        code: &str,
        _new_password: &str,
    ) -> Result<(), IdentityError> {
        if code == BAD_CODE {
            return Err(IdentityError::InvalidVerification);
        }
        Ok(())
    }
}
