// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cognito user pool client over the JSON 1.1 protocol.
//!
//! The account actions used here are public Cognito APIs: they are
//! authenticated by the app client id plus `SECRET_HASH`, not by AWS
//! credentials, so no request signing is needed.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::secret_hash::compute_secret_hash;
use super::{IdentityError, IdentityProvider};
use crate::auth::TokenPair;

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Regional Cognito identity provider endpoint.
pub fn cognito_endpoint(region: &str) -> String {
    format!("https://cognito-idp.{region}.amazonaws.com/")
}

/// Cognito client for one app client of one user pool.
#[derive(Clone)]
pub struct CognitoClient {
    http: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for CognitoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CognitoClient")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttributeType<'a> {
    name: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpInput<'a> {
    client_id: &'a str,
    secret_hash: String,
    username: &'a str,
    password: &'a str,
    user_attributes: Vec<AttributeType<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConfirmSignUpInput<'a> {
    client_id: &'a str,
    secret_hash: String,
    username: &'a str,
    confirmation_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthInput<'a> {
    auth_flow: &'static str,
    client_id: &'a str,
    auth_parameters: HashMap<&'static str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ForgotPasswordInput<'a> {
    client_id: &'a str,
    secret_hash: String,
    username: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConfirmForgotPasswordInput<'a> {
    client_id: &'a str,
    secret_hash: String,
    username: &'a str,
    confirmation_code: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthOutput {
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: i64,
    token_type: Option<String>,
}

impl From<AuthenticationResult> for TokenPair {
    fn from(result: AuthenticationResult) -> Self {
        Self {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            expires_in: result.expires_in,
            token_type: result.token_type.unwrap_or_else(|| "Bearer".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

/// Map a Cognito exception name to an [`IdentityError`].
///
/// `kind` may carry a namespace (`com.amazonaws...#NotAuthorizedException`).
fn map_exception(kind: &str, message: String) -> IdentityError {
    let name = kind.rsplit('#').next().unwrap_or(kind);
    match name {
        "UsernameExistsException" => IdentityError::UserAlreadyExists,
        "NotAuthorizedException" => IdentityError::InvalidCredentials,
        "UserNotConfirmedException" => IdentityError::UserNotConfirmed,
        "PasswordResetRequiredException" => IdentityError::PasswordResetRequired,
        "CodeMismatchException" | "ExpiredCodeException" => IdentityError::InvalidVerification,
        _ => IdentityError::Provider {
            kind: name.to_string(),
            message,
        },
    }
}

impl CognitoClient {
    /// Create a client for the regional endpoint.
    pub fn new(
        region: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: cognito_endpoint(region),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Point the client at another endpoint (local emulators, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn secret_hash(&self, username: &str) -> String {
        compute_secret_hash(&self.client_secret, username, &self.client_id)
    }

    async fn call<I: Serialize, O: DeserializeOwned>(
        &self,
        action: &str,
        input: &I,
    ) -> Result<O, IdentityError> {
        let body = serde_json::to_vec(input).map_err(|e| IdentityError::Transport(e.to_string()))?;

        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{action}"))
            .body(body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        if !status.is_success() {
            let error: ErrorBody = serde_json::from_slice(&bytes).map_err(|_| {
                IdentityError::Transport(format!("HTTP {status} from Cognito {action}"))
            })?;
            let mapped = map_exception(&error.kind, error.message);
            if let IdentityError::Provider { kind, message } = &mapped {
                warn!(action, kind = %kind, message = %message, "Cognito request failed");
            }
            return Err(mapped);
        }

        serde_json::from_slice(&bytes).map_err(|e| IdentityError::Transport(e.to_string()))
    }

    async fn initiate_auth(
        &self,
        flow: &'static str,
        parameters: HashMap<&'static str, String>,
    ) -> Result<TokenPair, IdentityError> {
        let output: InitiateAuthOutput = self
            .call(
                "InitiateAuth",
                &InitiateAuthInput {
                    auth_flow: flow,
                    client_id: &self.client_id,
                    auth_parameters: parameters,
                },
            )
            .await?;

        output
            .authentication_result
            .map(TokenPair::from)
            .ok_or_else(|| IdentityError::Provider {
                kind: "ChallengeRequired".to_string(),
                message: "authentication result is missing".to_string(),
            })
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<(), IdentityError> {
        let mut user_attributes = vec![AttributeType {
            name: "email",
            value: email,
        }];
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            user_attributes.push(AttributeType { name: "name", value: name });
        }

        let _: IgnoredAny = self
            .call(
                "SignUp",
                &SignUpInput {
                    client_id: &self.client_id,
                    secret_hash: self.secret_hash(email),
                    username: email,
                    password,
                    user_attributes,
                },
            )
            .await?;

        info!("user signed up");
        Ok(())
    }

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), IdentityError> {
        let _: IgnoredAny = self
            .call(
                "ConfirmSignUp",
                &ConfirmSignUpInput {
                    client_id: &self.client_id,
                    secret_hash: self.secret_hash(email),
                    username: email,
                    confirmation_code: code,
                },
            )
            .await?;

        info!("user confirmed");
        Ok(())
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenPair, IdentityError> {
        let parameters = HashMap::from([
            ("USERNAME", email.to_string()),
            ("PASSWORD", password.to_string()),
            ("SECRET_HASH", self.secret_hash(email)),
        ]);
        let tokens = self.initiate_auth("USER_PASSWORD_AUTH", parameters).await?;
        info!("user logged in");
        Ok(tokens)
    }

    async fn refresh(&self, refresh_token: &str, email: &str) -> Result<TokenPair, IdentityError> {
        let parameters = HashMap::from([
            ("REFRESH_TOKEN", refresh_token.to_string()),
            ("SECRET_HASH", self.secret_hash(email)),
        ]);
        let mut tokens = self.initiate_auth("REFRESH_TOKEN_AUTH", parameters).await?;
        tokens.refresh_token = None;
        info!("tokens refreshed");
        Ok(tokens)
    }

    async fn forgot_password(&self, email: &str) -> Result<(), IdentityError> {
        let _: IgnoredAny = self
            .call(
                "ForgotPassword",
                &ForgotPasswordInput {
                    client_id: &self.client_id,
                    secret_hash: self.secret_hash(email),
                    username: email,
                },
            )
            .await?;

        info!("password reset code requested");
        Ok(())
    }

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let _: IgnoredAny = self
            .call(
                "ConfirmForgotPassword",
                &ConfirmForgotPasswordInput {
                    client_id: &self.client_id,
                    secret_hash: self.secret_hash(email),
                    username: email,
                    confirmation_code: code,
                    password: new_password,
                },
            )
            .await?;

        info!("password reset");
        Ok(())
    }
}
