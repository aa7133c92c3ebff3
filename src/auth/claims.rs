// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token claims and the authenticated user representation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::{self, Permission, ADMIN_ROLE};

/// Raw payload of a Cognito access token.
///
/// Decoding is strict: a claim with an unexpected type fails the whole
/// token instead of being silently dropped.
/// See: https://docs.aws.amazon.com/cognito/latest/developerguide/amazon-cognito-user-pools-using-the-access-token.html
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID) - the canonical Cognito user identifier
    pub sub: String,

    /// Issuer (`https://cognito-idp.<region>.amazonaws.com/<pool id>`)
    pub iss: String,

    /// `access`, `id` or `refresh`
    pub token_use: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Issued at timestamp
    pub iat: i64,

    #[serde(default, rename = "cognito:username", skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// User pool groups, used as role names
    #[serde(default, rename = "cognito:groups", skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

/// Validated identity facts extracted from an access token.
///
/// Only [`TokenVerifier`](super::TokenVerifier) produces these, after the
/// signature, issuer, token use and expiry checks have all passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
    pub is_admin: bool,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Claims {
    pub(crate) fn from_access_token(claims: AccessTokenClaims) -> Self {
        let roles = claims.groups.unwrap_or_default();
        let is_admin = roles.iter().any(|role| role == ADMIN_ROLE);

        Self {
            user_id: claims.sub,
            email: claims.email.unwrap_or_default(),
            username: claims.username.unwrap_or_default(),
            roles,
            is_admin,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}

/// Authenticated user attached to a request.
///
/// This is the primary type handlers use to represent the caller. It is
/// built once per request by the bearer middleware and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Canonical user ID (Cognito `sub` claim)
    pub id: String,
    pub email: String,
    pub username: String,
    /// Role names (Cognito groups)
    pub roles: BTreeSet<String>,
    pub is_admin: bool,
}

impl User {
    pub fn has_permission(&self, perm: &Permission) -> bool {
        roles::has_permission(self, perm)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles::has_any_role(self, roles)
    }
}

impl From<Claims> for User {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            username: claims.username,
            roles: claims.roles.into_iter().collect(),
            is_admin: claims.is_admin,
        }
    }
}

/// Token bundle issued by the identity provider on login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub token_type: String,
}
