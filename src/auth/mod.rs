// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Cognito access token verification, role-based access control and
//! signed-request authentication for the API.
//!
//! ## Auth Flow
//!
//! 1. Client logs in through `/api/v1/auth/login` and receives Cognito tokens
//! 2. Client sends `Authorization: Bearer <access token>`
//! 3. Server:
//!    - Fetches the user pool JWKS over HTTPS (cached for one hour)
//!    - Verifies signature, issuer, `token_use` and expiry
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `cognito:groups` → roles
//!
//! Service callers skip Cognito and sign each request with a shared secret
//! instead (see [`signature`]).
//!
//! ## Security
//!
//! - Clients never learn why a token was rejected
//! - A key set that cannot be refreshed past its expiry fails closed
//! - Tokens and shared secrets are never logged

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod refresher;
pub mod roles;
pub mod signature;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

pub use claims::{Claims, TokenPair, User};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use jwks::{KeySetCache, KeySetStatus};
pub use middleware::{authenticate, require_admin, require_permission, require_role, AnyRole};
pub use refresher::KeySetRefresher;
pub use roles::{Permission, Role};
pub use signature::{
    require_signature, CredentialScope, CredentialStore, ServiceIdentity, SignatureAuthenticator,
};
pub use verifier::{cognito_issuer, TokenVerifier};
