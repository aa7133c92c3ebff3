// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization middleware for Axum.
//!
//! [`authenticate`] validates the bearer token and attaches the [`User`] to
//! the request extensions. The gates below read that extension and must be
//! layered inside it:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/items", delete(delete_item))
//!     .route_layer(middleware::from_fn_with_state(Permission::DELETE_ITEMS, require_permission))
//!     .route_layer(middleware::from_fn_with_state(verifier, authenticate));
//! ```
//!
//! A gate that finds no user answers 401 `unauthorized`; that means the
//! router is missing [`authenticate`] upstream.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::claims::User;
use super::error::AuthError;
use super::roles::Permission;
use super::verifier::TokenVerifier;

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively and must be followed by exactly
/// one space.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = value.split_once(' ').ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer")
        || token.is_empty()
        || token.contains(char::is_whitespace)
    {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Bearer authentication middleware.
pub async fn authenticate(
    State(verifier): State<TokenVerifier>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path().to_string();

    let token = bearer_token(request.headers()).inspect_err(|e| {
        debug!(path = %path, error = %e, "request without usable bearer token");
    })?;

    let claims = verifier.validate(token).await.inspect_err(|e| {
        warn!(path = %path, error = %e, "bearer token rejected");
    })?;

    request.extensions_mut().insert(User::from(claims));
    Ok(next.run(request).await)
}

fn attached_user(request: &Request) -> Result<&User, AuthError> {
    request.extensions().get::<User>().ok_or_else(|| {
        warn!(path = %request.uri().path(), "authorization gate reached without an authenticated user");
        AuthError::Unauthenticated
    })
}

/// Reject with 403 unless the user holds the permission given as state.
pub async fn require_permission(
    State(permission): State<Permission>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = attached_user(&request)?;
    if !user.has_permission(&permission) {
        warn!(
            user_id = %user.id,
            permission = %permission,
            path = %request.uri().path(),
            "permission denied"
        );
        return Err(AuthError::InsufficientPermission(permission.to_string()));
    }
    Ok(next.run(request).await)
}

/// Roles accepted by [`require_role`]; holding any one is enough.
#[derive(Debug, Clone)]
pub struct AnyRole(Arc<[String]>);

impl AnyRole {
    pub fn of<S: AsRef<str>>(roles: &[S]) -> Self {
        Self(roles.iter().map(|r| r.as_ref().to_string()).collect())
    }

    pub fn roles(&self) -> &[String] {
        &self.0
    }
}

/// Reject with 403 unless the user holds one of the roles given as state.
pub async fn require_role(
    State(required): State<AnyRole>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = attached_user(&request)?;
    if !user.has_any_role(required.roles()) {
        let roles = required.roles().join(",");
        warn!(
            user_id = %user.id,
            roles = %roles,
            path = %request.uri().path(),
            "role check failed"
        );
        return Err(AuthError::InsufficientRole(roles));
    }
    Ok(next.run(request).await)
}

/// Reject with 403 unless the user is an administrator.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AuthError> {
    let user = attached_user(&request)?;
    if !user.is_admin {
        warn!(
            user_id = %user.id,
            path = %request.uri().path(),
            "admin access denied"
        );
        return Err(AuthError::AdminRequired);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{access_claims, access_token, mint, test_verifier};
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    async fn whoami(Extension(user): Extension<User>) -> String {
        user.id
    }

    fn app() -> Router {
        let verifier = test_verifier();
        let delete = Router::new()
            .route("/delete", get(whoami))
            .route_layer(from_fn_with_state(Permission::DELETE_ITEMS, require_permission));
        let write = Router::new()
            .route("/write", get(whoami))
            .route_layer(from_fn_with_state(Permission::WRITE_ITEMS, require_permission));
        let editors = Router::new()
            .route("/editors", get(whoami))
            .route_layer(from_fn_with_state(AnyRole::of(&["editor", "admin"]), require_role));
        let admin = Router::new()
            .route("/admin", get(whoami))
            .route_layer(from_fn(require_admin));

        Router::new()
            .route("/me", get(whoami))
            .merge(delete)
            .merge(write)
            .merge(editors)
            .merge(admin)
            .route_layer(from_fn_with_state(verifier, authenticate))
    }

    async fn call(uri: &str, authorization: Option<String>) -> (StatusCode, String) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn bearer(groups: &[&str]) -> Option<String> {
        Some(format!("Bearer {}", access_token("user_123", groups)))
    }

    #[test]
    fn bearer_token_accepts_any_scheme_case() {
        for scheme in ["Bearer", "bearer", "BEARER"] {
            let headers = headers_with(&format!("{scheme} abc.def.ghi"));
            assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
        }
    }

    #[test]
    fn bearer_token_rejects_bad_shapes() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingAuthHeader)
        ));
        for value in ["Basic abc", "Bearer", "Bearer ", "Bearer  abc", "Bearer a b", "Bearerabc"] {
            assert!(
                matches!(bearer_token(&headers_with(value)), Err(AuthError::InvalidAuthHeader)),
                "accepted {value:?}"
            );
        }
    }

    #[tokio::test]
    async fn attaches_user_for_valid_token() {
        let (status, body) = call("/me", bearer(&["user"])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user_123");
    }

    #[tokio::test]
    async fn missing_header_returns_documented_body() {
        let (status, body) = call("/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            r#"{"error":"missing authorization header","error_code":"missing_auth_header"}"#
        );
    }

    #[tokio::test]
    async fn malformed_header_is_rejected() {
        let (status, body) = call("/me", Some("Token abc".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid authorization header format"));
    }

    #[tokio::test]
    async fn expired_and_forged_tokens_get_the_same_answer() {
        let mut expired = access_claims("user_123", &["admin"]);
        expired["exp"] = (chrono::Utc::now().timestamp() - 5).into();
        let (expired_status, expired_body) =
            call("/me", Some(format!("Bearer {}", mint(&expired)))).await;

        let (forged_status, forged_body) = call("/me", Some("Bearer a.b.c".to_string())).await;

        assert_eq!(expired_status, StatusCode::UNAUTHORIZED);
        assert_eq!(forged_status, StatusCode::UNAUTHORIZED);
        assert_eq!(expired_body, forged_body);
        assert!(expired_body.contains("invalid token"));
    }

    #[tokio::test]
    async fn editor_may_write_but_not_delete() {
        let (status, _) = call("/write", bearer(&["editor"])).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call("/delete", bearer(&["editor"])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("insufficient_permissions"));
    }

    #[tokio::test]
    async fn admin_passes_every_gate() {
        for uri in ["/delete", "/write", "/editors", "/admin"] {
            let (status, _) = call(uri, bearer(&["admin"])).await;
            assert_eq!(status, StatusCode::OK, "admin denied on {uri}");
        }
    }

    #[tokio::test]
    async fn role_gate_requires_one_listed_role() {
        let (status, _) = call("/editors", bearer(&["editor"])).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call("/editors", bearer(&["user"])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("insufficient_role"));
    }

    #[tokio::test]
    async fn admin_gate_rejects_non_admins() {
        let (status, body) = call("/admin", bearer(&["editor", "user"])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body.contains("admin_required"));
    }

    #[tokio::test]
    async fn gate_without_authenticator_is_unauthorized() {
        let app = Router::new()
            .route("/admin", get(whoami))
            .route_layer(from_fn(require_admin));
        let response = app
            .oneshot(HttpRequest::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
