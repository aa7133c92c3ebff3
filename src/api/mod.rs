// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # HTTP Surface
//!
//! | Group | Guard |
//! |-------|-------|
//! | `/healthz`, `/health/ready`, `/api/v1/auth/*` | public |
//! | `/api/v1/me` | bearer |
//! | `/api/v1/items` | bearer + per-method permission |
//! | `/api/v1/editor/*` | bearer + `editor` or `admin` role |
//! | `/api/v1/admin/*` | bearer + admin |
//! | `/api/v1/service/*` | request signature |
//!
//! Guards are layered per route group with `route_layer`, so unmatched paths
//! answer 404 rather than 401.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        authenticate, require_admin, require_permission, require_role, require_signature,
        AnyRole, CredentialScope, KeySetStatus, Permission, ServiceIdentity, TokenPair,
    },
    models::{
        ConfirmSignupRequest, CreateItemRequest, ForgotPasswordRequest, Item, LoginRequest,
        MessageResponse, RefreshRequest, ResetPasswordRequest, SignupRequest, SignupResponse,
        TokenResponse,
    },
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod items;
pub mod service;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/confirm", post(auth::confirm))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let readers = Router::new()
        .route("/items", get(items::list_items))
        .route_layer(from_fn_with_state(Permission::READ_ITEMS, require_permission));
    let writers = Router::new()
        .route("/items", post(items::create_item))
        .route_layer(from_fn_with_state(Permission::WRITE_ITEMS, require_permission));
    let deleters = Router::new()
        .route("/items/{id}", delete(items::delete_item))
        .route_layer(from_fn_with_state(Permission::DELETE_ITEMS, require_permission));

    let editor_routes = Router::new()
        .route("/editor/ping", get(users::editor_ping))
        .route_layer(from_fn_with_state(
            AnyRole::of(&["editor", "admin"]),
            require_role,
        ));

    let admin_routes = Router::new()
        .route("/admin/keyset", get(admin::keyset_status))
        .route_layer(from_fn(require_admin));

    let bearer_routes = Router::new()
        .route("/me", get(users::get_current_user))
        .merge(readers)
        .merge(writers)
        .merge(deleters)
        .merge(editor_routes)
        .merge(admin_routes)
        .route_layer(from_fn_with_state(state.verifier.clone(), authenticate));

    let service_routes = Router::new()
        .route("/service/echo", post(service::echo))
        .route_layer(from_fn_with_state(state.signer.clone(), require_signature));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(bearer_routes)
        .merge(service_routes);

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/health/ready", get(health::readiness))
        .nest("/api/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::new())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        health::readiness,
        auth::signup,
        auth::confirm,
        auth::login,
        auth::refresh,
        auth::forgot_password,
        auth::reset_password,
        users::get_current_user,
        users::editor_ping,
        items::list_items,
        items::create_item,
        items::delete_item,
        admin::keyset_status,
        service::echo
    ),
    components(
        schemas(
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            SignupRequest,
            SignupResponse,
            ConfirmSignupRequest,
            LoginRequest,
            RefreshRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            MessageResponse,
            TokenResponse,
            TokenPair,
            users::UserMeResponse,
            users::PingResponse,
            Item,
            CreateItemRequest,
            admin::KeySetResponse,
            KeySetStatus,
            service::EchoResponse,
            ServiceIdentity,
            CredentialScope
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Account flows backed by Cognito"),
        (name = "Users", description = "Authenticated identity"),
        (name = "Items", description = "Permission-gated sample resource"),
        (name = "Admin", description = "Administrator tooling"),
        (name = "Service", description = "Signed service-to-service calls")
    )
)]
struct ApiDoc;
