// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cognito API Server - REST API secured by Cognito access tokens
//!
//! Bearer requests are verified locally against the user pool's published
//! keys and authorized by role. Service-to-service calls authenticate with a
//! shared-secret request signature instead.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification, RBAC and request signatures
//! - `identity` - Account flows delegated to the Cognito user pool
//! - `config` - Environment configuration
//! - `telemetry` - Structured logging

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod state;
pub mod store;
pub mod telemetry;
