// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sample resource guarded by per-route permissions.
//!
//! | Route | Permission |
//! |-------|------------|
//! | `GET /api/v1/items` | `items:read` |
//! | `POST /api/v1/items` | `items:write` |
//! | `DELETE /api/v1/items/{id}` | `items:delete` |

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::Auth,
    error::{ApiError, Problems},
    models::{CreateItemRequest, Item},
    state::AppState,
};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

impl CreateItemRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut problems = Problems::new();
        if self.name.trim().is_empty() {
            problems.insert("name", "name is required and cannot be empty");
        } else if self.name.chars().count() > MAX_NAME_LEN {
            problems.insert("name", "name must be 100 characters or less");
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            problems.insert("description", "description must be 500 characters or less");
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(problems))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/items",
    tag = "Items",
    security(("bearer" = [])),
    responses(
        (status = 200, body = [Item]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing items:read"),
    )
)]
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<Item>> {
    let items = state.items.read().await.list();
    info!(count = items.len(), "retrieving all items");
    Json(items)
}

#[utoipa::path(
    post,
    path = "/api/v1/items",
    tag = "Items",
    security(("bearer" = [])),
    request_body = CreateItemRequest,
    responses(
        (status = 201, body = Item),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing items:write"),
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    Auth(user): Auth,
    Json(request): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    request.validate()?;

    let item = state.items.write().await.create(request, &user.id);
    info!(item_id = %item.id, user_id = %user.id, name = %item.name, "item created");
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(
        ("id" = Uuid, Path, description = "Identifier of the item to delete")
    ),
    tag = "Items",
    security(("bearer" = [])),
    responses(
        (status = 204),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing items:delete"),
        (status = 404, description = "Item not found"),
    )
)]
pub async fn delete_item(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<StatusCode, ApiError> {
    state.items.write().await.delete(&id)?;
    info!(item_id = %id, user_id = %user.id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}
