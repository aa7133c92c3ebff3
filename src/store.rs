// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory item store backing the permission-gated item routes.

use chrono::Utc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{CreateItemRequest, Item};

#[derive(Default)]
pub struct ItemStore {
    // Insertion order
    items: Vec<Item>,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items in creation order.
    pub fn list(&self) -> Vec<Item> {
        self.items.clone()
    }

    pub fn create(&mut self, request: CreateItemRequest, created_by: &str) -> Item {
        let item = Item {
            id: Uuid::new_v4(),
            name: request.name,
            description: request.description,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        self.items.push(item.clone());
        item
    }

    pub fn delete(&mut self, id: &Uuid) -> Result<Item, ApiError> {
        let index = self
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| ApiError::not_found("item not found"))?;
        Ok(self.items.remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
