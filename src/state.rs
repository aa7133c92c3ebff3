// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::{SignatureAuthenticator, TokenVerifier};
use crate::identity::IdentityProvider;
use crate::store::ItemStore;

/// Shared handles for every request.
///
/// The verifier owns the key-set cache; clones share it.
#[derive(Clone)]
pub struct AppState {
    pub verifier: TokenVerifier,
    pub identity: Arc<dyn IdentityProvider>,
    pub signer: Arc<SignatureAuthenticator>,
    pub items: Arc<RwLock<ItemStore>>,
}

impl AppState {
    pub fn new(
        verifier: TokenVerifier,
        identity: Arc<dyn IdentityProvider>,
        signer: SignatureAuthenticator,
    ) -> Self {
        Self {
            verifier,
            identity,
            signer: Arc::new(signer),
            items: Arc::new(RwLock::new(ItemStore::new())),
        }
    }
}
