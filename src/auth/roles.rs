// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Roles, permissions and the RBAC decisions built on them.
//!
//! ## Role Registry
//!
//! | Role | Permissions |
//! |------|-------------|
//! | `user` | `items:read` |
//! | `editor` | `items:read`, `items:write` |
//! | `admin` | every permission, including the `admin:*` wildcard |
//!
//! Role names come from the `cognito:groups` claim. A group that is not in
//! the registry grants nothing: a user with a retired or misspelled group
//! simply loses those permissions.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::claims::User;

/// An authorization permission tag such as `items:read`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const READ_ITEMS: Permission = Permission(Cow::Borrowed("items:read"));
    pub const WRITE_ITEMS: Permission = Permission(Cow::Borrowed("items:write"));
    pub const DELETE_ITEMS: Permission = Permission(Cow::Borrowed("items:delete"));
    pub const AWS_READ: Permission = Permission(Cow::Borrowed("aws:read"));
    pub const AWS_WRITE: Permission = Permission(Cow::Borrowed("aws:write"));
    /// Wildcard: a role holding this satisfies every permission check.
    pub const ADMIN: Permission = Permission(Cow::Borrowed("admin:*"));

    /// Build a permission from an arbitrary tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Permission(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named role and the permissions it grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: &'static str,
    pub permissions: &'static [Permission],
}

impl Role {
    pub const USER: Role = Role {
        name: "user",
        permissions: &[Permission::READ_ITEMS],
    };

    pub const EDITOR: Role = Role {
        name: "editor",
        permissions: &[Permission::READ_ITEMS, Permission::WRITE_ITEMS],
    };

    pub const ADMIN: Role = Role {
        name: "admin",
        permissions: &[
            Permission::READ_ITEMS,
            Permission::WRITE_ITEMS,
            Permission::DELETE_ITEMS,
            Permission::AWS_READ,
            Permission::AWS_WRITE,
            Permission::ADMIN,
        ],
    };

    /// Look up a role by exact name.
    pub fn lookup(name: &str) -> Option<&'static Role> {
        REGISTRY.iter().find(|role| role.name == name)
    }

    /// Whether this role grants `perm`, directly or through the wildcard.
    pub fn grants(&self, perm: &Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| p == perm || *p == Permission::ADMIN)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Name of the role that marks a user as an administrator.
pub const ADMIN_ROLE: &str = "admin";

static REGISTRY: [Role; 3] = [Role::USER, Role::EDITOR, Role::ADMIN];

/// Permissions granted by a role name; unknown names grant nothing.
pub fn role_permissions(name: &str) -> &'static [Permission] {
    Role::lookup(name).map(|role| role.permissions).unwrap_or(&[])
}

/// Whether `user` holds `perm`.
///
/// Admins hold every permission regardless of their roles.
pub fn has_permission(user: &User, perm: &Permission) -> bool {
    if user.is_admin {
        return true;
    }

    user.roles
        .iter()
        .filter_map(|name| Role::lookup(name))
        .any(|role| role.grants(perm))
}

/// Whether `user` holds at least one of `roles`. No wildcard applies here.
pub fn has_any_role<S: AsRef<str>>(user: &User, roles: &[S]) -> bool {
    roles.iter().any(|required| user.roles.contains(required.as_ref()))
}
