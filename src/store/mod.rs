//! Storage seams consumed by the authorization engine and the admin surface.
//!
//! The engine only reads through [`PermissionStore`] and [`ScopeStore`].
//! [`ScopeAdmin`] is the write side used by administrative tooling; it owns
//! the uniqueness and cascade rules for scope rows.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::authz::{PermissionCode, Principal};
use crate::errors::AppResult;
use crate::models::rbac::{Group, Membership, Permission};
use crate::models::scope::{LocaleScope, SectionScope};
use crate::models::user::User;

/// Model-level permission oracle (group grants and direct grants).
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn has_model_permission(&self, principal: &Principal, code: &PermissionCode) -> AppResult<bool>;
}

/// Membership and scope lookups used by the scope resolver.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    async fn groups_of(&self, principal: &Principal) -> AppResult<Vec<Uuid>>;

    async fn locale_scopes_of(&self, group_id: Uuid) -> AppResult<Vec<String>>;

    /// Stored path prefixes, already in canonical form.
    async fn section_scopes_of(&self, group_id: Uuid) -> AppResult<Vec<String>>;
}

/// Administrative operations on users, groups, grants and scopes.
///
/// Scope creation with an existing `(group, value)` key fails with
/// `AppError::ScopeConflict`. Membership and permission grants are idempotent.
/// `delete_group` removes memberships, grants and scope rows together with the
/// group, as one unit.
#[async_trait]
pub trait ScopeAdmin: Send + Sync {
    // users
    async fn create_user(&self, name: &str, is_superuser: bool, is_active: bool) -> AppResult<User>;
    async fn get_user(&self, user_id: Uuid) -> AppResult<User>;
    async fn set_user_flags(&self, user_id: Uuid, is_superuser: Option<bool>, is_active: Option<bool>) -> AppResult<User>;

    // groups
    async fn create_group(&self, name: &str) -> AppResult<Group>;
    async fn get_group(&self, group_id: Uuid) -> AppResult<Group>;
    async fn list_groups(&self) -> AppResult<Vec<Group>>;
    async fn delete_group(&self, group_id: Uuid) -> AppResult<Group>;

    // memberships
    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Membership>;
    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool>;
    async fn list_members(&self, group_id: Uuid) -> AppResult<Vec<Uuid>>;

    // permissions
    async fn create_permission(&self, code: &PermissionCode, description: Option<&str>) -> AppResult<Permission>;
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;
    async fn grant_group_permission(&self, group_id: Uuid, code: &PermissionCode) -> AppResult<()>;
    async fn revoke_group_permission(&self, group_id: Uuid, code: &PermissionCode) -> AppResult<bool>;
    async fn group_permissions(&self, group_id: Uuid) -> AppResult<Vec<String>>;
    async fn grant_user_permission(&self, user_id: Uuid, code: &PermissionCode) -> AppResult<()>;
    async fn revoke_user_permission(&self, user_id: Uuid, code: &PermissionCode) -> AppResult<bool>;

    // scopes
    async fn create_locale_scope(&self, group_id: Uuid, locale: &str) -> AppResult<LocaleScope>;
    async fn list_locale_scopes(&self, group_id: Uuid) -> AppResult<Vec<LocaleScope>>;
    async fn delete_locale_scope(&self, group_id: Uuid, scope_id: Uuid) -> AppResult<LocaleScope>;
    async fn create_section_scope(&self, group_id: Uuid, path_prefix: &str, name: &str) -> AppResult<SectionScope>;
    async fn list_section_scopes(&self, group_id: Uuid) -> AppResult<Vec<SectionScope>>;
    async fn delete_section_scope(&self, group_id: Uuid, scope_id: Uuid) -> AppResult<SectionScope>;
}
