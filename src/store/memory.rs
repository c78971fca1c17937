use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PermissionStore, ScopeAdmin, ScopeStore};
use crate::authz::path::canonical_prefix;
use crate::authz::{PermissionCode, Principal};
use crate::errors::{AppError, AppResult};
use crate::models::rbac::{Group, Membership, Permission};
use crate::models::scope::{LocaleScope, SectionScope};
use crate::models::user::User;
use crate::utils::{canonical_locale, canonical_name, utc_now};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, Group>,
    /// (user_id, group_id)
    memberships: HashMap<(Uuid, Uuid), Membership>,
    permissions: HashMap<String, Permission>,
    /// (group_id, codename)
    group_permissions: HashSet<(Uuid, String)>,
    /// (user_id, codename)
    user_permissions: HashSet<(Uuid, String)>,
    locale_scopes: HashMap<Uuid, LocaleScope>,
    section_scopes: HashMap<Uuid, SectionScope>,
}

impl State {
    fn group(&self, group_id: Uuid) -> AppResult<&Group> {
        self.groups
            .get(&group_id)
            .ok_or_else(|| AppError::not_found("Group not found"))
    }

    fn user(&self, user_id: Uuid) -> AppResult<&User> {
        self.users
            .get(&user_id)
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    fn permission(&self, code: &PermissionCode) -> AppResult<&Permission> {
        self.permissions
            .get(code.as_str())
            .ok_or_else(|| AppError::not_found(format!("Permission '{code}' not found")))
    }
}

/// In-process store behind a single async `RwLock`.
///
/// Every write is applied under the write lock, so readers always see either
/// the state before or after a whole operation (including `delete_group`).
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn has_model_permission(&self, principal: &Principal, code: &PermissionCode) -> AppResult<bool> {
        let state = self.state.read().await;
        let user_id = principal.user_id;

        if state.user_permissions.contains(&(user_id, code.as_str().to_string())) {
            return Ok(true);
        }

        Ok(state
            .memberships
            .keys()
            .filter(|(member, _)| *member == user_id)
            .any(|(_, group_id)| {
                state
                    .group_permissions
                    .contains(&(*group_id, code.as_str().to_string()))
            }))
    }
}

#[async_trait]
impl ScopeStore for MemoryStore {
    async fn groups_of(&self, principal: &Principal) -> AppResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .keys()
            .filter(|(user_id, _)| *user_id == principal.user_id)
            .map(|(_, group_id)| *group_id)
            .collect())
    }

    async fn locale_scopes_of(&self, group_id: Uuid) -> AppResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .locale_scopes
            .values()
            .filter(|scope| scope.group_id == group_id)
            .map(|scope| scope.locale.clone())
            .collect())
    }

    async fn section_scopes_of(&self, group_id: Uuid) -> AppResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .section_scopes
            .values()
            .filter(|scope| scope.group_id == group_id)
            .map(|scope| scope.path_prefix.clone())
            .collect())
    }
}

#[async_trait]
impl ScopeAdmin for MemoryStore {
    async fn create_user(&self, name: &str, is_superuser: bool, is_active: bool) -> AppResult<User> {
        let name = canonical_name(name)?;
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.name == name) {
            return Err(AppError::conflict(format!("user '{name}' already exists")));
        }

        let now = utc_now();
        let user = User {
            id: Uuid::new_v4(),
            name,
            is_superuser,
            is_active,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let state = self.state.read().await;
        state.user(user_id).cloned()
    }

    async fn set_user_flags(&self, user_id: Uuid, is_superuser: Option<bool>, is_active: Option<bool>) -> AppResult<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::not_found("User not found"))?;

        if let Some(flag) = is_superuser {
            user.is_superuser = flag;
        }
        if let Some(flag) = is_active {
            user.is_active = flag;
        }
        user.updated_at = utc_now();
        Ok(user.clone())
    }

    async fn create_group(&self, name: &str) -> AppResult<Group> {
        let name = canonical_name(name)?;
        let mut state = self.state.write().await;
        if state.groups.values().any(|g| g.name == name) {
            return Err(AppError::conflict(format!("group '{name}' already exists")));
        }

        let group = Group {
            id: Uuid::new_v4(),
            name,
            created_at: utc_now(),
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, group_id: Uuid) -> AppResult<Group> {
        let state = self.state.read().await;
        state.group(group_id).cloned()
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: Uuid) -> AppResult<Group> {
        let mut state = self.state.write().await;
        let group = state
            .groups
            .remove(&group_id)
            .ok_or_else(|| AppError::not_found("Group not found"))?;

        state.memberships.retain(|(_, g), _| *g != group_id);
        state.group_permissions.retain(|(g, _)| *g != group_id);
        state.locale_scopes.retain(|_, scope| scope.group_id != group_id);
        state.section_scopes.retain(|_, scope| scope.group_id != group_id);

        Ok(group)
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Membership> {
        let mut state = self.state.write().await;
        state.group(group_id)?;
        state.user(user_id)?;

        let membership = state
            .memberships
            .entry((user_id, group_id))
            .or_insert_with(|| Membership {
                user_id,
                group_id,
                created_at: utc_now(),
            });
        Ok(membership.clone())
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.memberships.remove(&(user_id, group_id)).is_some())
    }

    async fn list_members(&self, group_id: Uuid) -> AppResult<Vec<Uuid>> {
        let state = self.state.read().await;
        state.group(group_id)?;
        let mut members: Vec<Uuid> = state
            .memberships
            .keys()
            .filter(|(_, g)| *g == group_id)
            .map(|(user_id, _)| *user_id)
            .collect();
        members.sort();
        Ok(members)
    }

    async fn create_permission(&self, code: &PermissionCode, description: Option<&str>) -> AppResult<Permission> {
        let mut state = self.state.write().await;
        if state.permissions.contains_key(code.as_str()) {
            return Err(AppError::conflict(format!("permission '{code}' already exists")));
        }

        let permission = Permission {
            id: Uuid::new_v4(),
            codename: code.to_string(),
            description: description.map(str::to_string),
            created_at: utc_now(),
        };
        state
            .permissions
            .insert(permission.codename.clone(), permission.clone());
        Ok(permission)
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state.permissions.values().cloned().collect();
        permissions.sort_by(|a, b| a.codename.cmp(&b.codename));
        Ok(permissions)
    }

    async fn grant_group_permission(&self, group_id: Uuid, code: &PermissionCode) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.group(group_id)?;
        state.permission(code)?;
        state
            .group_permissions
            .insert((group_id, code.as_str().to_string()));
        Ok(())
    }

    async fn revoke_group_permission(&self, group_id: Uuid, code: &PermissionCode) -> AppResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .group_permissions
            .remove(&(group_id, code.as_str().to_string())))
    }

    async fn group_permissions(&self, group_id: Uuid) -> AppResult<Vec<String>> {
        let state = self.state.read().await;
        state.group(group_id)?;
        let mut codes: Vec<String> = state
            .group_permissions
            .iter()
            .filter(|(g, _)| *g == group_id)
            .map(|(_, code)| code.clone())
            .collect();
        codes.sort();
        Ok(codes)
    }

    async fn grant_user_permission(&self, user_id: Uuid, code: &PermissionCode) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.user(user_id)?;
        state.permission(code)?;
        state
            .user_permissions
            .insert((user_id, code.as_str().to_string()));
        Ok(())
    }

    async fn revoke_user_permission(&self, user_id: Uuid, code: &PermissionCode) -> AppResult<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .user_permissions
            .remove(&(user_id, code.as_str().to_string())))
    }

    async fn create_locale_scope(&self, group_id: Uuid, locale: &str) -> AppResult<LocaleScope> {
        let locale = canonical_locale(locale)?;
        let mut state = self.state.write().await;
        state.group(group_id)?;

        if state
            .locale_scopes
            .values()
            .any(|scope| scope.group_id == group_id && scope.locale == locale)
        {
            return Err(AppError::scope_conflict(group_id, "locale", locale));
        }

        let scope = LocaleScope {
            id: Uuid::new_v4(),
            group_id,
            locale,
            created_at: utc_now(),
        };
        state.locale_scopes.insert(scope.id, scope.clone());
        Ok(scope)
    }

    async fn list_locale_scopes(&self, group_id: Uuid) -> AppResult<Vec<LocaleScope>> {
        let state = self.state.read().await;
        state.group(group_id)?;
        let mut scopes: Vec<LocaleScope> = state
            .locale_scopes
            .values()
            .filter(|scope| scope.group_id == group_id)
            .cloned()
            .collect();
        scopes.sort_by(|a, b| a.locale.cmp(&b.locale));
        Ok(scopes)
    }

    async fn delete_locale_scope(&self, group_id: Uuid, scope_id: Uuid) -> AppResult<LocaleScope> {
        let mut state = self.state.write().await;
        match state.locale_scopes.get(&scope_id) {
            Some(scope) if scope.group_id == group_id => {}
            _ => return Err(AppError::not_found("Locale scope not found")),
        }
        state
            .locale_scopes
            .remove(&scope_id)
            .ok_or_else(|| AppError::not_found("Locale scope not found"))
    }

    async fn create_section_scope(&self, group_id: Uuid, path_prefix: &str, name: &str) -> AppResult<SectionScope> {
        let path_prefix = canonical_prefix(path_prefix)?;
        let mut state = self.state.write().await;
        state.group(group_id)?;

        if state
            .section_scopes
            .values()
            .any(|scope| scope.group_id == group_id && scope.path_prefix == path_prefix)
        {
            return Err(AppError::scope_conflict(group_id, "section", path_prefix));
        }

        let scope = SectionScope {
            id: Uuid::new_v4(),
            group_id,
            path_prefix,
            name: name.trim().to_string(),
            created_at: utc_now(),
        };
        state.section_scopes.insert(scope.id, scope.clone());
        Ok(scope)
    }

    async fn list_section_scopes(&self, group_id: Uuid) -> AppResult<Vec<SectionScope>> {
        let state = self.state.read().await;
        state.group(group_id)?;
        let mut scopes: Vec<SectionScope> = state
            .section_scopes
            .values()
            .filter(|scope| scope.group_id == group_id)
            .cloned()
            .collect();
        scopes.sort_by(|a, b| a.path_prefix.cmp(&b.path_prefix));
        Ok(scopes)
    }

    async fn delete_section_scope(&self, group_id: Uuid, scope_id: Uuid) -> AppResult<SectionScope> {
        let mut state = self.state.write().await;
        match state.section_scopes.get(&scope_id) {
            Some(scope) if scope.group_id == group_id => {}
            _ => return Err(AppError::not_found("Section scope not found")),
        }
        state
            .section_scopes
            .remove(&scope_id)
            .ok_or_else(|| AppError::not_found("Section scope not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_scopes_conflict_and_keep_one_row() {
        let store = MemoryStore::new();
        let group = store.create_group("Editors").await.unwrap();

        store.create_locale_scope(group.id, "en").await.unwrap();
        let err = store.create_locale_scope(group.id, "en").await.unwrap_err();
        assert!(matches!(err, AppError::ScopeConflict { dimension: "locale", .. }));
        assert_eq!(store.list_locale_scopes(group.id).await.unwrap().len(), 1);

        store.create_section_scope(group.id, "/blog", "Blog").await.unwrap();
        let err = store.create_section_scope(group.id, "/blog/", "Blog again").await.unwrap_err();
        assert!(matches!(err, AppError::ScopeConflict { dimension: "section", .. }));
        assert_eq!(store.list_section_scopes(group.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn same_value_in_different_groups_is_fine() {
        let store = MemoryStore::new();
        let a = store.create_group("A").await.unwrap();
        let b = store.create_group("B").await.unwrap();

        store.create_locale_scope(a.id, "fr").await.unwrap();
        store.create_locale_scope(b.id, "fr").await.unwrap();
    }

    #[tokio::test]
    async fn delete_group_cascades() {
        let store = MemoryStore::new();
        let user = store.create_user("ada", false, true).await.unwrap();
        let group = store.create_group("Editors").await.unwrap();
        let code = PermissionCode::parse("cms.change_page").unwrap();
        store.create_permission(&code, None).await.unwrap();

        store.add_member(group.id, user.id).await.unwrap();
        store.grant_group_permission(group.id, &code).await.unwrap();
        store.create_locale_scope(group.id, "en").await.unwrap();
        store.create_section_scope(group.id, "/blog", "").await.unwrap();

        store.delete_group(group.id).await.unwrap();

        let principal = user.principal();
        assert!(store.groups_of(&principal).await.unwrap().is_empty());
        assert!(store.locale_scopes_of(group.id).await.unwrap().is_empty());
        assert!(store.section_scopes_of(group.id).await.unwrap().is_empty());
        assert!(!store.has_model_permission(&principal, &code).await.unwrap());
        assert!(matches!(store.get_group(group.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn scope_delete_checks_owning_group() {
        let store = MemoryStore::new();
        let a = store.create_group("A").await.unwrap();
        let b = store.create_group("B").await.unwrap();
        let scope = store.create_locale_scope(a.id, "en").await.unwrap();

        assert!(matches!(
            store.delete_locale_scope(b.id, scope.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(store.delete_locale_scope(a.id, scope.id).await.unwrap(), scope);
    }

    #[tokio::test]
    async fn grants_require_known_permission() {
        let store = MemoryStore::new();
        let group = store.create_group("Editors").await.unwrap();
        let code = PermissionCode::parse("cms.publish_page").unwrap();

        assert!(matches!(
            store.grant_group_permission(group.id, &code).await,
            Err(AppError::NotFound(_))
        ));
    }
}
