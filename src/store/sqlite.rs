use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{PermissionStore, ScopeAdmin, ScopeStore};
use crate::authz::path::canonical_prefix;
use crate::authz::{PermissionCode, Principal};
use crate::db::row_parsers::{
    group_from_row, locale_scope_from_row, membership_from_row, permission_from_row, section_scope_from_row,
    user_from_row,
};
use crate::errors::{is_unique_violation, AppError, AppResult};
use crate::models::rbac::{Group, Membership, Permission};
use crate::models::scope::{LocaleScope, SectionScope};
use crate::models::user::User;
use crate::utils::{canonical_locale, canonical_name, utc_now};

/// SQLite-backed store. Every read goes to the database, so a committed write
/// is visible to the next evaluation on any connection.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_group(&self, group_id: Uuid) -> AppResult<()> {
        self.get_group(group_id).await.map(|_| ())
    }

    async fn permission_id(&self, code: &PermissionCode) -> AppResult<String> {
        sqlx::query_scalar::<_, String>("SELECT id FROM permissions WHERE codename = ?")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Permission '{code}' not found")))
    }
}

#[async_trait]
impl PermissionStore for SqliteStore {
    async fn has_model_permission(&self, principal: &Principal, code: &PermissionCode) -> AppResult<bool> {
        let user_id = principal.user_id.to_string();

        let granted: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM permissions p
                INNER JOIN group_permissions gp ON gp.permission_id = p.id
                INNER JOIN user_groups ug ON ug.group_id = gp.group_id
                WHERE ug.user_id = ? AND p.codename = ?
                UNION ALL
                SELECT 1
                FROM permissions p
                INNER JOIN user_permissions up ON up.permission_id = p.id
                WHERE up.user_id = ? AND p.codename = ?
            )
            "#,
        )
        .bind(&user_id)
        .bind(code.as_str())
        .bind(&user_id)
        .bind(code.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(granted != 0)
    }
}

#[async_trait]
impl ScopeStore for SqliteStore {
    async fn groups_of(&self, principal: &Principal) -> AppResult<Vec<Uuid>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT group_id FROM user_groups WHERE user_id = ?")
            .bind(principal.user_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        ids.iter()
            .map(|id| Uuid::parse_str(id).map_err(|e| AppError::internal(format!("invalid uuid: {}", e))))
            .collect()
    }

    async fn locale_scopes_of(&self, group_id: Uuid) -> AppResult<Vec<String>> {
        let locales = sqlx::query_scalar("SELECT locale FROM locale_scopes WHERE group_id = ?")
            .bind(group_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(locales)
    }

    async fn section_scopes_of(&self, group_id: Uuid) -> AppResult<Vec<String>> {
        let prefixes = sqlx::query_scalar("SELECT path_prefix FROM section_scopes WHERE group_id = ?")
            .bind(group_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(prefixes)
    }
}

#[async_trait]
impl ScopeAdmin for SqliteStore {
    async fn create_user(&self, name: &str, is_superuser: bool, is_active: bool) -> AppResult<User> {
        let name = canonical_name(name)?;
        let id = Uuid::new_v4();
        let now = utc_now();

        sqlx::query(
            "INSERT INTO users (id, name, is_superuser, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&name)
        .bind(is_superuser)
        .bind(is_active)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::conflict(format!("user '{name}' already exists"))
            } else {
                e.into()
            }
        })?;

        self.get_user(id).await
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query(
            "SELECT id, name, is_superuser, is_active, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

        user_from_row(&row)
    }

    async fn set_user_flags(&self, user_id: Uuid, is_superuser: Option<bool>, is_active: Option<bool>) -> AppResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_superuser = COALESCE(?, is_superuser),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(is_superuser)
        .bind(is_active)
        .bind(utc_now().to_rfc3339())
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User not found"));
        }

        self.get_user(user_id).await
    }

    async fn create_group(&self, name: &str) -> AppResult<Group> {
        let name = canonical_name(name)?;
        let group = Group {
            id: Uuid::new_v4(),
            name,
            created_at: utc_now(),
        };

        sqlx::query("INSERT INTO groups (id, name, created_at) VALUES (?, ?, ?)")
            .bind(group.id.to_string())
            .bind(&group.name)
            .bind(group.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::conflict(format!("group '{}' already exists", group.name))
                } else {
                    e.into()
                }
            })?;

        Ok(group)
    }

    async fn get_group(&self, group_id: Uuid) -> AppResult<Group> {
        let row = sqlx::query("SELECT id, name, created_at FROM groups WHERE id = ?")
            .bind(group_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))?;

        group_from_row(&row)
    }

    async fn list_groups(&self) -> AppResult<Vec<Group>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM groups ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(group_from_row).collect()
    }

    async fn delete_group(&self, group_id: Uuid) -> AppResult<Group> {
        let id = group_id.to_string();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT id, name, created_at FROM groups WHERE id = ?")
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Group not found"))?;
        let group = group_from_row(&row)?;

        // Dependents first so the group row is never referenced after it is gone.
        for statement in [
            "DELETE FROM user_groups WHERE group_id = ?",
            "DELETE FROM group_permissions WHERE group_id = ?",
            "DELETE FROM locale_scopes WHERE group_id = ?",
            "DELETE FROM section_scopes WHERE group_id = ?",
            "DELETE FROM groups WHERE id = ?",
        ] {
            sqlx::query(statement).bind(&id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(group)
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<Membership> {
        self.ensure_group(group_id).await?;
        self.get_user(user_id).await?;

        sqlx::query("INSERT OR IGNORE INTO user_groups (user_id, group_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id.to_string())
            .bind(group_id.to_string())
            .bind(utc_now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT user_id, group_id, created_at FROM user_groups WHERE user_id = ? AND group_id = ?")
            .bind(user_id.to_string())
            .bind(group_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        membership_from_row(&row)
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM user_groups WHERE user_id = ? AND group_id = ?")
            .bind(user_id.to_string())
            .bind(group_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_members(&self, group_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.ensure_group(group_id).await?;

        let rows = sqlx::query("SELECT user_id FROM user_groups WHERE group_id = ? ORDER BY user_id")
            .bind(group_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|r| {
                let id: String = r.get("user_id");
                Uuid::parse_str(&id).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))
            })
            .collect()
    }

    async fn create_permission(&self, code: &PermissionCode, description: Option<&str>) -> AppResult<Permission> {
        let permission = Permission {
            id: Uuid::new_v4(),
            codename: code.to_string(),
            description: description.map(str::to_string),
            created_at: utc_now(),
        };

        sqlx::query("INSERT INTO permissions (id, codename, description, created_at) VALUES (?, ?, ?, ?)")
            .bind(permission.id.to_string())
            .bind(&permission.codename)
            .bind(&permission.description)
            .bind(permission.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::conflict(format!("permission '{code}' already exists"))
                } else {
                    e.into()
                }
            })?;

        Ok(permission)
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query("SELECT id, codename, description, created_at FROM permissions ORDER BY codename")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(permission_from_row).collect()
    }

    async fn grant_group_permission(&self, group_id: Uuid, code: &PermissionCode) -> AppResult<()> {
        self.ensure_group(group_id).await?;
        let permission_id = self.permission_id(code).await?;

        sqlx::query("INSERT OR IGNORE INTO group_permissions (group_id, permission_id, created_at) VALUES (?, ?, ?)")
            .bind(group_id.to_string())
            .bind(permission_id)
            .bind(utc_now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_group_permission(&self, group_id: Uuid, code: &PermissionCode) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM group_permissions WHERE group_id = ? AND permission_id IN (SELECT id FROM permissions WHERE codename = ?)",
        )
        .bind(group_id.to_string())
        .bind(code.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn group_permissions(&self, group_id: Uuid) -> AppResult<Vec<String>> {
        self.ensure_group(group_id).await?;

        let codes = sqlx::query_scalar(
            r#"
            SELECT p.codename
            FROM permissions p
            INNER JOIN group_permissions gp ON gp.permission_id = p.id
            WHERE gp.group_id = ?
            ORDER BY p.codename
            "#,
        )
        .bind(group_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn grant_user_permission(&self, user_id: Uuid, code: &PermissionCode) -> AppResult<()> {
        self.get_user(user_id).await?;
        let permission_id = self.permission_id(code).await?;

        sqlx::query("INSERT OR IGNORE INTO user_permissions (user_id, permission_id, created_at) VALUES (?, ?, ?)")
            .bind(user_id.to_string())
            .bind(permission_id)
            .bind(utc_now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_user_permission(&self, user_id: Uuid, code: &PermissionCode) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM user_permissions WHERE user_id = ? AND permission_id IN (SELECT id FROM permissions WHERE codename = ?)",
        )
        .bind(user_id.to_string())
        .bind(code.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_locale_scope(&self, group_id: Uuid, locale: &str) -> AppResult<LocaleScope> {
        let locale = canonical_locale(locale)?;
        self.ensure_group(group_id).await?;

        let scope = LocaleScope {
            id: Uuid::new_v4(),
            group_id,
            locale,
            created_at: utc_now(),
        };

        sqlx::query("INSERT INTO locale_scopes (id, group_id, locale, created_at) VALUES (?, ?, ?, ?)")
            .bind(scope.id.to_string())
            .bind(group_id.to_string())
            .bind(&scope.locale)
            .bind(scope.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::scope_conflict(group_id, "locale", scope.locale.clone())
                } else {
                    e.into()
                }
            })?;

        Ok(scope)
    }

    async fn list_locale_scopes(&self, group_id: Uuid) -> AppResult<Vec<LocaleScope>> {
        self.ensure_group(group_id).await?;

        let rows = sqlx::query("SELECT id, group_id, locale, created_at FROM locale_scopes WHERE group_id = ? ORDER BY locale")
            .bind(group_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(locale_scope_from_row).collect()
    }

    async fn delete_locale_scope(&self, group_id: Uuid, scope_id: Uuid) -> AppResult<LocaleScope> {
        let row = sqlx::query("SELECT id, group_id, locale, created_at FROM locale_scopes WHERE id = ? AND group_id = ?")
            .bind(scope_id.to_string())
            .bind(group_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Locale scope not found"))?;
        let scope = locale_scope_from_row(&row)?;

        sqlx::query("DELETE FROM locale_scopes WHERE id = ?")
            .bind(scope_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(scope)
    }

    async fn create_section_scope(&self, group_id: Uuid, path_prefix: &str, name: &str) -> AppResult<SectionScope> {
        let path_prefix = canonical_prefix(path_prefix)?;
        self.ensure_group(group_id).await?;

        let scope = SectionScope {
            id: Uuid::new_v4(),
            group_id,
            path_prefix,
            name: name.trim().to_string(),
            created_at: utc_now(),
        };

        sqlx::query("INSERT INTO section_scopes (id, group_id, path_prefix, name, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(scope.id.to_string())
            .bind(group_id.to_string())
            .bind(&scope.path_prefix)
            .bind(&scope.name)
            .bind(scope.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::scope_conflict(group_id, "section", scope.path_prefix.clone())
                } else {
                    e.into()
                }
            })?;

        Ok(scope)
    }

    async fn list_section_scopes(&self, group_id: Uuid) -> AppResult<Vec<SectionScope>> {
        self.ensure_group(group_id).await?;

        let rows = sqlx::query(
            "SELECT id, group_id, path_prefix, name, created_at FROM section_scopes WHERE group_id = ? ORDER BY path_prefix",
        )
        .bind(group_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(section_scope_from_row).collect()
    }

    async fn delete_section_scope(&self, group_id: Uuid, scope_id: Uuid) -> AppResult<SectionScope> {
        let row = sqlx::query(
            "SELECT id, group_id, path_prefix, name, created_at FROM section_scopes WHERE id = ? AND group_id = ?",
        )
        .bind(scope_id.to_string())
        .bind(group_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Section scope not found"))?;
        let scope = section_scope_from_row(&row)?;

        sqlx::query("DELETE FROM section_scopes WHERE id = ?")
            .bind(scope_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(scope)
    }
}
