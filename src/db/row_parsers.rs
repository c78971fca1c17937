use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::rbac::{Group, Membership, Permission};
use crate::models::scope::{LocaleScope, SectionScope};
use crate::models::user::User;

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // RFC3339 (what we write)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite default timestamp format, with optional fractional seconds
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date.and_hms_opt(0, 0, 0).ok_or_else(|| AppError::internal("invalid datetime: date out of range".to_string()))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

fn get_str(row: &SqliteRow, col: &str) -> Result<String, AppError> {
    row.try_get::<String, _>(col).map_err(|e| AppError::internal(format!("missing {}: {}", col, e)))
}

fn get_uuid(row: &SqliteRow, col: &str) -> Result<Uuid, AppError> {
    let s = get_str(row, col)?;
    Uuid::parse_str(&s).map_err(|e| AppError::internal(format!("invalid uuid in {}: {}", col, e)))
}

fn get_bool(row: &SqliteRow, col: &str) -> Result<bool, AppError> {
    row.try_get::<i64, _>(col)
        .map(|v| v != 0)
        .map_err(|e| AppError::internal(format!("missing {}: {}", col, e)))
}

fn get_datetime(row: &SqliteRow, col: &str) -> Result<DateTime<Utc>, AppError> {
    parse_datetime(&get_str(row, col)?)
}

pub fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    Ok(User {
        id: get_uuid(row, "id")?,
        name: get_str(row, "name")?,
        is_superuser: get_bool(row, "is_superuser")?,
        is_active: get_bool(row, "is_active")?,
        created_at: get_datetime(row, "created_at")?,
        updated_at: get_datetime(row, "updated_at")?,
    })
}

pub fn group_from_row(row: &SqliteRow) -> Result<Group, AppError> {
    Ok(Group {
        id: get_uuid(row, "id")?,
        name: get_str(row, "name")?,
        created_at: get_datetime(row, "created_at")?,
    })
}

pub fn membership_from_row(row: &SqliteRow) -> Result<Membership, AppError> {
    Ok(Membership {
        user_id: get_uuid(row, "user_id")?,
        group_id: get_uuid(row, "group_id")?,
        created_at: get_datetime(row, "created_at")?,
    })
}

pub fn permission_from_row(row: &SqliteRow) -> Result<Permission, AppError> {
    let description: Option<String> = row.try_get("description").map_err(|e| AppError::internal(format!("missing description: {}", e)))?;

    Ok(Permission {
        id: get_uuid(row, "id")?,
        codename: get_str(row, "codename")?,
        description,
        created_at: get_datetime(row, "created_at")?,
    })
}

pub fn locale_scope_from_row(row: &SqliteRow) -> Result<LocaleScope, AppError> {
    Ok(LocaleScope {
        id: get_uuid(row, "id")?,
        group_id: get_uuid(row, "group_id")?,
        locale: get_str(row, "locale")?,
        created_at: get_datetime(row, "created_at")?,
    })
}

pub fn section_scope_from_row(row: &SqliteRow) -> Result<SectionScope, AppError> {
    Ok(SectionScope {
        id: get_uuid(row, "id")?,
        group_id: get_uuid(row, "group_id")?,
        path_prefix: get_str(row, "path_prefix")?,
        name: get_str(row, "name")?,
        created_at: get_datetime(row, "created_at")?,
    })
}
