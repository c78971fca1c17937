//! Group administration API
//!
//! Groups, their members and their permission grants, plus the permission
//! catalogue. All modifications are logged to the activity log with Critical
//! severity.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{permissions, PermissionCode};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::jwt::AuthUser;
use crate::models::rbac::*;
use crate::store::ScopeAdmin;
use crate::utils::utc_now;

// =============================================================================
// ROUTERS
// =============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/:id", get(get_group).delete(delete_group))
        .route("/:id/members", post(add_member))
        .route("/:id/members/:user_id", delete(remove_member))
        .route("/:id/permissions", post(grant_group_permission))
        .route("/:id/permissions/:code", delete(revoke_group_permission))
}

pub fn permission_routes() -> Router<AppState> {
    Router::new().route("/", get(list_permissions).post(create_permission))
}

// =============================================================================
// GROUP ENDPOINTS
// =============================================================================

/// List all groups
#[utoipa::path(
    get,
    path = "/groups",
    tag = "Groups",
    responses((status = 200, description = "List of groups", body = Vec<Group>)),
    security(("bearerAuth" = []))
)]
pub async fn list_groups(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Group>>> {
    state.require_permission(&auth, &permissions::VIEW_GROUP).await?;
    Ok(Json(state.store.list_groups().await?))
}

/// Create a new group
#[utoipa::path(
    post,
    path = "/groups",
    tag = "Groups",
    request_body = GroupCreateRequest,
    responses(
        (status = 201, description = "Group created", body = Group),
        (status = 409, description = "Group name already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(req): Json<GroupCreateRequest>,
) -> AppResult<(StatusCode, Json<Group>)> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let group = state.store.create_group(&req.name).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &group,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(group)))
}

/// Get a group with its members, permissions and scopes
#[utoipa::path(
    get,
    path = "/groups/{id}",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group details", body = GroupDetail),
        (status = 404, description = "Group not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GroupDetail>> {
    state.require_permission(&auth, &permissions::VIEW_GROUP).await?;

    let group = state.store.get_group(id).await?;
    let detail = GroupDetail {
        members: state.store.list_members(id).await?,
        permissions: state.store.group_permissions(id).await?,
        locale_scopes: state.store.list_locale_scopes(id).await?,
        section_scopes: state.store.list_section_scopes(id).await?,
        group,
    };

    Ok(Json(detail))
}

/// Delete a group together with its memberships, grants and scopes
#[utoipa::path(
    delete,
    path = "/groups/{id}",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 404, description = "Group not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_group(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let group = state.store.delete_group(id).await?;
    tracing::info!(group_id = %group.id, name = %group.name, "group deleted");

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(auth.user_id),
        &group,
        Some(&group),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// MEMBERSHIP ENDPOINTS
// =============================================================================

/// Add a user to a group
#[utoipa::path(
    post,
    path = "/groups/{id}/members",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Membership recorded", body = Membership),
        (status = 404, description = "Group or user not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<Membership>)> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let membership = state.store.add_member(id, req.user_id).await?;

    log_activity_with_context(
        &state.event_bus,
        "added",
        Some(auth.user_id),
        &membership,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(membership)))
}

/// Remove a user from a group
#[utoipa::path(
    delete,
    path = "/groups/{id}/members/{user_id}",
    tag = "Groups",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("user_id" = Uuid, Path, description = "User ID"),
    ),
    responses(
        (status = 204, description = "Membership removed"),
        (status = 404, description = "User is not a member"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    if !state.store.remove_member(id, user_id).await? {
        return Err(AppError::not_found("Membership not found"));
    }

    let membership = Membership {
        user_id,
        group_id: id,
        created_at: utc_now(),
    };
    log_activity_with_context(
        &state.event_bus,
        "removed",
        Some(auth.user_id),
        &membership,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// GROUP PERMISSION ENDPOINTS
// =============================================================================

/// Grant a permission to a group
#[utoipa::path(
    post,
    path = "/groups/{id}/permissions",
    tag = "Groups",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 201, description = "Permission granted", body = PermissionGrant),
        (status = 400, description = "Malformed permission code"),
        (status = 404, description = "Group or permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_group_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<GrantPermissionRequest>,
) -> AppResult<(StatusCode, Json<PermissionGrant>)> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let code = PermissionCode::parse(&req.codename)?;
    state.store.grant_group_permission(id, &code).await?;

    let grant = PermissionGrant {
        holder_id: id,
        holder: "group".to_string(),
        codename: code.to_string(),
        created_at: utc_now(),
    };

    log_activity_with_context(
        &state.event_bus,
        "granted",
        Some(auth.user_id),
        &grant,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(grant)))
}

/// Revoke a permission from a group
#[utoipa::path(
    delete,
    path = "/groups/{id}/permissions/{code}",
    tag = "Groups",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("code" = String, Path, description = "Permission code"),
    ),
    responses(
        (status = 204, description = "Permission revoked"),
        (status = 404, description = "Group does not hold the permission"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_group_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((id, code)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let code = PermissionCode::parse(&code)?;

    if !state.store.revoke_group_permission(id, &code).await? {
        return Err(AppError::not_found("Grant not found"));
    }

    let grant = PermissionGrant {
        holder_id: id,
        holder: "group".to_string(),
        codename: code.to_string(),
        created_at: utc_now(),
    };
    log_activity_with_context(
        &state.event_bus,
        "revoked",
        Some(auth.user_id),
        &grant,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// PERMISSION CATALOGUE
// =============================================================================

/// List all known permissions
#[utoipa::path(
    get,
    path = "/permissions",
    tag = "Permissions",
    responses((status = 200, description = "List of permissions", body = Vec<Permission>)),
    security(("bearerAuth" = []))
)]
pub async fn list_permissions(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Permission>>> {
    state.require_permission(&auth, &permissions::VIEW_GROUP).await?;
    Ok(Json(state.store.list_permissions().await?))
}

/// Define a new permission code
#[utoipa::path(
    post,
    path = "/permissions",
    tag = "Permissions",
    request_body = PermissionCreateRequest,
    responses(
        (status = 201, description = "Permission created", body = Permission),
        (status = 400, description = "Malformed permission code"),
        (status = 409, description = "Permission already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(req): Json<PermissionCreateRequest>,
) -> AppResult<(StatusCode, Json<Permission>)> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let code = PermissionCode::parse(&req.codename)?;
    let permission = state.store.create_permission(&code, req.description.as_deref()).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &permission,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(permission)))
}
