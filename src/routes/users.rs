//! User administration: accounts, account flags and direct permission grants.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{permissions, PermissionCode};
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity_with_context, RequestContext};
use crate::jwt::AuthUser;
use crate::models::rbac::{GrantPermissionRequest, PermissionGrant};
use crate::models::user::{User, UserCreateRequest, UserFlagsRequest};
use crate::store::ScopeAdmin;
use crate::utils::utc_now;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/:id", get(get_user))
        .route("/:id/flags", put(update_user_flags))
        .route("/:id/permissions", post(grant_user_permission))
        .route("/:id/permissions/:code", delete(revoke_user_permission))
}

/// Create a user account
#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Caller may not administer users"),
        (status = 409, description = "User name already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(req): Json<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let caller = state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    if req.is_superuser && !caller.is_superuser {
        return Err(AppError::forbidden("Only superusers can create superusers"));
    }

    let user = state.store.create_user(&req.name, req.is_superuser, req.is_active).await?;
    tracing::info!(user_id = %user.id, is_superuser = user.is_superuser, "user created");

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &user,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    state.require_permission(&auth, &permissions::VIEW_GROUP).await?;
    Ok(Json(state.store.get_user(id).await?))
}

/// Change the active and superuser flags of a user
#[utoipa::path(
    put,
    path = "/users/{id}/flags",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserFlagsRequest,
    responses(
        (status = 200, description = "Flags updated", body = User),
        (status = 403, description = "Caller may not change these flags"),
        (status = 404, description = "User not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user_flags(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<UserFlagsRequest>,
) -> AppResult<Json<User>> {
    let caller = state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let old = state.store.get_user(id).await?;

    let touches_superuser = req.is_superuser.is_some_and(|flag| flag != old.is_superuser) || old.is_superuser;
    if touches_superuser && !caller.is_superuser {
        return Err(AppError::forbidden("Only superusers can change superuser accounts"));
    }

    let user = state.store.set_user_flags(id, req.is_superuser, req.is_active).await?;

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(auth.user_id),
        &user,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(user))
}

/// Grant a permission directly to a user
#[utoipa::path(
    post,
    path = "/users/{id}/permissions",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 201, description = "Permission granted", body = PermissionGrant),
        (status = 400, description = "Malformed permission code"),
        (status = 404, description = "User or permission not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_user_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<GrantPermissionRequest>,
) -> AppResult<(StatusCode, Json<PermissionGrant>)> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let code = PermissionCode::parse(&req.codename)?;

    state.store.grant_user_permission(id, &code).await?;

    let grant = PermissionGrant {
        holder_id: id,
        holder: "user".to_string(),
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

/// Revoke a direct user permission
#[utoipa::path(
    delete,
    path = "/users/{id}/permissions/{code}",
    tag = "Users",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("code" = String, Path, description = "Permission code, e.g. cms.change_page"),
    ),
    responses(
        (status = 204, description = "Permission revoked"),
        (status = 404, description = "User does not hold the permission directly"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_user_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((id, code)): Path<(Uuid, String)>,
) -> AppResult<StatusCode> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let code = PermissionCode::parse(&code)?;

    if !state.store.revoke_user_permission(id, &code).await? {
        return Err(AppError::not_found("Grant not found"));
    }

    let grant = PermissionGrant {
        holder_id: id,
        holder: "user".to_string(),
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
