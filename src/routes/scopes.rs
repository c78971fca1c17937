//! Locale and section scope administration, nested under `/groups/{id}`.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get},
    Json, Router,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::permissions;
use crate::errors::AppResult;
use crate::events::{log_activity_with_context, RequestContext};
use crate::jwt::AuthUser;
use crate::models::scope::{LocaleScope, LocaleScopeCreateRequest, SectionScope, SectionScopeCreateRequest};
use crate::store::ScopeAdmin;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:id/locale-scopes", get(list_locale_scopes).post(create_locale_scope))
        .route("/:id/locale-scopes/:scope_id", delete(delete_locale_scope))
        .route("/:id/section-scopes", get(list_section_scopes).post(create_section_scope))
        .route("/:id/section-scopes/:scope_id", delete(delete_section_scope))
}

/// List the locale scopes of a group
#[utoipa::path(
    get,
    path = "/groups/{id}/locale-scopes",
    tag = "Scopes",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Locale scopes", body = Vec<LocaleScope>),
        (status = 404, description = "Group not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_locale_scopes(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<LocaleScope>>> {
    state.require_permission(&auth, &permissions::VIEW_GROUP).await?;
    Ok(Json(state.store.list_locale_scopes(id).await?))
}

/// Allow a group to act on one locale
#[utoipa::path(
    post,
    path = "/groups/{id}/locale-scopes",
    tag = "Scopes",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = LocaleScopeCreateRequest,
    responses(
        (status = 201, description = "Locale scope added", body = LocaleScope),
        (status = 400, description = "Malformed locale"),
        (status = 404, description = "Group not found"),
        (status = 409, description = "The group already has this locale"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_locale_scope(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<LocaleScopeCreateRequest>,
) -> AppResult<(StatusCode, Json<LocaleScope>)> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let scope = state.store.create_locale_scope(id, &req.locale).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &scope,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(scope)))
}

/// Remove a locale scope from a group
#[utoipa::path(
    delete,
    path = "/groups/{id}/locale-scopes/{scope_id}",
    tag = "Scopes",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("scope_id" = Uuid, Path, description = "Locale scope ID"),
    ),
    responses(
        (status = 204, description = "Locale scope removed"),
        (status = 404, description = "Scope not found in this group"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_locale_scope(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((id, scope_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let scope = state.store.delete_locale_scope(id, scope_id).await?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(auth.user_id),
        &scope,
        Some(&scope),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

/// List the section scopes of a group
#[utoipa::path(
    get,
    path = "/groups/{id}/section-scopes",
    tag = "Scopes",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Section scopes", body = Vec<SectionScope>),
        (status = 404, description = "Group not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_section_scopes(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<SectionScope>>> {
    state.require_permission(&auth, &permissions::VIEW_GROUP).await?;
    Ok(Json(state.store.list_section_scopes(id).await?))
}

/// Allow a group to act below one URL path prefix
#[utoipa::path(
    post,
    path = "/groups/{id}/section-scopes",
    tag = "Scopes",
    params(("id" = Uuid, Path, description = "Group ID")),
    request_body = SectionScopeCreateRequest,
    responses(
        (status = 201, description = "Section scope added", body = SectionScope),
        (status = 400, description = "Prefix is not an absolute path"),
        (status = 404, description = "Group not found"),
        (status = 409, description = "The group already has this prefix"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_section_scope(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(req): Json<SectionScopeCreateRequest>,
) -> AppResult<(StatusCode, Json<SectionScope>)> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let name = req.name.as_deref().unwrap_or_default();
    let scope = state.store.create_section_scope(id, &req.path_prefix, name).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(auth.user_id),
        &scope,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(scope)))
}

/// Remove a section scope from a group
#[utoipa::path(
    delete,
    path = "/groups/{id}/section-scopes/{scope_id}",
    tag = "Scopes",
    params(
        ("id" = Uuid, Path, description = "Group ID"),
        ("scope_id" = Uuid, Path, description = "Section scope ID"),
    ),
    responses(
        (status = 204, description = "Section scope removed"),
        (status = 404, description = "Scope not found in this group"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_section_scope(
    State(state): State<AppState>,
    auth: AuthUser,
    headers: HeaderMap,
    Path((id, scope_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.require_permission(&auth, &permissions::CHANGE_GROUP).await?;
    let scope = state.store.delete_section_scope(id, scope_id).await?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(auth.user_id),
        &scope,
        Some(&scope),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}
