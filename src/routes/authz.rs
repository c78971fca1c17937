//! Decision endpoints: ask the policy engine whether a user may act on a
//! resource, and preview how a section prefix matches a path.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::path::canonical_prefix;
use crate::authz::{matches_path, permissions, Decision, PermissionCode, PolicyEvaluator, ResourceContext, ScopeTarget};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::store::ScopeAdmin;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/check", post(check))
        .route("/match-path", post(match_path))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckRequest {
    /// Defaults to the caller.
    pub user_id: Option<Uuid>,
    #[schema(example = "cms.change_page")]
    pub permission: String,
    #[schema(example = "en")]
    pub locale: Option<String>,
    #[schema(example = "/blog/hello-world")]
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MatchPathRequest {
    #[schema(example = "/blog")]
    pub prefix: String,
    #[schema(example = "/blog/2024/post")]
    pub path: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MatchPathResponse {
    /// Prefix as it would be stored.
    pub prefix: String,
    pub matches: bool,
}

/// Evaluate a permission for a user and an optional resource
#[utoipa::path(
    post,
    path = "/authz/check",
    tag = "Authorization",
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Decision with its reason", body = Decision),
        (status = 400, description = "Malformed permission code"),
        (status = 403, description = "Caller may not inspect other users"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn check(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CheckRequest>,
) -> AppResult<Json<Decision>> {
    let code = PermissionCode::parse(&req.permission)?;

    let principal = match req.user_id {
        None => Some(state.principal(&auth).await?),
        Some(user_id) if user_id == auth.user_id => Some(state.principal(&auth).await?),
        Some(user_id) => {
            state.require_permission(&auth, &permissions::VIEW_GROUP).await?;
            match state.store.get_user(user_id).await {
                Ok(user) => Some(user.principal()),
                Err(AppError::NotFound(_)) => None,
                Err(err) => return Err(err),
            }
        }
    };

    let mut target = ResourceContext::new();
    if let Some(locale) = req.locale {
        target = target.with_locale(locale);
    }
    if let Some(path) = req.path {
        target = target.with_path(path);
    }
    let target = (!target.is_empty()).then_some(target);

    let decision = state
        .evaluator
        .explain(principal.as_ref(), &code, target.as_ref().map(|t| t as &dyn ScopeTarget))
        .await?;

    Ok(Json(decision))
}

/// Preview whether a section prefix covers a path
#[utoipa::path(
    post,
    path = "/authz/match-path",
    tag = "Authorization",
    request_body = MatchPathRequest,
    responses(
        (status = 200, description = "Match result", body = MatchPathResponse),
        (status = 400, description = "Prefix is not an absolute path"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn match_path(_auth: AuthUser, Json(req): Json<MatchPathRequest>) -> AppResult<Json<MatchPathResponse>> {
    let prefix = canonical_prefix(&req.prefix)?;
    let matches = matches_path(&prefix, &req.path);
    Ok(Json(MatchPathResponse { prefix, matches }))
}
