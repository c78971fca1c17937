use std::sync::Arc;

use axum::http::Method;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{PermissionCode, PolicyEvaluator, Principal, ScopedPolicyEvaluator};
use crate::errors::{AppError, AppResult};
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::{AuthUser, JwtConfig};
use crate::routes::{authz, groups, health, scopes, users};
use crate::store::{ScopeAdmin, SqliteStore};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub store: Arc<SqliteStore>,
    pub evaluator: Arc<ScopedPolicyEvaluator>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        let store = Arc::new(SqliteStore::new(pool.clone()));
        let evaluator = Arc::new(ScopedPolicyEvaluator::from_store(store.clone()));
        Self {
            pool,
            jwt: Arc::new(jwt),
            store,
            evaluator,
            event_bus,
        }
    }

    /// Load the caller as a principal. A token whose user no longer exists
    /// does not authenticate.
    pub async fn principal(&self, auth: &AuthUser) -> AppResult<Principal> {
        match self.store.get_user(auth.user_id).await {
            Ok(user) => Ok(user.principal()),
            Err(AppError::NotFound(_)) => Err(AppError::unauthorized("Unknown user")),
            Err(err) => Err(err),
        }
    }

    /// Gate an admin endpoint on a model-level permission.
    ///
    /// Store failures propagate as errors instead of turning into 403s.
    pub async fn require_permission(&self, auth: &AuthUser, code: &PermissionCode) -> AppResult<Principal> {
        let principal = self.principal(auth).await?;
        let decision = self.evaluator.explain(Some(&principal), code, None).await?;
        if !decision.allowed {
            tracing::info!(
                user_id = %principal.user_id,
                permission = %code,
                reason = ?decision.reason,
                "admin request denied"
            );
            return Err(AppError::forbidden(format!("Missing permission {code}")));
        }
        Ok(principal)
    }
}

pub async fn create_app(pool: SqlitePool) -> AppResult<Router> {
    let jwt_config = JwtConfig::from_env()?;
    create_app_with(pool, jwt_config).await
}

/// Build the router with an explicit token configuration.
///
/// Spawns the activity listener on the current runtime.
pub async fn create_app_with(pool: SqlitePool, jwt: JwtConfig) -> AppResult<Router> {
    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_activity_listener(rx, pool.clone()));

    let state = AppState::new(pool, jwt, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/api/health", axum::routing::get(health::health))
        .nest("/users", users::routes())
        .nest("/groups", groups::routes().merge(scopes::routes()))
        .nest("/permissions", groups::permission_routes())
        .nest("/authz", authz::routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
