use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use super::permission::PermissionCode;
use super::principal::{target_locale, target_path, Principal, ScopeTarget};
use super::resolver::{Dimension, ScopeResolver};
use crate::errors::AppResult;
use crate::store::{PermissionStore, ScopeStore};

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    NoPrincipal,
    Inactive,
    Superuser,
    MissingPermission,
    /// Base permission held and no object to scope against.
    NoTarget,
    LocaleDenied,
    SectionDenied,
    Granted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl Decision {
    fn allow(reason: DecisionReason) -> Self {
        Self { allowed: true, reason }
    }

    fn deny(reason: DecisionReason) -> Self {
        Self { allowed: false, reason }
    }
}

/// Policy evaluator trait for pluggable authorization logic
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Full decision with its reason. Lookup failures are returned as errors,
    /// never folded into a denial.
    async fn explain(
        &self,
        principal: Option<&Principal>,
        permission: &PermissionCode,
        target: Option<&dyn ScopeTarget>,
    ) -> AppResult<Decision>;

    async fn evaluate(
        &self,
        principal: Option<&Principal>,
        permission: &PermissionCode,
        target: Option<&dyn ScopeTarget>,
    ) -> AppResult<bool> {
        Ok(self.explain(principal, permission, target).await?.allowed)
    }

    /// Boolean entry point for content operations. Fails closed: a lookup
    /// error is logged and treated as a denial.
    async fn has_permission(
        &self,
        principal: Option<&Principal>,
        permission: &PermissionCode,
        target: Option<&dyn ScopeTarget>,
    ) -> bool {
        match self.evaluate(principal, permission, target).await {
            Ok(allowed) => allowed,
            Err(err) => {
                tracing::error!(
                    user_id = ?principal.map(|p| p.user_id),
                    permission = %permission,
                    error = %err,
                    "authorization lookup failed, denying"
                );
                false
            }
        }
    }
}

/// Default evaluator: model permission gate plus locale and section scopes.
///
/// Evaluation order:
/// 1. missing or inactive principal -> deny
/// 2. superuser -> allow
/// 3. no model-level permission -> deny
/// 4. no target -> allow
/// 5. scope resolver (locale AND section)
#[derive(Clone)]
pub struct ScopedPolicyEvaluator {
    permissions: Arc<dyn PermissionStore>,
    resolver: ScopeResolver,
}

impl ScopedPolicyEvaluator {
    pub fn new(permissions: Arc<dyn PermissionStore>, scopes: Arc<dyn ScopeStore>) -> Self {
        Self {
            permissions,
            resolver: ScopeResolver::new(scopes),
        }
    }

    /// Build from one store that serves both lookups.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PermissionStore + ScopeStore + 'static,
    {
        Self::new(store.clone(), store)
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }
}

#[async_trait]
impl PolicyEvaluator for ScopedPolicyEvaluator {
    async fn explain(
        &self,
        principal: Option<&Principal>,
        permission: &PermissionCode,
        target: Option<&dyn ScopeTarget>,
    ) -> AppResult<Decision> {
        // 1. Nobody, or a disabled account
        let Some(principal) = principal else {
            return Ok(Decision::deny(DecisionReason::NoPrincipal));
        };
        if !principal.is_active {
            tracing::debug!(user_id = %principal.user_id, permission = %permission, "inactive principal");
            return Ok(Decision::deny(DecisionReason::Inactive));
        }

        // 2. Superuser bypasses all checks, scopes included
        if principal.is_superuser {
            tracing::debug!(user_id = %principal.user_id, permission = %permission, "superuser bypass");
            return Ok(Decision::allow(DecisionReason::Superuser));
        }

        // 3. Model-level gate; no scope lookups without it
        if !self.permissions.has_model_permission(principal, permission).await? {
            tracing::debug!(user_id = %principal.user_id, permission = %permission, "missing model permission");
            return Ok(Decision::deny(DecisionReason::MissingPermission));
        }

        // 4. Nothing to scope against
        let Some(target) = target else {
            return Ok(Decision::allow(DecisionReason::NoTarget));
        };

        // 5. Scope dimensions
        match self.resolver.denied_dimension(principal, target).await? {
            None => {
                tracing::debug!(
                    user_id = %principal.user_id,
                    permission = %permission,
                    locale = ?target_locale(target),
                    path = ?target_path(target),
                    "scope match"
                );
                Ok(Decision::allow(DecisionReason::Granted))
            }
            Some(dimension) => {
                tracing::debug!(
                    user_id = %principal.user_id,
                    permission = %permission,
                    dimension = dimension.as_str(),
                    locale = ?target_locale(target),
                    path = ?target_path(target),
                    "scope denied"
                );
                Ok(Decision::deny(match dimension {
                    Dimension::Locale => DecisionReason::LocaleDenied,
                    Dimension::Section => DecisionReason::SectionDenied,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{permissions, ResourceContext};
    use crate::errors::AppError;
    use crate::store::{MemoryStore, ScopeAdmin};
    use uuid::Uuid;

    async fn editors_setup() -> (Arc<MemoryStore>, ScopedPolicyEvaluator, Principal) {
        let store = Arc::new(MemoryStore::new());
        let evaluator = ScopedPolicyEvaluator::from_store(store.clone());

        let user = store.create_user("editor", false, true).await.unwrap();
        let group = store.create_group("Editors").await.unwrap();
        store.add_member(group.id, user.id).await.unwrap();
        store.create_permission(&permissions::CHANGE_PAGE, None).await.unwrap();
        store.grant_group_permission(group.id, &permissions::CHANGE_PAGE).await.unwrap();
        store.create_locale_scope(group.id, "en").await.unwrap();
        store.create_section_scope(group.id, "/blog", "Blog").await.unwrap();

        (store, evaluator, user.principal())
    }

    #[tokio::test]
    async fn test_no_principal_is_denied() {
        let store = Arc::new(MemoryStore::new());
        let evaluator = ScopedPolicyEvaluator::from_store(store);

        let decision = evaluator.explain(None, &permissions::VIEW_PAGE, None).await.unwrap();
        assert_eq!(decision, Decision::deny(DecisionReason::NoPrincipal));
    }

    #[tokio::test]
    async fn test_inactive_superuser_is_denied() {
        let store = Arc::new(MemoryStore::new());
        let evaluator = ScopedPolicyEvaluator::from_store(store);
        let principal = Principal::new(Uuid::new_v4()).superuser().inactive();

        assert!(!evaluator.has_permission(Some(&principal), &permissions::VIEW_PAGE, None).await);
    }

    #[tokio::test]
    async fn test_superuser_bypasses_all() {
        let store = Arc::new(MemoryStore::new());
        let evaluator = ScopedPolicyEvaluator::from_store(store);
        let principal = Principal::new(Uuid::new_v4()).superuser();
        let target = ResourceContext::new().with_locale("fr").with_path("/anything");

        let decision = evaluator
            .explain(Some(&principal), &permissions::DELETE_PAGE, Some(&target))
            .await
            .unwrap();
        assert_eq!(decision, Decision::allow(DecisionReason::Superuser));
    }

    #[tokio::test]
    async fn test_scope_never_substitutes_for_model_permission() {
        let (_store, evaluator, principal) = editors_setup().await;
        let target = ResourceContext::new().with_locale("en").with_path("/blog/post-1");

        let decision = evaluator
            .explain(Some(&principal), &permissions::DELETE_PAGE, Some(&target))
            .await
            .unwrap();
        assert_eq!(decision, Decision::deny(DecisionReason::MissingPermission));
    }

    #[tokio::test]
    async fn test_reasons_per_dimension() {
        let (_store, evaluator, principal) = editors_setup().await;
        let p = Some(&principal);
        let code = &permissions::CHANGE_PAGE;

        let ok = ResourceContext::new().with_locale("en").with_path("/blog/post-1");
        let wrong_section = ResourceContext::new().with_locale("en").with_path("/news/x");
        let wrong_locale = ResourceContext::new().with_locale("fr").with_path("/blog/post-1");

        assert_eq!(evaluator.explain(p, code, Some(&ok)).await.unwrap().reason, DecisionReason::Granted);
        assert_eq!(
            evaluator.explain(p, code, Some(&wrong_section)).await.unwrap().reason,
            DecisionReason::SectionDenied
        );
        assert_eq!(
            evaluator.explain(p, code, Some(&wrong_locale)).await.unwrap().reason,
            DecisionReason::LocaleDenied
        );
        assert_eq!(evaluator.explain(p, code, None).await.unwrap().reason, DecisionReason::NoTarget);
    }

    #[tokio::test]
    async fn test_evaluation_is_idempotent() {
        let (_store, evaluator, principal) = editors_setup().await;
        let target = ResourceContext::new().with_locale("en").with_path("/blog");

        let first = evaluator.explain(Some(&principal), &permissions::CHANGE_PAGE, Some(&target)).await.unwrap();
        let second = evaluator.explain(Some(&principal), &permissions::CHANGE_PAGE, Some(&target)).await.unwrap();
        assert_eq!(first, second);
    }

    struct UnavailableStore;

    #[async_trait]
    impl PermissionStore for UnavailableStore {
        async fn has_model_permission(&self, _: &Principal, _: &PermissionCode) -> AppResult<bool> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[async_trait]
    impl ScopeStore for UnavailableStore {
        async fn groups_of(&self, _: &Principal) -> AppResult<Vec<Uuid>> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn locale_scopes_of(&self, _: Uuid) -> AppResult<Vec<String>> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn section_scopes_of(&self, _: Uuid) -> AppResult<Vec<String>> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_surfaces_error_and_fails_closed() {
        let evaluator = ScopedPolicyEvaluator::from_store(Arc::new(UnavailableStore));
        let principal = Principal::new(Uuid::new_v4());

        let err = evaluator
            .evaluate(Some(&principal), &permissions::VIEW_PAGE, None)
            .await
            .unwrap_err();
        assert!(err.is_infrastructure());
        assert!(!evaluator.has_permission(Some(&principal), &permissions::VIEW_PAGE, None).await);
    }

    #[tokio::test]
    async fn test_superuser_needs_no_store() {
        let evaluator = ScopedPolicyEvaluator::from_store(Arc::new(UnavailableStore));
        let principal = Principal::new(Uuid::new_v4()).superuser();
        let target = ResourceContext::new().with_path("/x");

        assert!(evaluator.has_permission(Some(&principal), &permissions::DELETE_PAGE, Some(&target)).await);
    }
}
