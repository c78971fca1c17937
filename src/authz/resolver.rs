use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::path::matches_path;
use super::principal::{target_locale, target_path, Principal, ScopeTarget};
use crate::errors::AppResult;
use crate::store::ScopeStore;

/// One of the two independent restriction axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Locale,
    Section,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Locale => "locale",
            Dimension::Section => "section",
        }
    }
}

/// Resolves the locale and section dimensions for a principal and a target.
///
/// Each dimension is a union over all of the principal's groups, and the two
/// unions are combined with AND. The locale match and the section match may
/// come from different groups. An applicable dimension with no matching row
/// denies, even when none of the groups has any rows of that kind.
#[derive(Clone)]
pub struct ScopeResolver {
    store: Arc<dyn ScopeStore>,
}

impl ScopeResolver {
    pub fn new(store: Arc<dyn ScopeStore>) -> Self {
        Self { store }
    }

    pub async fn locale_access(&self, principal: &Principal, target: &dyn ScopeTarget) -> AppResult<bool> {
        let Some(locale) = target_locale(target) else {
            return Ok(true);
        };
        let groups = self.store.groups_of(principal).await?;
        self.any_group_has_locale(&groups, locale).await
    }

    pub async fn section_access(&self, principal: &Principal, target: &dyn ScopeTarget) -> AppResult<bool> {
        let Some(path) = target_path(target) else {
            return Ok(true);
        };
        let groups = self.store.groups_of(principal).await?;
        self.any_group_covers_path(&groups, path).await
    }

    pub async fn scope_access(&self, principal: &Principal, target: &dyn ScopeTarget) -> AppResult<bool> {
        Ok(self.denied_dimension(principal, target).await?.is_none())
    }

    /// First dimension that denies access, or `None` when both pass.
    ///
    /// Memberships are fetched once and only when at least one dimension applies.
    pub async fn denied_dimension(&self, principal: &Principal, target: &dyn ScopeTarget) -> AppResult<Option<Dimension>> {
        let locale = target_locale(target);
        let path = target_path(target);
        if locale.is_none() && path.is_none() {
            return Ok(None);
        }

        let groups = self.store.groups_of(principal).await?;

        if let Some(locale) = locale {
            if !self.any_group_has_locale(&groups, locale).await? {
                return Ok(Some(Dimension::Locale));
            }
        }

        if let Some(path) = path {
            if !self.any_group_covers_path(&groups, path).await? {
                return Ok(Some(Dimension::Section));
            }
        }

        Ok(None)
    }

    async fn any_group_has_locale(&self, groups: &[Uuid], locale: &str) -> AppResult<bool> {
        for group_id in groups {
            let locales = self.store.locale_scopes_of(*group_id).await?;
            if locales.iter().any(|l| l == locale) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn any_group_covers_path(&self, groups: &[Uuid], path: &str) -> AppResult<bool> {
        for group_id in groups {
            let prefixes = self.store.section_scopes_of(*group_id).await?;
            if prefixes.iter().any(|prefix| matches_path(prefix, path)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::ResourceContext;
    use crate::store::{MemoryStore, ScopeAdmin};

    async fn setup() -> (Arc<MemoryStore>, ScopeResolver) {
        let store = Arc::new(MemoryStore::new());
        let resolver = ScopeResolver::new(store.clone());
        (store, resolver)
    }

    #[tokio::test]
    async fn inapplicable_dimensions_pass() {
        let (store, resolver) = setup().await;
        let user = store.create_user("nobody", false, true).await.unwrap();
        let principal = user.principal();

        let target = ResourceContext::new();
        assert!(resolver.locale_access(&principal, &target).await.unwrap());
        assert!(resolver.section_access(&principal, &target).await.unwrap());
        assert!(resolver.scope_access(&principal, &target).await.unwrap());
    }

    #[tokio::test]
    async fn unconfigured_dimension_denies() {
        let (store, resolver) = setup().await;
        let user = store.create_user("ada", false, true).await.unwrap();
        let group = store.create_group("Locale only").await.unwrap();
        store.add_member(group.id, user.id).await.unwrap();
        store.create_locale_scope(group.id, "en").await.unwrap();
        let principal = user.principal();

        let target = ResourceContext::new().with_locale("en").with_path("/blog/x");
        assert!(resolver.locale_access(&principal, &target).await.unwrap());
        assert!(!resolver.section_access(&principal, &target).await.unwrap());
        assert_eq!(
            resolver.denied_dimension(&principal, &target).await.unwrap(),
            Some(Dimension::Section)
        );
    }

    #[tokio::test]
    async fn dimensions_union_across_groups() {
        let (store, resolver) = setup().await;
        let user = store.create_user("ada", false, true).await.unwrap();
        let french = store.create_group("FrenchTeam").await.unwrap();
        let blog = store.create_group("BlogTeam").await.unwrap();
        store.add_member(french.id, user.id).await.unwrap();
        store.add_member(blog.id, user.id).await.unwrap();
        store.create_locale_scope(french.id, "fr").await.unwrap();
        store.create_section_scope(blog.id, "/blog", "Blog").await.unwrap();
        let principal = user.principal();

        let target = ResourceContext::new().with_locale("fr").with_path("/blog/x");
        assert!(resolver.scope_access(&principal, &target).await.unwrap());

        let wrong_locale = ResourceContext::new().with_locale("de").with_path("/blog/x");
        assert_eq!(
            resolver.denied_dimension(&principal, &wrong_locale).await.unwrap(),
            Some(Dimension::Locale)
        );
    }

    #[tokio::test]
    async fn other_users_groups_do_not_count() {
        let (store, resolver) = setup().await;
        let ada = store.create_user("ada", false, true).await.unwrap();
        let bob = store.create_user("bob", false, true).await.unwrap();
        let group = store.create_group("Editors").await.unwrap();
        store.add_member(group.id, bob.id).await.unwrap();
        store.create_locale_scope(group.id, "en").await.unwrap();

        let target = ResourceContext::new().with_locale("en");
        assert!(!resolver.locale_access(&ada.principal(), &target).await.unwrap());
        assert!(resolver.locale_access(&bob.principal(), &target).await.unwrap());
    }
}
