mod common;

use anyhow::Result;
use uuid::Uuid;

use cms_scopes::authz::{
    permissions, DecisionReason, Localized, PolicyEvaluator, Principal, ResourceContext, ScopeTarget, Sectioned,
};
use cms_scopes::errors::AppError;
use cms_scopes::store::ScopeAdmin;

use common::{active_user, engine, TestDb};

/// A CMS page: bound to a locale and published under a URL path.
struct Page {
    locale: String,
    url_path: String,
}

impl Localized for Page {
    fn locale(&self) -> Option<&str> {
        Some(&self.locale)
    }
}

impl Sectioned for Page {
    fn path(&self) -> Option<&str> {
        Some(&self.url_path)
    }
}

impl ScopeTarget for Page {
    fn as_localized(&self) -> Option<&dyn Localized> {
        Some(self)
    }

    fn as_sectioned(&self) -> Option<&dyn Sectioned> {
        Some(self)
    }
}

/// Shared media: neither localized nor placed under a section.
struct Asset;

impl ScopeTarget for Asset {}

fn page(locale: &str, path: &str) -> Page {
    Page {
        locale: locale.to_string(),
        url_path: path.to_string(),
    }
}

#[tokio::test]
async fn editors_are_confined_to_their_locale_and_section() -> Result<()> {
    let db = TestDb::new().await?;
    let (store, evaluator) = engine(&db).await?;

    let editors = store.create_group("Editors").await?;
    store.create_locale_scope(editors.id, "en").await?;
    store.create_section_scope(editors.id, "/blog", "Blog").await?;
    store.grant_group_permission(editors.id, &permissions::CHANGE_PAGE).await?;
    let u = active_user(&store, "u").await?;
    store.add_member(editors.id, u.user_id).await?;

    let code = &permissions::CHANGE_PAGE;
    assert!(evaluator.has_permission(Some(&u), code, Some(&page("en", "/blog/post-1"))).await);
    assert!(!evaluator.has_permission(Some(&u), code, Some(&page("en", "/news/x"))).await);
    assert!(!evaluator.has_permission(Some(&u), code, Some(&page("fr", "/blog/post-1"))).await);

    // prefix-anchored: "/blogger" is not under "/blog"
    assert!(!evaluator.has_permission(Some(&u), code, Some(&page("en", "/blogger"))).await);

    Ok(())
}

#[tokio::test]
async fn dimensions_may_be_satisfied_by_different_groups() -> Result<()> {
    let db = TestDb::new().await?;
    let (store, evaluator) = engine(&db).await?;

    let french = store.create_group("FrenchTeam").await?;
    store.create_locale_scope(french.id, "fr").await?;
    let blog = store.create_group("BlogTeam").await?;
    store.create_section_scope(blog.id, "/blog", "Blog").await?;
    store.grant_group_permission(blog.id, &permissions::CHANGE_PAGE).await?;

    let u = active_user(&store, "u").await?;
    store.add_member(french.id, u.user_id).await?;
    store.add_member(blog.id, u.user_id).await?;

    assert!(
        evaluator
            .has_permission(Some(&u), &permissions::CHANGE_PAGE, Some(&page("fr", "/blog/x")))
            .await
    );

    let decision = evaluator
        .explain(Some(&u), &permissions::CHANGE_PAGE, Some(&page("de", "/blog/x")))
        .await?;
    assert_eq!(decision.reason, DecisionReason::LocaleDenied);

    Ok(())
}

#[tokio::test]
async fn scope_changes_take_effect_immediately() -> Result<()> {
    let db = TestDb::new().await?;
    let (store, evaluator) = engine(&db).await?;

    let group = store.create_group("Writers").await?;
    store.grant_group_permission(group.id, &permissions::CHANGE_PAGE).await?;
    let u = active_user(&store, "u").await?;
    store.add_member(group.id, u.user_id).await?;

    let localized = ResourceContext::new().with_locale("en");
    let code = &permissions::CHANGE_PAGE;

    assert!(!evaluator.has_permission(Some(&u), code, Some(&localized)).await);

    let scope = store.create_locale_scope(group.id, "en").await?;
    assert!(evaluator.has_permission(Some(&u), code, Some(&localized)).await);

    store.delete_locale_scope(group.id, scope.id).await?;
    assert!(!evaluator.has_permission(Some(&u), code, Some(&localized)).await);

    Ok(())
}

#[tokio::test]
async fn superuser_passes_without_any_scope_rows() -> Result<()> {
    let db = TestDb::new().await?;
    let (store, evaluator) = engine(&db).await?;

    let admin = store.create_user("a", true, true).await?.principal();

    assert!(
        evaluator
            .has_permission(Some(&admin), &permissions::DELETE_PAGE, Some(&page("fr", "/anything")))
            .await
    );

    Ok(())
}

#[tokio::test]
async fn unscoped_object_only_needs_the_model_permission() -> Result<()> {
    let db = TestDb::new().await?;
    let (store, evaluator) = engine(&db).await?;

    let group = store.create_group("Media").await?;
    store.grant_group_permission(group.id, &permissions::VIEW_PAGE).await?;
    let u = active_user(&store, "u").await?;
    store.add_member(group.id, u.user_id).await?;

    let decision = evaluator.explain(Some(&u), &permissions::VIEW_PAGE, Some(&Asset)).await?;
    assert!(decision.allowed);
    assert!(evaluator.resolver().scope_access(&u, &Asset).await?);

    // empty attribute values count as absent
    assert!(
        evaluator
            .has_permission(Some(&u), &permissions::VIEW_PAGE, Some(&page("", "")))
            .await
    );

    Ok(())
}

#[tokio::test]
async fn duplicate_locale_scope_is_rejected() -> Result<()> {
    let db = TestDb::new().await?;
    let (store, _evaluator) = engine(&db).await?;

    let editors = store.create_group("Editors").await?;
    store.create_locale_scope(editors.id, "en").await?;

    let err = store.create_locale_scope(editors.id, "en").await.unwrap_err();
    assert!(matches!(err, AppError::ScopeConflict { dimension: "locale", .. }), "got {err:?}");
    assert_eq!(store.list_locale_scopes(editors.id).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn direct_user_grant_counts_as_model_permission() -> Result<()> {
    let db = TestDb::new().await?;
    let (store, evaluator) = engine(&db).await?;

    let group = store.create_group("Blog").await?;
    store.create_section_scope(group.id, "/blog", "").await?;
    let u = active_user(&store, "u").await?;
    store.add_member(group.id, u.user_id).await?;

    let target = ResourceContext::new().with_path("/blog/a");
    assert!(!evaluator.has_permission(Some(&u), &permissions::PUBLISH_PAGE, Some(&target)).await);

    store.grant_user_permission(u.user_id, &permissions::PUBLISH_PAGE).await?;
    assert!(evaluator.has_permission(Some(&u), &permissions::PUBLISH_PAGE, Some(&target)).await);

    Ok(())
}

#[tokio::test]
async fn absent_and_inactive_principals_are_denied() -> Result<()> {
    let db = TestDb::new().await?;
    let (store, evaluator) = engine(&db).await?;

    let group = store.create_group("Editors").await?;
    store.grant_group_permission(group.id, &permissions::VIEW_PAGE).await?;
    let user = store.create_user("dormant", true, true).await?;
    store.add_member(group.id, user.id).await?;

    assert!(!evaluator.has_permission(None, &permissions::VIEW_PAGE, None).await);

    let user = store.set_user_flags(user.id, None, Some(false)).await?;
    let decision = evaluator.explain(Some(&user.principal()), &permissions::VIEW_PAGE, None).await?;
    assert_eq!(decision.reason, DecisionReason::Inactive);

    // a principal whose id has no row holds nothing
    let stranger = Principal::new(Uuid::new_v4());
    assert!(!evaluator.has_permission(Some(&stranger), &permissions::VIEW_PAGE, None).await);

    Ok(())
}
