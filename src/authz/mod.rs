//! Authorization module - scoped policy engine
//!
//! A decision composes three independent checks:
//! - a model-level permission (group or direct grant)
//! - a locale scope dimension
//! - a URL-path section scope dimension
//!
//! with a superuser bypass in front and deny-by-default for any applicable
//! dimension that no group of the principal covers.

mod evaluator;
pub mod path;
mod permission;
mod principal;
mod resolver;

pub use evaluator::{Decision, DecisionReason, PolicyEvaluator, ScopedPolicyEvaluator};
pub use path::matches_path;
pub use permission::PermissionCode;
pub use principal::{target_locale, target_path, Localized, Principal, ResourceContext, ScopeTarget, Sectioned};
pub use resolver::{Dimension, ScopeResolver};

/// Well-known permission codes
pub mod permissions {
    use super::PermissionCode;

    // Pages
    pub const VIEW_PAGE: PermissionCode = PermissionCode::from_static("cms.view_page");
    pub const ADD_PAGE: PermissionCode = PermissionCode::from_static("cms.add_page");
    pub const CHANGE_PAGE: PermissionCode = PermissionCode::from_static("cms.change_page");
    pub const DELETE_PAGE: PermissionCode = PermissionCode::from_static("cms.delete_page");
    pub const PUBLISH_PAGE: PermissionCode = PermissionCode::from_static("cms.publish_page");

    // Group administration
    pub const VIEW_GROUP: PermissionCode = PermissionCode::from_static("auth.view_group");
    pub const CHANGE_GROUP: PermissionCode = PermissionCode::from_static("auth.change_group");

    pub const ALL: [PermissionCode; 7] = [
        VIEW_PAGE,
        ADD_PAGE,
        CHANGE_PAGE,
        DELETE_PAGE,
        PUBLISH_PAGE,
        VIEW_GROUP,
        CHANGE_GROUP,
    ];
}
