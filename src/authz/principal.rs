use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// The authenticated identity an authorization decision is made for.
///
/// Group membership is not carried here; it is looked up from the scope store
/// on every evaluation so that membership changes apply to the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl Principal {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_active: true,
            is_superuser: false,
        }
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Content that lives in a locale.
pub trait Localized {
    /// `None` or an empty string means the object is not locale-bound.
    fn locale(&self) -> Option<&str>;
}

/// Content that lives at a URL path.
pub trait Sectioned {
    /// `None` or an empty string means the object has no path.
    fn path(&self) -> Option<&str>;
}

/// An object a permission is checked against.
///
/// Content types opt into each scope dimension by returning themselves from
/// the matching accessor. A type that implements neither is only subject to
/// the model-level permission check.
pub trait ScopeTarget: Send + Sync {
    fn as_localized(&self) -> Option<&dyn Localized> {
        None
    }

    fn as_sectioned(&self) -> Option<&dyn Sectioned> {
        None
    }
}

/// Locale declared by the target, if the dimension applies.
pub fn target_locale(target: &dyn ScopeTarget) -> Option<&str> {
    target
        .as_localized()
        .and_then(|localized| localized.locale())
        .filter(|locale| !locale.is_empty())
}

/// Path declared by the target, if the dimension applies.
pub fn target_path(target: &dyn ScopeTarget) -> Option<&str> {
    target
        .as_sectioned()
        .and_then(|sectioned| sectioned.path())
        .filter(|path| !path.is_empty())
}

/// Free-standing target for callers that do not have a content type at hand
/// (the HTTP check endpoint, administrative previews).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResourceContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ResourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        target_locale(self).is_none() && target_path(self).is_none()
    }
}

impl Localized for ResourceContext {
    fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}

impl Sectioned for ResourceContext {
    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl ScopeTarget for ResourceContext {
    fn as_localized(&self) -> Option<&dyn Localized> {
        Some(self)
    }

    fn as_sectioned(&self) -> Option<&dyn Sectioned> {
        Some(self)
    }
}
