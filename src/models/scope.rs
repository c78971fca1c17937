use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::events::{Loggable, Severity};

// =============================================================================
// LOCALE SCOPE
// =============================================================================

/// Members of `group_id` may act on content in `locale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocaleScope {
    pub id: Uuid,
    pub group_id: Uuid,
    #[schema(example = "fr")]
    pub locale: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for LocaleScope {
    fn entity_type() -> &'static str { "locale_scope" }
    fn subject_id(&self) -> Uuid { self.group_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LocaleScopeCreateRequest {
    #[schema(example = "en")]
    pub locale: String,
}

// =============================================================================
// SECTION SCOPE
// =============================================================================

/// Members of `group_id` may act on content whose path falls under `path_prefix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SectionScope {
    pub id: Uuid,
    pub group_id: Uuid,
    #[schema(example = "/blog")]
    pub path_prefix: String,
    /// Descriptive label only; never consulted by the resolver.
    #[schema(example = "Blog")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for SectionScope {
    fn entity_type() -> &'static str { "section_scope" }
    fn subject_id(&self) -> Uuid { self.group_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SectionScopeCreateRequest {
    #[schema(example = "/blog")]
    pub path_prefix: String,
    #[serde(default)]
    #[schema(example = "Blog")]
    pub name: Option<String>,
}
