use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::events::{Loggable, Severity};
use crate::models::scope::{LocaleScope, SectionScope};

// =============================================================================
// GROUP
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Group {
    pub id: Uuid,
    #[schema(example = "Editors")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Group {
    fn entity_type() -> &'static str { "group" }
    fn subject_id(&self) -> Uuid { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GroupCreateRequest {
    #[schema(example = "Editors")]
    pub name: String,
}

/// A group with everything that hangs off it.
#[derive(Debug, Serialize, ToSchema)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<Uuid>,
    pub permissions: Vec<String>,
    pub locale_scopes: Vec<LocaleScope>,
    pub section_scopes: Vec<SectionScope>,
}

// =============================================================================
// MEMBERSHIP
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Membership {
    pub user_id: Uuid,
    pub group_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Membership {
    fn entity_type() -> &'static str { "membership" }
    fn subject_id(&self) -> Uuid { self.user_id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

// =============================================================================
// PERMISSION
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub id: Uuid,
    #[schema(example = "cms.change_page")]
    pub codename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Loggable for Permission {
    fn entity_type() -> &'static str { "permission" }
    fn subject_id(&self) -> Uuid { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionCreateRequest {
    #[schema(example = "cms.publish_page")]
    pub codename: String,
    #[schema(example = "Publish pages")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantPermissionRequest {
    #[schema(example = "cms.change_page")]
    pub codename: String,
}

/// A permission held by a group or granted directly to a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionGrant {
    /// Group id or user id, depending on `holder`.
    pub holder_id: Uuid,
    #[schema(example = "group")]
    pub holder: String,
    pub codename: String,
    pub created_at: DateTime<Utc>,
}

impl Loggable for PermissionGrant {
    fn entity_type() -> &'static str { "permission_grant" }
    fn subject_id(&self) -> Uuid { self.holder_id }
    fn severity(&self) -> Severity { Severity::Critical }
}
