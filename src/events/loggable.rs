use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity levels for audit entries.
/// Controls retention policies and log filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Critical events: long-term retention, never auto-delete
    Critical,
    /// Important events: medium-term retention (default)
    Important,
    /// Noise events: aggressively trimmed (e.g., 7 days)
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Important
    }
}

/// Trait for entities that can be logged in the activity log.
/// Implement this trait on any model to enable declarative activity logging.
pub trait Loggable: Serialize + Send + Sync {
    /// The entity type name (e.g., "group", "locale_scope", "user")
    /// This becomes the prefix in event names like "group.created"
    fn entity_type() -> &'static str;

    /// The subject ID (usually the entity's primary key)
    fn subject_id(&self) -> Uuid;

    /// Severity level for logs (defaults to Important)
    fn severity(&self) -> Severity {
        Severity::Important
    }

    /// Override severity based on action. Removals and revocations are always
    /// Critical since they change who can act on what.
    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" | "revoked" | "removed" => Severity::Critical,
            _ => self.severity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Note;

    impl Loggable for Note {
        fn entity_type() -> &'static str { "note" }
        fn subject_id(&self) -> Uuid { Uuid::nil() }
    }

    #[test]
    fn removals_escalate_to_critical() {
        assert_eq!(Note.severity_for_action("created"), Severity::Important);
        assert_eq!(Note.severity_for_action("revoked"), Severity::Critical);
        assert_eq!(Note.severity_for_action("deleted"), Severity::Critical);
        assert_eq!(Severity::Critical.as_str(), "critical");
    }
}
