use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Model-level permission codename of the form `<namespace>.<action>`,
/// e.g. `cms.change_page`.
///
/// Codes are validated once at the boundary; the evaluator only ever sees
/// well-formed values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    /// For codes known at compile time. Callers are responsible for the format;
    /// the constants in [`crate::authz::permissions`] are covered by tests.
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    pub fn parse(code: &str) -> AppResult<Self> {
        let code = code.trim();
        let (namespace, action) = code
            .split_once('.')
            .ok_or_else(|| AppError::bad_request(format!("permission code must be '<namespace>.<action>': '{code}'")))?;

        if !is_segment(namespace) || !is_segment(action) {
            return Err(AppError::bad_request(format!(
                "invalid permission code '{code}': segments must be non-empty [a-z0-9_]"
            )));
        }

        Ok(Self(Cow::Owned(code.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> &str {
        self.0.split_once('.').map(|(ns, _)| ns).unwrap_or(&self.0)
    }

    pub fn action(&self) -> &str {
        self.0.split_once('.').map(|(_, action)| action).unwrap_or("")
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl FromStr for PermissionCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.0.into_owned()
    }
}

impl std::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::permissions;

    #[test]
    fn parses_well_formed_codes() {
        let code = PermissionCode::parse("cms.change_page").unwrap();
        assert_eq!(code.namespace(), "cms");
        assert_eq!(code.action(), "change_page");
        assert_eq!(code.to_string(), "cms.change_page");
    }

    #[test]
    fn rejects_malformed_codes() {
        for bad in ["", "cms", ".change", "cms.", "cms.change.page", "CMS.change", "cms.change page"] {
            assert!(PermissionCode::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn well_known_codes_are_valid() {
        for code in permissions::ALL {
            assert!(PermissionCode::parse(code.as_str()).is_ok(), "{code}");
        }
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: PermissionCode = serde_json::from_str("\"cms.view_page\"").unwrap();
        assert_eq!(ok, permissions::VIEW_PAGE);
        assert!(serde_json::from_str::<PermissionCode>("\"nope\"").is_err());
    }
}
