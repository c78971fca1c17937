use chrono::{DateTime, Utc};

use crate::errors::{AppError, AppResult};

const MAX_LOCALE_LENGTH: usize = 35;
const MAX_NAME_LENGTH: usize = 150;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Validate a locale tag (`en`, `fr-CA`, `zh_Hant`) before it reaches the scope tables.
pub fn canonical_locale(locale: &str) -> AppResult<String> {
    let locale = locale.trim();
    if locale.is_empty() {
        return Err(AppError::bad_request("locale must not be empty"));
    }
    if locale.len() > MAX_LOCALE_LENGTH {
        return Err(AppError::bad_request(format!(
            "locale must be at most {} characters",
            MAX_LOCALE_LENGTH
        )));
    }
    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::bad_request(format!("invalid locale: {locale}")));
    }

    Ok(locale.to_string())
}

/// Trimmed, non-empty display name for users and groups.
pub fn canonical_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::bad_request(format!(
            "name must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locales() {
        assert_eq!(canonical_locale(" fr ").unwrap(), "fr");
        assert_eq!(canonical_locale("pt-BR").unwrap(), "pt-BR");
        assert!(canonical_locale("").is_err());
        assert!(canonical_locale("en us").is_err());
        assert!(canonical_locale("/en").is_err());
    }

    #[test]
    fn names() {
        assert_eq!(canonical_name("  Editors ").unwrap(), "Editors");
        assert!(canonical_name("   ").is_err());
    }
}
