//! Segment-aware matching of content paths against section prefixes.

use crate::errors::{AppError, AppResult};

/// Strip a single trailing slash, keeping the root path `/` intact.
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Returns true when `candidate` lies inside the section rooted at `prefix`.
///
/// The root prefix (`/` or empty) matches every path. Any other prefix matches
/// the path itself and anything below it, one whole segment at a time:
/// `/blog` covers `/blog/post-1` but not `/blogpost` or `/news/blog`.
pub fn matches_path(prefix: &str, candidate: &str) -> bool {
    let prefix = normalize_path(prefix);
    if prefix.is_empty() || prefix == "/" {
        return true;
    }

    let candidate = normalize_path(candidate);
    if candidate == prefix {
        return true;
    }

    candidate
        .strip_prefix(prefix)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

/// Canonical form of a section prefix as stored in the scope tables.
///
/// `/blog` and `/blog/` name the same section, so both are stored as `/blog`
/// and collide on the `(group, path_prefix)` uniqueness constraint.
pub fn canonical_prefix(prefix: &str) -> AppResult<String> {
    let trimmed = prefix.trim();
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }
    if !trimmed.starts_with('/') {
        return Err(AppError::bad_request(format!(
            "path prefix must start with '/': {trimmed}"
        )));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(AppError::bad_request(format!(
            "path prefix must not contain whitespace: {trimmed}"
        )));
    }

    Ok(normalize_path(trimmed).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_prefix_matches_everything() {
        for candidate in ["/", "/blog", "/blog/post-1", "/a/b/c/"] {
            assert!(matches_path("/", candidate), "root should match {candidate}");
            assert!(matches_path("", candidate), "empty should match {candidate}");
        }
    }

    #[test]
    fn prefix_matches_itself_and_descendants() {
        assert!(matches_path("/blog", "/blog"));
        assert!(matches_path("/blog", "/blog/"));
        assert!(matches_path("/blog", "/blog/post-1"));
        assert!(matches_path("/blog", "/blog/category/tech"));
        assert!(matches_path("/blog/", "/blog/post-1"));
    }

    #[test]
    fn no_substring_or_unanchored_matches() {
        assert!(!matches_path("/blog", "/blogpost"));
        assert!(!matches_path("/blog", "/blog-archive/x"));
        assert!(!matches_path("/blog", "/news/blog"));
        assert!(!matches_path("/blog/tech", "/blog"));
        assert!(!matches_path("/blog", "/"));
    }

    #[test]
    fn matching_is_reflexive() {
        for p in ["/", "/blog", "/blog/category/tech", "/fr/actualites"] {
            assert!(matches_path(p, p));
        }
    }

    #[test]
    fn normalize_keeps_root() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/blog/"), "/blog");
        assert_eq!(normalize_path("/blog"), "/blog");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn canonical_prefix_rules() {
        assert_eq!(canonical_prefix("/blog/").unwrap(), "/blog");
        assert_eq!(canonical_prefix(" /blog ").unwrap(), "/blog");
        assert_eq!(canonical_prefix("/").unwrap(), "/");
        assert_eq!(canonical_prefix("").unwrap(), "/");
        assert!(canonical_prefix("blog").is_err());
        assert!(canonical_prefix("/my blog").is_err());
    }
}
