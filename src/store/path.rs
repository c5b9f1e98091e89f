use crate::error::{Error, Result};

pub const ROOT: &str = "/";

/// Normalizes a document path to `/seg/seg` form.
pub fn normalize_path(path: &str) -> Result<String> {
    let path = path.trim();

    if path.is_empty() {
        return Err(Error::InvalidInput("path cannot be empty".to_string()));
    }

    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(Error::InvalidInput("path cannot be empty".to_string()));
    }

    for segment in &segments {
        validate_segment(segment)?;
    }

    Ok(format!("/{}", segments.join("/")))
}

/// Like [`normalize_path`], but an empty path or `/` selects the root.
pub fn normalize_prefix(prefix: &str) -> Result<String> {
    if prefix.trim().trim_matches('/').is_empty() {
        return Ok(ROOT.to_string());
    }
    normalize_path(prefix)
}

/// Returns true if `path` is `prefix` itself or lies beneath it.
/// Both arguments must already be normalized.
#[must_use]
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix == ROOT {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Last segment of a normalized path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.len() > 255 {
        return Err(Error::InvalidInput(
            "path segment cannot exceed 255 characters".to_string(),
        ));
    }

    const INVALID_CHARS: &[char] = &['\0', '\n', '\r', '\\'];
    if segment.chars().any(|c| INVALID_CHARS.contains(&c)) {
        return Err(Error::InvalidInput(
            "path segment contains invalid characters".to_string(),
        ));
    }

    if segment == "." || segment == ".." {
        return Err(Error::InvalidInput(
            "path segment cannot be a relative reference".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_basic() {
        assert_eq!(normalize_path("wiki").unwrap(), "/wiki");
        assert_eq!(normalize_path("/wiki").unwrap(), "/wiki");
        assert_eq!(normalize_path("wiki/").unwrap(), "/wiki");
        assert_eq!(normalize_path("/wiki/intro/").unwrap(), "/wiki/intro");
    }

    #[test]
    fn test_normalize_path_collapses_slashes() {
        assert_eq!(normalize_path("//wiki//intro//").unwrap(), "/wiki/intro");
    }

    #[test]
    fn test_normalize_path_rejects_bad_input() {
        assert!(normalize_path("").is_err());
        assert!(normalize_path("/").is_err());
        assert!(normalize_path("/wiki/../etc").is_err());
        assert!(normalize_path("/wiki/a\nb").is_err());
        assert!(normalize_path(&format!("/{}", "x".repeat(256))).is_err());
    }

    #[test]
    fn test_normalize_prefix_allows_root() {
        assert_eq!(normalize_prefix("").unwrap(), "/");
        assert_eq!(normalize_prefix("/").unwrap(), "/");
        assert_eq!(normalize_prefix("wiki/").unwrap(), "/wiki");
    }

    #[test]
    fn test_is_within_respects_segments() {
        assert!(is_within("/wiki", "/wiki"));
        assert!(is_within("/wiki/intro", "/wiki"));
        assert!(!is_within("/wikipedia", "/wiki"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/wiki/intro"), "intro");
        assert_eq!(file_name("/wiki"), "wiki");
    }
}
