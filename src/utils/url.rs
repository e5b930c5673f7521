//! Joining the configured backend root with endpoint paths.

/// Drop trailing slashes so endpoints can be appended with exactly one.
///
/// ```
/// use nova::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/api/"), "http://localhost:8000/api");
/// assert_eq!(normalize_base_url("http://localhost:8000/api"), "http://localhost:8000/api");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path.
///
/// The endpoint's own trailing slash is preserved; the backend routes
/// every endpoint with one.
///
/// ```
/// use nova::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/api/", "/token/refresh/"),
///     "http://localhost:8000/api/token/refresh/"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

/// Only absolute http(s) URLs with a host are usable as the backend root.
pub fn is_valid_base_url(base_url: &str) -> bool {
    let trimmed = base_url.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    matches!(rest, Some(rest) if !rest.is_empty() && !rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://nova.example/api///"),
            "https://nova.example/api"
        );
        assert_eq!(normalize_base_url(" http://localhost:8000 "), "http://localhost:8000");
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_construct_api_url() {
        assert_eq!(
            construct_api_url("http://localhost:8000/api", "login/"),
            "http://localhost:8000/api/login/"
        );
        assert_eq!(
            construct_api_url("http://localhost:8000/api/", "///chat/"),
            "http://localhost:8000/api/chat/"
        );
        assert_eq!(
            construct_api_url("https://nova.example", "profile/"),
            "https://nova.example/profile/"
        );
    }

    #[test]
    fn test_is_valid_base_url() {
        assert!(is_valid_base_url("http://localhost:8000/api"));
        assert!(is_valid_base_url("https://nova.example"));
        assert!(!is_valid_base_url("localhost:8000"));
        assert!(!is_valid_base_url("http://"));
        assert!(!is_valid_base_url("ftp://nova.example"));
        assert!(!is_valid_base_url("https:///api"));
    }
}
