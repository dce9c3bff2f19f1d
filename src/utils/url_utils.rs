//! URL validation and canonicalization.

use url::Url;

/// Check if a URL is valid and crawlable (http/https only).
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Canonicalize a URL to its natural-key form: lowercase scheme, host, and
/// path; trailing path slash stripped; query and fragment dropped.
///
/// `canon(canon(u)) == canon(u)` for any valid http(s) URL.
#[must_use]
pub fn canonicalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    parsed.set_fragment(None);
    parsed.set_query(None);

    let scheme = parsed.scheme().to_lowercase();
    let host = parsed.host_str()?.to_lowercase();
    let mut path = parsed.path().to_lowercase();
    if path.len() > 1 && path.ends_with('/') {
        path.truncate(path.len() - 1);
    }

    let port_part = match (scheme.as_str(), parsed.port()) {
        ("http", Some(80)) | ("https", Some(443)) | (_, None) => String::new(),
        (_, Some(p)) => format!(":{p}"),
    };

    Some(format!("{scheme}://{host}{port_part}{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_scheme_host_and_strips_query_fragment() {
        let input = "HTTPS://Developer.Apple.COM/Documentation/SwiftUI/?q=1#top";
        assert_eq!(
            canonicalize_url(input).as_deref(),
            Some("https://developer.apple.com/documentation/swiftui")
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let input = "HTTPS://Developer.Apple.COM/Documentation/SwiftUI/?q=1#top";
        let once = canonicalize_url(input).unwrap();
        let twice = canonicalize_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!is_valid_url("javascript:alert(1)"));
        assert!(!is_valid_url("mailto:a@b.com"));
        assert!(!is_valid_url(""));
        assert!(is_valid_url("https://example.com"));
    }

    #[test]
    fn canonicalize_rejects_non_http_schemes() {
        assert_eq!(canonicalize_url("ftp://example.com/x"), None);
    }

    #[test]
    fn root_path_keeps_single_slash() {
        assert_eq!(
            canonicalize_url("https://example.com/").as_deref(),
            Some("https://example.com/")
        );
    }
}
