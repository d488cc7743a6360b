use url::Url;

/// Extracts the lower-cased host of a URL string, without its port
///
/// Returns `None` when the string is not an absolute URL or has no host.
///
/// # Examples
///
/// ```
/// use res_scan::identity::extract_host;
///
/// assert_eq!(extract_host("https://Example.com:8443/a"), Some("example.com".to_string()));
/// assert_eq!(extract_host("/relative/path"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}
