use url::Url;

/// Normalizes an absolute URL into its identity form
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed (including unparsable ports)
/// 2. Accept only `http` and `https`
/// 3. Require a non-empty host; hosts are lower-cased
/// 4. Drop the port when it is the scheme default, keep it otherwise
/// 5. Empty path becomes `/`
/// 6. Keep the query string untouched
/// 7. Drop the fragment and any user-info
///
/// Rejection is not an error: callers skip candidates that return `None`.
///
/// # Examples
///
/// ```
/// use res_scan::identity::normalize_identity_url;
///
/// let url = normalize_identity_url("HTTPS://CDN.Example.com:443/app.js?v=2#top").unwrap();
/// assert_eq!(url, "https://cdn.example.com/app.js?v=2");
///
/// assert!(normalize_identity_url("https://example.com:blank/app.js").is_none());
/// ```
pub fn normalize_identity_url(url_str: &str) -> Option<String> {
    let url = Url::parse(url_str.trim()).ok()?;
    canonicalize(url)
}

/// Resolves a possibly relative reference against a page URL, then normalizes it
///
/// # Arguments
///
/// * `candidate` - Raw attribute value (absolute, protocol-relative or relative)
/// * `base` - The page the reference was found on
pub fn resolve_identity_url(candidate: &str, base: &Url) -> Option<String> {
    let url = base.join(candidate.trim()).ok()?;
    canonicalize(url)
}

/// Reduces a URL to `scheme://host[:port]`, the identity of a scanned site
///
/// # Examples
///
/// ```
/// use res_scan::identity::normalize_site_origin;
///
/// assert_eq!(
///     normalize_site_origin("https://Example.com/path?a=1#x").as_deref(),
///     Some("https://example.com")
/// );
/// ```
pub fn normalize_site_origin(url_str: &str) -> Option<String> {
    let normalized = normalize_identity_url(url_str)?;
    let url = Url::parse(&normalized).ok()?;
    let host = url.host_str()?;

    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

fn canonicalize(mut url: Url) -> Option<String> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    // The url crate lower-cases hosts and strips default ports for special schemes
    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return None,
    }

    url.set_fragment(None);
    url.set_username("").ok()?;
    url.set_password(None).ok()?;

    if url.path().is_empty() {
        url.set_path("/");
    }

    Some(url.into())
}
