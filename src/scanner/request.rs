//! Scan request input and validation

use crate::extract::{AssetFilter, ResourceType};
use crate::RequestError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEPTH_RANGE: (u32, u32) = (1, 12);
pub const MAX_PAGES_RANGE: (u32, u32) = (1, 200_000);
pub const TIMEOUT_RANGE: (u32, u32) = (1, 180);

/// Input of one scan
///
/// Deserializes with the same defaults as [`ScanRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub base_url: String,

    /// Allowed resource types; `None` or empty means all
    #[serde(default)]
    pub resource_types: Option<Vec<ResourceType>>,

    #[serde(default = "default_depth")]
    pub depth: u32,

    #[serde(default)]
    pub include_regex: Option<String>,

    #[serde(default)]
    pub exclude_regex: Option<String>,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,

    #[serde(default = "default_true")]
    pub follow_redirects: bool,

    #[serde(default = "default_true")]
    pub respect_robots: bool,
}

fn default_depth() -> u32 {
    4
}

fn default_max_pages() -> u32 {
    5000
}

fn default_timeout_seconds() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

/// A request that passed validation, with its compiled filter
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub request: ScanRequest,
    pub filter: AssetFilter,
}

impl ScanRequest {
    /// Creates a request for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            resource_types: None,
            depth: default_depth(),
            include_regex: None,
            exclude_regex: None,
            max_pages: default_max_pages(),
            timeout_seconds: default_timeout_seconds(),
            follow_redirects: true,
            respect_robots: true,
        }
    }

    /// Validates the request
    ///
    /// The base URL is trimmed, duplicate resource types are collapsed and an
    /// empty type list becomes `None`. Regex patterns are compiled once here.
    ///
    /// # Returns
    ///
    /// * `Ok(ValidatedRequest)` - The normalized request and its asset filter
    /// * `Err(RequestError)` - The first problem found
    pub fn validate(&self) -> Result<ValidatedRequest, RequestError> {
        let base_url = validate_base_url(&self.base_url)?;

        check_range("depth", self.depth, DEPTH_RANGE)?;
        check_range("max_pages", self.max_pages, MAX_PAGES_RANGE)?;
        check_range("timeout_seconds", self.timeout_seconds, TIMEOUT_RANGE)?;

        let include = compile_pattern("include_regex", self.include_regex.as_deref())?;
        let exclude = compile_pattern("exclude_regex", self.exclude_regex.as_deref())?;

        let resource_types = self.resource_types.as_ref().and_then(|types| {
            let mut unique: Vec<ResourceType> = Vec::with_capacity(types.len());
            for t in types {
                if !unique.contains(t) {
                    unique.push(*t);
                }
            }
            (!unique.is_empty()).then_some(unique)
        });

        let filter = AssetFilter {
            include,
            exclude,
            resource_types: resource_types
                .as_ref()
                .map(|types| types.iter().copied().collect()),
        };

        Ok(ValidatedRequest {
            request: ScanRequest {
                base_url,
                resource_types,
                ..self.clone()
            },
            filter,
        })
    }
}

fn validate_base_url(raw: &str) -> Result<String, RequestError> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(RequestError::InvalidScheme);
    }

    match Url::parse(trimmed) {
        Ok(url) if url.host_str().map_or(false, |h| !h.is_empty()) => Ok(trimmed.to_string()),
        Ok(_) | Err(url::ParseError::EmptyHost) => Err(RequestError::MissingHost),
        Err(e) => Err(RequestError::MalformedUrl(e.to_string())),
    }
}

fn check_range(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), RequestError> {
    if value < min || value > max {
        return Err(RequestError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn compile_pattern(
    field: &'static str,
    pattern: Option<&str>,
) -> Result<Option<Regex>, RequestError> {
    match pattern.filter(|p| !p.is_empty()) {
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|source| RequestError::Pattern { field, source }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request: ScanRequest =
            serde_json::from_str(r#"{"base_url": "https://example.com"}"#).unwrap();
        assert_eq!(request, ScanRequest::new("https://example.com"));
        assert_eq!(request.depth, 4);
        assert_eq!(request.max_pages, 5000);
        assert_eq!(request.timeout_seconds, 20);
        assert!(request.follow_redirects);
        assert!(request.respect_robots);
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let validated = ScanRequest::new("  https://example.com/start  ")
            .validate()
            .unwrap();
        assert_eq!(validated.request.base_url, "https://example.com/start");
    }

    #[test]
    fn test_rejects_bad_scheme_and_host() {
        assert!(matches!(
            ScanRequest::new("ftp://example.com").validate(),
            Err(RequestError::InvalidScheme)
        ));
        assert!(matches!(
            ScanRequest::new("example.com").validate(),
            Err(RequestError::InvalidScheme)
        ));
        assert!(matches!(
            ScanRequest::new("https://").validate(),
            Err(RequestError::MissingHost)
        ));
    }

    #[test]
    fn test_range_checks() {
        let mut request = ScanRequest::new("https://example.com");
        request.depth = 13;
        assert!(matches!(
            request.validate(),
            Err(RequestError::OutOfRange { field: "depth", .. })
        ));

        let mut request = ScanRequest::new("https://example.com");
        request.max_pages = 0;
        assert!(matches!(
            request.validate(),
            Err(RequestError::OutOfRange { field: "max_pages", .. })
        ));

        let mut request = ScanRequest::new("https://example.com");
        request.timeout_seconds = 181;
        assert!(matches!(
            request.validate(),
            Err(RequestError::OutOfRange {
                field: "timeout_seconds",
                ..
            })
        ));

        let mut request = ScanRequest::new("https://example.com");
        request.depth = 12;
        request.max_pages = 200_000;
        request.timeout_seconds = 1;
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_invalid_regex() {
        let mut request = ScanRequest::new("https://example.com");
        request.include_regex = Some("([unclosed".to_string());
        assert!(matches!(
            request.validate(),
            Err(RequestError::Pattern {
                field: "include_regex",
                ..
            })
        ));
    }

    #[test]
    fn test_resource_types_collapsed() {
        let mut request = ScanRequest::new("https://example.com");
        request.resource_types = Some(vec![ResourceType::Js, ResourceType::Css, ResourceType::Js]);
        let validated = request.validate().unwrap();
        assert_eq!(
            validated.request.resource_types,
            Some(vec![ResourceType::Js, ResourceType::Css])
        );
        assert_eq!(validated.filter.resource_types.as_ref().map(|t| t.len()), Some(2));

        let mut request = ScanRequest::new("https://example.com");
        request.resource_types = Some(Vec::new());
        let validated = request.validate().unwrap();
        assert!(validated.request.resource_types.is_none());
        assert!(validated.filter.resource_types.is_none());
    }
}
