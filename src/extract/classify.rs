use crate::extract::tables::{EXTENSIONS, PRELOAD_AS};
use scraper::node::Element;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Category of a static resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Css,
    Js,
    Images,
    Fonts,
    Video,
    Docs,
}

impl ResourceType {
    /// Every category, in reporting order
    pub const ALL: [ResourceType; 6] = [
        Self::Css,
        Self::Js,
        Self::Images,
        Self::Fonts,
        Self::Video,
        Self::Docs,
    ];

    /// Converts the category to its database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::Js => "js",
            Self::Images => "images",
            Self::Fonts => "fonts",
            Self::Video => "video",
            Self::Docs => "docs",
        }
    }

    /// Parses a category from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(&s.trim().to_lowercase())
            .ok_or_else(|| format!("Unsupported resource type: {}", s))
    }
}

/// Classifies a normalized asset URL
///
/// # Precedence
///
/// 1. File extension of the URL path (short-circuits)
/// 2. Tag and attribute heuristics:
///    - `script[src]` → js
///    - `img` → images
///    - `video`, `audio`, `track` → video
///    - `link[href]` by `rel`: `stylesheet` → css, preload-style rels defer
///      to `as`, `icon` → images
/// 3. Everything else → docs
///
/// Classification is advisory and never rejects a candidate.
pub fn classify_resource_type(url: &str, tag: &str, attr: &str, node: &Element) -> ResourceType {
    if let Some(by_extension) = classify_by_extension(url) {
        return by_extension;
    }

    match (tag, attr) {
        ("script", "src") => ResourceType::Js,
        ("img", _) => ResourceType::Images,
        ("video", _) | ("audio", _) | ("track", _) => ResourceType::Video,
        ("link", "href") => classify_link(node).unwrap_or(ResourceType::Docs),
        _ => ResourceType::Docs,
    }
}

fn classify_by_extension(url: &str) -> Option<ResourceType> {
    let path = Url::parse(url).ok()?.path().to_lowercase();

    EXTENSIONS
        .iter()
        .find(|(_, suffixes)| suffixes.iter().any(|suffix| path.ends_with(suffix)))
        .map(|(resource_type, _)| *resource_type)
}

fn classify_link(node: &Element) -> Option<ResourceType> {
    let rel: Vec<String> = node
        .attr("rel")
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    let has_rel = |value: &str| rel.iter().any(|r| r == value);

    if has_rel("stylesheet") {
        return Some(ResourceType::Css);
    }

    if has_rel("preload") || has_rel("prefetch") || has_rel("modulepreload") {
        let as_value = node.attr("as").unwrap_or_default().trim().to_lowercase();
        if let Some((_, resource_type)) = PRELOAD_AS.iter().find(|(name, _)| *name == as_value) {
            return Some(*resource_type);
        }
    }

    if has_rel("icon") {
        return Some(ResourceType::Images);
    }

    None
}
