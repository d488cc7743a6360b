//! Static lookup tables driving extraction and classification
//!
//! Adding a tag, attribute or file extension only requires editing these
//! tables; bump [`TABLE_VERSION`] whenever their contents change. Every
//! replace records the revision in `scan_meta.table_version`.

use crate::extract::ResourceType;

/// Revision of the tables below
pub const TABLE_VERSION: u32 = 1;

/// Tags that may reference a resource, with their URL-bearing attributes
pub const TAG_ATTRS: &[(&str, &[&str])] = &[
    ("script", &["src"]),
    ("link", &["href"]),
    ("img", &["src", "srcset"]),
    ("source", &["src", "srcset"]),
    ("video", &["src", "poster"]),
    ("audio", &["src"]),
    ("track", &["src"]),
    ("iframe", &["src"]),
    ("embed", &["src"]),
    ("object", &["data"]),
    ("input", &["src"]),
    ("a", &["href"]),
    ("use", &["href", "xlink:href"]),
];

/// File suffixes per category, checked in table order
pub const EXTENSIONS: &[(ResourceType, &[&str])] = &[
    (ResourceType::Css, &[".css"]),
    (ResourceType::Js, &[".js", ".mjs"]),
    (
        ResourceType::Images,
        &[
            ".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg", ".ico", ".bmp", ".avif",
        ],
    ),
    (
        ResourceType::Fonts,
        &[".woff", ".woff2", ".ttf", ".otf", ".eot"],
    ),
    (
        ResourceType::Video,
        &[".mp4", ".webm", ".m3u8", ".mpd", ".mov", ".avi", ".mp3", ".wav"],
    ),
    (
        ResourceType::Docs,
        &[
            ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".csv",
        ],
    ),
];

/// `as` values of preload-style `<link>` elements
pub const PRELOAD_AS: &[(&str, ResourceType)] = &[
    ("script", ResourceType::Js),
    ("style", ResourceType::Css),
    ("font", ResourceType::Fonts),
    ("image", ResourceType::Images),
];

/// Returns the URL-bearing attributes registered for a tag
pub fn attrs_for_tag(tag: &str) -> &'static [&'static str] {
    TAG_ATTRS
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, attrs)| *attrs)
        .unwrap_or(&[])
}
