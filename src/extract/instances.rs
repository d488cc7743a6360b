//! Per-page asset instance extraction
//!
//! Every element whose tag is registered in [`TAG_ATTRS`](crate::extract::tables::TAG_ATTRS)
//! is visited in document order. Each candidate URL that survives
//! normalization and filtering becomes one [`AssetInstance`].

use crate::extract::attributes::{parse_attribute_urls, AttributeValue};
use crate::extract::classify::{classify_resource_type, ResourceType};
use crate::extract::dom_path::build_dom_path;
use crate::extract::tables::attrs_for_tag;
use crate::identity::resolve_identity_url;
use regex::Regex;
use scraper::node::Element;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use url::Url;

/// One observed reference to a resource at a specific DOM location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInstance {
    /// Origin of the scanned site
    pub site_url: String,

    /// Normalized URL of the page holding the reference
    pub page_url: String,

    /// Normalized URL of the referenced resource
    pub asset_url: String,

    /// Structural locator of the referencing element
    pub dom_path: String,

    /// Attribute the URL was read from
    pub asset_attr: String,

    /// 1-based ordinal per (page, attribute, asset URL)
    pub attr_occurrence: u32,

    /// SHA-256 identity key over all of the fields above
    pub instance_key: String,

    /// Resource category
    pub resource_type: Option<ResourceType>,
}

/// Filters applied to candidate URLs during extraction
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    /// Candidate must match when set
    pub include: Option<Regex>,

    /// Candidate must not match when set
    pub exclude: Option<Regex>,

    /// Allowed categories; `None` allows all
    pub resource_types: Option<HashSet<ResourceType>>,
}

impl AssetFilter {
    /// Returns true if the normalized URL passes the include/exclude patterns
    pub fn allows_url(&self, url: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.is_match(url) {
                return false;
            }
        }

        if let Some(exclude) = &self.exclude {
            if exclude.is_match(url) {
                return false;
            }
        }

        true
    }

    /// Returns true if the category is in the allow-set
    pub fn allows_type(&self, resource_type: ResourceType) -> bool {
        self.resource_types
            .as_ref()
            .map_or(true, |types| types.contains(&resource_type))
    }
}

/// Extracts every asset instance referenced by one HTML page
///
/// # Arguments
///
/// * `site_url` - Origin of the scanned site
/// * `page_url` - Normalized URL of the page; relative references resolve against it
/// * `html` - The page body
/// * `filter` - Include/exclude patterns and resource-type allow-set
///
/// # Returns
///
/// Instances in document order. The same URL referenced twice through the same
/// attribute yields occurrences 1 and 2 with distinct identity keys.
///
/// # Example
///
/// ```
/// use res_scan::extract::{extract_asset_instances, AssetFilter};
///
/// let html = r#"<html><body><script src="/a.js"></script></body></html>"#;
/// let found = extract_asset_instances(
///     "https://example.com",
///     "https://example.com/",
///     html,
///     &AssetFilter::default(),
/// );
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].asset_url, "https://example.com/a.js");
/// ```
pub fn extract_asset_instances(
    site_url: &str,
    page_url: &str,
    html: &str,
    filter: &AssetFilter,
) -> Vec<AssetInstance> {
    let base = match Url::parse(page_url) {
        Ok(base) => base,
        Err(e) => {
            tracing::debug!("Skipping page with unparsable URL {}: {}", page_url, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    let mut counter: HashMap<(&'static str, String), u32> = HashMap::new();
    let mut instances = Vec::new();

    for element in document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
    {
        let tag = element.value().name();
        let attrs = attrs_for_tag(tag);
        if attrs.is_empty() {
            continue;
        }

        let dom_path = build_dom_path(element);

        for &attr_name in attrs {
            let Some(raw_value) = attribute_value(element.value(), attr_name) else {
                continue;
            };

            for candidate in parse_attribute_urls(attr_name, &raw_value) {
                let Some(asset_url) = resolve_identity_url(candidate, &base) else {
                    continue;
                };
                if !filter.allows_url(&asset_url) {
                    continue;
                }

                let resource_type =
                    classify_resource_type(&asset_url, tag, attr_name, element.value());
                if !filter.allows_type(resource_type) {
                    continue;
                }

                let occurrence = counter
                    .entry((attr_name, asset_url.clone()))
                    .and_modify(|n| *n += 1)
                    .or_insert(1);
                let attr_occurrence = *occurrence;

                let instance_key = make_instance_key(
                    site_url,
                    page_url,
                    &asset_url,
                    &dom_path,
                    attr_name,
                    attr_occurrence,
                );

                instances.push(AssetInstance {
                    site_url: site_url.to_string(),
                    page_url: page_url.to_string(),
                    asset_url,
                    dom_path: dom_path.clone(),
                    asset_attr: attr_name.to_string(),
                    attr_occurrence,
                    instance_key,
                    resource_type: Some(resource_type),
                });
            }
        }
    }

    instances
}

/// Computes the identity key of an instance
///
/// The key is the lower-case hex SHA-256 digest of the pipe-joined tuple
/// `site|page|asset|dom_path|attribute|occurrence`.
pub fn make_instance_key(
    site_url: &str,
    page_url: &str,
    asset_url: &str,
    dom_path: &str,
    asset_attr: &str,
    attr_occurrence: u32,
) -> String {
    let material = [
        site_url,
        page_url,
        asset_url,
        dom_path,
        asset_attr,
        &attr_occurrence.to_string(),
    ]
    .join("|");

    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    hex::encode(hasher.finalize())
}

/// Collects every value an element carries for an attribute name
fn attribute_value<'a>(element: &'a Element, attr_name: &str) -> Option<AttributeValue<'a>> {
    let mut values: Vec<AttributeValue<'a>> = element
        .attrs()
        .filter(|(name, _)| *name == attr_name)
        .map(|(_, value)| AttributeValue::Single(value))
        .collect();

    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => Some(AttributeValue::List(values)),
    }
}
