//! Asset extraction module
//!
//! This module turns one crawled HTML page into asset instances:
//! - Locating URL-bearing attributes via the static tag tables
//! - Splitting attribute values into candidate URLs
//! - Building a DOM path for every element
//! - Classifying each resource into a category
//! - Assigning occurrence ordinals and identity keys

mod attributes;
mod classify;
mod dom_path;
mod instances;
pub mod tables;

pub use attributes::{parse_attribute_urls, AttributeValue};
pub use classify::{classify_resource_type, ResourceType};
pub use dom_path::build_dom_path;
pub use instances::{extract_asset_instances, make_instance_key, AssetFilter, AssetInstance};
