//! Whole-scan deduplication of asset instances

use crate::extract::AssetInstance;
use std::collections::HashSet;

/// Collapses instances that share an identity key
///
/// The first instance seen for each key is kept and arrival order is
/// preserved, so applying this twice gives the same result as applying it once.
///
/// # Arguments
///
/// * `instances` - Instances in arrival order
///
/// # Returns
///
/// The unique instances, in the order of their first appearance
pub fn dedupe_instances_by_key(instances: Vec<AssetInstance>) -> Vec<AssetInstance> {
    let mut seen: HashSet<String> = HashSet::with_capacity(instances.len());
    instances
        .into_iter()
        .filter(|instance| seen.insert(instance.instance_key.clone()))
        .collect()
}

/// Returns the sorted, distinct asset URLs referenced by the instances
pub fn unique_asset_urls(instances: &[AssetInstance]) -> Vec<String> {
    let mut urls: Vec<String> = instances
        .iter()
        .map(|instance| instance.asset_url.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    urls.sort();
    urls
}
