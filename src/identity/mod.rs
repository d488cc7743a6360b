//! URL identity module for res-scan
//!
//! This module turns raw URL strings into the canonical identity form used to
//! decide whether two references point at the same resource, and derives the
//! site origin that scopes a scan.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::extract_host;
pub use normalize::{normalize_identity_url, normalize_site_origin, resolve_identity_url};
