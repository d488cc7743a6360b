//! Configuration module for res-scan
//!
//! This module handles loading, parsing, and validating the TOML settings file.
//! Every section is optional; missing values fall back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use res_scan::config::load_settings;
//! use std::path::Path;
//!
//! let settings = load_settings(Path::new("res-scan.toml")).unwrap();
//! println!("Database: {}", settings.output.database_path.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{JobsConfig, OutputConfig, Settings, ToolsConfig};

// Re-export parser functions
pub use parser::{load_settings, parse_settings};
