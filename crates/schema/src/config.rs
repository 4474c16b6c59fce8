//! Resolver configuration via TOML
//!
//! Every key is optional; a missing key takes its default.
//!
//! ```toml
//! # Enforce package prefixes on entry names (default: lenient)
//! lenient_prefix = false
//! allowed_prefixes = ["ft.onto", "edu.example"]
//!
//! # Check identifier syntax of entry and attribute names (default: true)
//! validate_identifiers = true
//! ```

use crate::naming::DEFAULT_PREFIX;
use ontopack_core::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Compile-time checks applied by the schema resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Skip the package prefix check on entry names
    #[serde(default = "default_lenient_prefix")]
    pub lenient_prefix: bool,
    /// Prefixes entry names may start with when the check is on
    #[serde(default = "default_allowed_prefixes")]
    pub allowed_prefixes: Vec<String>,
    /// Check identifier syntax of entry and attribute names
    #[serde(default = "default_validate_identifiers")]
    pub validate_identifiers: bool,
}

fn default_lenient_prefix() -> bool {
    true
}

fn default_allowed_prefixes() -> Vec<String> {
    vec![DEFAULT_PREFIX.to_string()]
}

fn default_validate_identifiers() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lenient_prefix: default_lenient_prefix(),
            allowed_prefixes: default_allowed_prefixes(),
            validate_identifiers: default_validate_identifiers(),
        }
    }
}

impl ResolverConfig {
    /// Configuration that enforces `prefixes` on every entry name
    pub fn strict_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lenient_prefix: false,
            allowed_prefixes: prefixes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Config` if the text is not valid TOML or has
    /// keys of the wrong type.
    pub fn from_toml_str(content: &str) -> SchemaResult<Self> {
        toml::from_str(content)
            .map_err(|e| SchemaError::Config(format!("Failed to parse resolver config: {}", e)))
    }

    /// Read and parse a configuration file
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SchemaError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> SchemaResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SchemaError::Config(format!("Failed to serialize config: {}", e)))
    }
}
