//! Matcher configuration.
//!
//! Configuration is optional: every field has a default and the whole file
//! may be omitted. When present it is YAML:
//!
//! ```yaml
//! failFast: true
//! defaultCharset: utf-8
//! specSearchPaths:
//!   - ./specs
//!   - /etc/rift/specs
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Charsets the body matcher knows how to decode.
pub const SUPPORTED_CHARSETS: &[&str] = &[
    "utf-8",
    "utf8",
    "us-ascii",
    "ascii",
    "iso-8859-1",
    "latin1",
];

/// Runtime configuration shared by all compiled matchers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MatcherConfig {
    /// Stop evaluating request fields after the first mismatch that decides
    /// the overall result.
    pub fail_fast: bool,

    /// Base directories searched for relative spec locations, in order.
    /// The current directory is always searched last.
    pub spec_search_paths: Vec<PathBuf>,

    /// Charset used to decode bodies whose content-type names none.
    pub default_charset: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            fail_fast: true,
            spec_search_paths: Vec::new(),
            default_charset: "utf-8".to_string(),
        }
    }
}

impl MatcherConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: MatcherConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let charset = self.default_charset.to_ascii_lowercase();
        if !SUPPORTED_CHARSETS.contains(&charset.as_str()) {
            anyhow::bail!(
                "Unsupported default charset: '{}'. Currently supported: {}",
                self.default_charset,
                SUPPORTED_CHARSETS.join(", ")
            );
        }

        for path in &self.spec_search_paths {
            if path.exists() && !path.is_dir() {
                anyhow::bail!(
                    "Spec search path '{}' exists but is not a directory",
                    path.display()
                );
            }
        }

        Ok(())
    }

    /// Candidate locations for a relative spec path, in lookup order.
    pub fn spec_candidates(&self, location: &str) -> Vec<PathBuf> {
        let location = Path::new(location);
        if location.is_absolute() {
            return vec![location.to_path_buf()];
        }
        let mut candidates: Vec<PathBuf> = self
            .spec_search_paths
            .iter()
            .map(|base| base.join(location))
            .collect();
        candidates.push(location.to_path_buf());
        candidates
    }
}
