//! Converter settings: global defaults applied when a template or the caller
//! leaves a value unspecified.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{ConfigError, ConfigResult, FileRole};

/// Global defaults, typically loaded from a YAML file.
///
/// Every field is optional in the file; missing fields take the built-in
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertSettings {
    pub default_version: String,
    pub default_license: String,
    pub default_author: String,
    pub default_base_image: String,
    pub default_base_version: String,
    /// Platforms every container target is built for.
    pub platforms: Vec<String>,
    pub ami_instance_type: String,
    pub ami_volume_size: u32,
    /// Region for machine-image targets whose source sets none. Empty means unset.
    pub ami_region: String,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            default_version: "1.0.0".to_string(),
            default_license: "MIT".to_string(),
            default_author: String::new(),
            default_base_image: "ubuntu".to_string(),
            default_base_version: "latest".to_string(),
            platforms: vec!["linux/amd64".to_string(), "linux/arm64".to_string()],
            ami_instance_type: "t3.micro".to_string(),
            ami_volume_size: 50,
            ami_region: String::new(),
        }
    }
}

impl ConvertSettings {
    /// Parse settings from YAML text.
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        // An empty document deserializes to null rather than an empty map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            role: FileRole::Settings,
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }
}
