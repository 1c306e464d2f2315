//! CLI command implementations.

pub mod convert;
pub mod validate;

use anyhow::{Context, Result};
use packport_config::ConvertSettings;
use std::path::Path;
use tracing::debug;

/// Load global defaults from a settings file.
pub fn load_settings(path: &Path) -> Result<ConvertSettings> {
    let settings = ConvertSettings::load(path)
        .with_context(|| format!("Failed to load settings: {}", path.display()))?;
    debug!(path = %path.display(), "Loaded settings");
    Ok(settings)
}
