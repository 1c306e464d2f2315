//! Template description from `README.md`.

use std::path::Path;
use tracing::{debug, warn};

pub const README_FILE: &str = "README.md";

/// First paragraph line after the leading heading.
///
/// Headings and list items are skipped. Content before the first heading is
/// ignored, so a README without any heading yields `None`.
pub fn extract_description(content: &str) -> Option<String> {
    let mut seen_heading = false;

    for line in content.lines().map(str::trim) {
        if !seen_heading {
            seen_heading = line.starts_with('#');
            continue;
        }
        if !line.is_empty() && !line.starts_with('#') && !line.starts_with('-') {
            return Some(line.to_string());
        }
    }

    None
}

pub fn fallback_description(name: &str) -> String {
    format!("{name} security tooling image")
}

/// Description for the template in `dir`, falling back to a generated one.
pub fn read_description(dir: &Path, name: &str) -> String {
    let path = dir.join(README_FILE);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No README.md found, using default description");
            return fallback_description(name);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read README, using default description");
            return fallback_description(name);
        }
    };

    extract_description(&content).unwrap_or_else(|| fallback_description(name))
}
