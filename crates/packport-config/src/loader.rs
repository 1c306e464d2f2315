//! Reading and parsing HCL files.

use hcl::Body;
use std::path::Path;
use tracing::debug;

use crate::{ConfigError, ConfigResult, FileRole};

/// Read `path` and parse it into an HCL body.
///
/// An empty file parses to an empty body.
pub fn load_body(path: &Path, role: FileRole) -> ConfigResult<Body> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        role,
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), %role, "Parsing HCL file");

    hcl::parse(&content).map_err(|source| ConfigError::Parse {
        role,
        path: path.to_path_buf(),
        source,
    })
}
