//! Configuration parsing errors.

use derive_more::Display;
use std::path::PathBuf;
use thiserror::Error;

/// The logical role a file plays in a template directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FileRole {
    #[display("variables")]
    Variables,
    #[display("build")]
    Build,
    #[display("source")]
    Source,
    #[display("settings")]
    Settings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {role} file {}: {source}", .path.display())]
    Read {
        role: FileRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse HCL in {role} file {}: {source}", .path.display())]
    Parse {
        role: FileRole,
        path: PathBuf,
        #[source]
        source: hcl::Error,
    },

    #[error("invalid settings: {0}")]
    Settings(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
