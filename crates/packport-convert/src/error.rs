//! Conversion errors.

use derive_more::Display;
use packport_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// The conversion stage a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    #[display("variables")]
    Variables,
    #[display("container build")]
    ContainerBuild,
    #[display("machine-image build")]
    MachineImageBuild,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ConfigError,
    },

    #[error("template directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
}

impl ConvertError {
    pub fn stage(stage: Stage, source: ConfigError) -> Self {
        ConvertError::Stage { stage, source }
    }
}

pub type ConvertResult<T> = std::result::Result<T, ConvertError>;
