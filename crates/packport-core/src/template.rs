//! Entities extracted from Packer HCL templates.
//!
//! These are the intermediate results of decoding `variables.pkr.hcl`,
//! `docker.pkr.hcl` and `ami.pkr.hcl`. They live for a single conversion
//! and are discarded once the normalized build configuration exists.

use std::collections::BTreeMap;

use crate::build::ProvisionerStep;

pub const DOCKER_SOURCE: &str = "docker";
pub const AMAZON_EBS_SOURCE: &str = "amazon-ebs";

pub const DOCKER_TAG_POST_PROCESSOR: &str = "docker-tag";
pub const DOCKER_PUSH_POST_PROCESSOR: &str = "docker-push";
pub const MANIFEST_POST_PROCESSOR: &str = "manifest";

/// A `variable "<name>" { ... }` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// Type expression as written, e.g. `string` or `list(string)`.
    pub declared_type: String,
    pub default: Option<String>,
}

/// A `source "docker" "<name>"` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSource {
    pub name: String,
    pub image: Option<String>,
    pub privileged: bool,
    pub pull: bool,
    pub commit: bool,
    pub platform: Option<String>,
    pub volumes: BTreeMap<String, String>,
    pub run_command: Vec<String>,
    pub changes: Vec<String>,
}

/// A `source "amazon-ebs" "<name>"` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineImageSource {
    pub name: String,
    pub instance_type: Option<String>,
    pub region: Option<String>,
    pub ami_name: Option<String>,
    pub subnet_id: Option<String>,
    /// `volume_size` from the first `launch_block_device_mappings` block that sets one.
    pub volume_size: Option<u32>,
}

/// A step applied after the image has been assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessorStep {
    pub only: Vec<String>,
    pub except: Vec<String>,
    pub kind: PostProcessorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessorKind {
    DockerTag {
        repository: Option<String>,
        tags: Vec<String>,
        force: bool,
    },
    DockerPush,
    Manifest {
        output: Option<String>,
        strip_path: bool,
    },
    /// Recognized only by its type label; never aggregated.
    Other(String),
}

impl PostProcessorKind {
    pub fn type_name(&self) -> &str {
        match self {
            PostProcessorKind::DockerTag { .. } => DOCKER_TAG_POST_PROCESSOR,
            PostProcessorKind::DockerPush => DOCKER_PUSH_POST_PROCESSOR,
            PostProcessorKind::Manifest { .. } => MANIFEST_POST_PROCESSOR,
            PostProcessorKind::Other(name) => name.as_str(),
        }
    }
}

impl PostProcessorStep {
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

/// A `build { ... }` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildBlock {
    pub name: Option<String>,
    /// Source references such as `source.docker.amd64`.
    pub sources: Vec<String>,
    pub provisioners: Vec<ProvisionerStep>,
    /// Flat and grouped post-processors in declaration order.
    pub post_processors: Vec<PostProcessorStep>,
}
