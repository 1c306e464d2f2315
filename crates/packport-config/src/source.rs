//! `source` block extraction.
//!
//! Only two source kinds are decoded: `docker` and `amazon-ebs`. A source
//! block must carry exactly two labels (kind and name); anything else is
//! skipped.

use hcl::{Block, Body};
use packport_core::template::{
    AMAZON_EBS_SOURCE, ContainerSource, DOCKER_SOURCE, MachineImageSource,
};
use std::path::Path;
use tracing::debug;

use crate::decoder::BlockDecoder;
use crate::loader::load_body;
use crate::variables::VariableTable;
use crate::{ConfigResult, FileRole};

/// The docker and amazon-ebs sources found in a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    docker: Option<ContainerSource>,
    ami: Option<MachineImageSource>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every source block in a file.
    pub fn parse_file(&mut self, path: &Path, vars: &VariableTable) -> ConfigResult<()> {
        let body = load_body(path, FileRole::Source)?;
        self.load_body(&body, vars);
        Ok(())
    }

    /// Decode every top-level `source` block in a parsed body.
    ///
    /// When several blocks of the same kind exist, the last one wins.
    pub fn load_body(&mut self, body: &Body, vars: &VariableTable) {
        for block in body.blocks().filter(|b| b.identifier() == "source") {
            let [kind, name] = block.labels() else {
                debug!(labels = block.labels().len(), "Skipping source block without kind and name");
                continue;
            };
            let decoder = BlockDecoder::new(block.body(), vars);

            match kind.as_str() {
                DOCKER_SOURCE => {
                    self.docker = Some(decode_docker_source(name.as_str(), decoder));
                }
                AMAZON_EBS_SOURCE => {
                    self.ami = Some(decode_machine_image_source(name.as_str(), decoder));
                }
                other => {
                    debug!(kind = other, name = name.as_str(), "Ignoring unsupported source kind");
                }
            }
        }
    }

    pub fn docker_source(&self) -> Option<&ContainerSource> {
        self.docker.as_ref()
    }

    pub fn ami_source(&self) -> Option<&MachineImageSource> {
        self.ami.as_ref()
    }
}

fn decode_docker_source(name: &str, d: BlockDecoder<'_>) -> ContainerSource {
    ContainerSource {
        name: name.to_string(),
        image: d.get_non_empty_string("image"),
        privileged: d.get_bool("privileged").unwrap_or(false),
        pull: d.get_bool("pull").unwrap_or(true),
        commit: d.get_bool("commit").unwrap_or(false),
        platform: d.get_non_empty_string("platform"),
        volumes: d.get_string_map("volumes").unwrap_or_default(),
        run_command: d.get_string_list("run_command").unwrap_or_default(),
        changes: d.get_string_list("changes").unwrap_or_default(),
    }
}

fn decode_machine_image_source(name: &str, d: BlockDecoder<'_>) -> MachineImageSource {
    let volume_size = d
        .blocks("launch_block_device_mappings")
        .find_map(|mapping: &Block| d.nested(mapping).get_int("volume_size"))
        .and_then(|size| u32::try_from(size).ok());

    MachineImageSource {
        name: name.to_string(),
        instance_type: d.get_non_empty_string("instance_type"),
        region: d.get_non_empty_string("region"),
        ami_name: d.get_non_empty_string("ami_name"),
        subnet_id: d.get_non_empty_string("subnet_id"),
        volume_size,
    }
}
