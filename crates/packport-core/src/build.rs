//! Normalized build configuration produced by a conversion.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SHELL_PROVISIONER: &str = "shell";
pub const ANSIBLE_PROVISIONER: &str = "ansible";

/// The document handed to the downstream image builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBuildConfig {
    pub metadata: Metadata,
    pub base: BaseImage,
    pub provisioners: Vec<ProvisionerStep>,
    pub targets: Vec<BuildTarget>,
}

/// Descriptive metadata for the converted template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,
}

/// Container base image plus the docker source settings that shape the build container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseImage {
    /// Fully qualified reference, e.g. `ubuntu:22.04`.
    pub image: String,
    pub pull: bool,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub commit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub volumes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run_command: Vec<String>,
    /// Dockerfile-style instructions applied on commit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<String>,
}

impl BaseImage {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            pull: true,
            privileged: false,
            commit: false,
            platform: None,
            volumes: BTreeMap::new(),
            run_command: Vec::new(),
            changes: Vec::new(),
        }
    }
}

/// Where a build is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BuildTarget {
    Container(ContainerTarget),
    #[serde(rename = "ami")]
    MachineImage(MachineImageTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerTarget {
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub push: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineImageTarget {
    pub instance_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub volume_size: u32,
}

/// A build step that mutates the image under construction.
///
/// `only` and `except` hold build-target selectors such as `docker.amd64`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ProvisionerRecord", into = "ProvisionerRecord")]
pub struct ProvisionerStep {
    pub only: Vec<String>,
    pub except: Vec<String>,
    pub kind: ProvisionerKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionerKind {
    Shell(ShellProvisioner),
    Ansible(AnsibleProvisioner),
    /// Any provisioner type without a dedicated decoder; carries its type label.
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellProvisioner {
    pub inline: Vec<String>,
    pub scripts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnsibleProvisioner {
    pub user: Option<String>,
    pub playbook_file: Option<String>,
    pub galaxy_file: Option<String>,
    pub inventory_file: Option<String>,
    pub collections_path: Option<String>,
    pub use_proxy: bool,
    pub env_vars: Vec<String>,
    /// Raw `extra_arguments` tokens as written in the template.
    pub extra_arguments: Vec<String>,
    /// `-e key=value` pairs extracted from `extra_arguments`.
    pub extra_vars: BTreeMap<String, String>,
}

impl ProvisionerKind {
    pub fn type_name(&self) -> &str {
        match self {
            ProvisionerKind::Shell(_) => SHELL_PROVISIONER,
            ProvisionerKind::Ansible(_) => ANSIBLE_PROVISIONER,
            ProvisionerKind::Other(name) => name.as_str(),
        }
    }
}

impl ProvisionerStep {
    pub fn new(kind: ProvisionerKind) -> Self {
        Self {
            only: Vec::new(),
            except: Vec::new(),
            kind,
        }
    }

    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    /// Playbook path for ansible steps, `None` for every other kind.
    pub fn playbook_file(&self) -> Option<&str> {
        match &self.kind {
            ProvisionerKind::Ansible(ansible) => ansible.playbook_file.as_deref(),
            _ => None,
        }
    }
}

/// Flat wire form of [`ProvisionerStep`]; `type` selects which fields apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionerRecord {
    #[serde(rename = "type")]
    provisioner_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    only: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    except: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    inline: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    scripts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    playbook_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    galaxy_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inventory_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    collections_path: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    use_proxy: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    env_vars: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    extra_arguments: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extra_vars: BTreeMap<String, String>,
}

impl From<ProvisionerStep> for ProvisionerRecord {
    fn from(step: ProvisionerStep) -> Self {
        let mut record = ProvisionerRecord {
            provisioner_type: step.type_name().to_string(),
            only: step.only,
            except: step.except,
            ..Default::default()
        };

        match step.kind {
            ProvisionerKind::Shell(shell) => {
                record.inline = shell.inline;
                record.scripts = shell.scripts;
            }
            ProvisionerKind::Ansible(ansible) => {
                record.user = ansible.user;
                record.playbook_file = ansible.playbook_file;
                record.galaxy_file = ansible.galaxy_file;
                record.inventory_file = ansible.inventory_file;
                record.collections_path = ansible.collections_path;
                record.use_proxy = ansible.use_proxy;
                record.env_vars = ansible.env_vars;
                record.extra_arguments = ansible.extra_arguments;
                record.extra_vars = ansible.extra_vars;
            }
            ProvisionerKind::Other(_) => {}
        }

        record
    }
}

impl From<ProvisionerRecord> for ProvisionerStep {
    fn from(record: ProvisionerRecord) -> Self {
        let kind = match record.provisioner_type.as_str() {
            SHELL_PROVISIONER => ProvisionerKind::Shell(ShellProvisioner {
                inline: record.inline,
                scripts: record.scripts,
            }),
            ANSIBLE_PROVISIONER => ProvisionerKind::Ansible(AnsibleProvisioner {
                user: record.user,
                playbook_file: record.playbook_file,
                galaxy_file: record.galaxy_file,
                inventory_file: record.inventory_file,
                collections_path: record.collections_path,
                use_proxy: record.use_proxy,
                env_vars: record.env_vars,
                extra_arguments: record.extra_arguments,
                extra_vars: record.extra_vars,
            }),
            _ => ProvisionerKind::Other(record.provisioner_type),
        };

        ProvisionerStep {
            only: record.only,
            except: record.except,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_step_serializes_flat() {
        let mut step = ProvisionerStep::new(ProvisionerKind::Shell(ShellProvisioner {
            inline: vec!["apt-get update".to_string()],
            scripts: vec![],
        }));
        step.only = vec!["docker.amd64".to_string()];

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "shell",
                "only": ["docker.amd64"],
                "inline": ["apt-get update"],
            })
        );
    }

    #[test]
    fn test_ansible_step_uses_camel_case_fields() {
        let step = ProvisionerStep::new(ProvisionerKind::Ansible(AnsibleProvisioner {
            playbook_file: Some("/playbook.yml".to_string()),
            use_proxy: true,
            extra_vars: BTreeMap::from([("a".to_string(), "1".to_string())]),
            ..Default::default()
        }));

        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["type"], "ansible");
        assert_eq!(json["playbookFile"], "/playbook.yml");
        assert_eq!(json["useProxy"], true);
        assert_eq!(json["extraVars"]["a"], "1");
        assert!(json.get("inline").is_none());
    }

    #[test]
    fn test_unknown_provisioner_keeps_type_label() {
        let step: ProvisionerStep =
            serde_json::from_value(serde_json::json!({ "type": "file" })).unwrap();
        assert_eq!(step.type_name(), "file");
        assert!(step.playbook_file().is_none());
        assert_eq!(serde_json::to_value(&step).unwrap()["type"], "file");
    }

    #[test]
    fn test_target_tags() {
        let targets = vec![
            BuildTarget::Container(ContainerTarget {
                platforms: vec!["linux/amd64".to_string()],
                registry: None,
                tags: vec![],
                push: false,
            }),
            BuildTarget::MachineImage(MachineImageTarget {
                instance_type: "t3.micro".to_string(),
                region: Some("us-east-1".to_string()),
                volume_size: 50,
            }),
        ];

        let json = serde_json::to_value(&targets).unwrap();
        assert_eq!(json[0]["type"], "container");
        assert_eq!(json[1]["type"], "ami");
        assert_eq!(json[1]["instanceType"], "t3.micro");
        assert_eq!(json[1]["volumeSize"], 50);
    }

    #[test]
    fn test_base_image_defaults_to_pull() {
        let base = BaseImage::new("ubuntu:22.04");
        assert!(base.pull);
        let json = serde_json::to_value(&base).unwrap();
        assert_eq!(json["image"], "ubuntu:22.04");
        assert!(json.get("runCommand").is_none());
    }
}
