//! `build` block extraction: provisioners and post-processors.

use hcl::{Block, Body};
use packport_core::build::{
    ANSIBLE_PROVISIONER, AnsibleProvisioner, ProvisionerKind, ProvisionerStep, SHELL_PROVISIONER,
    ShellProvisioner,
};
use packport_core::template::{
    BuildBlock, DOCKER_PUSH_POST_PROCESSOR, DOCKER_TAG_POST_PROCESSOR, MANIFEST_POST_PROCESSOR,
    PostProcessorKind, PostProcessorStep,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::decoder::BlockDecoder;
use crate::loader::load_body;
use crate::variables::VariableTable;
use crate::{ConfigResult, FileRole};

/// Parse every `build` block in a template file.
pub fn parse_build_file(path: &Path, vars: &VariableTable) -> ConfigResult<Vec<BuildBlock>> {
    let body = load_body(path, FileRole::Build)?;
    let builds = extract_builds(&body, vars);
    debug!(path = %path.display(), builds = builds.len(), "Parsed build file");
    Ok(builds)
}

/// Decode every top-level `build` block in a parsed body.
pub fn extract_builds(body: &Body, vars: &VariableTable) -> Vec<BuildBlock> {
    body.blocks()
        .filter(|b| b.identifier() == "build")
        .map(|block| decode_build(block, vars))
        .collect()
}

fn decode_build(block: &Block, vars: &VariableTable) -> BuildBlock {
    let d = BlockDecoder::new(block.body(), vars);
    let mut build = BuildBlock {
        name: d.get_non_empty_string("name"),
        sources: d.get_string_list("sources").unwrap_or_default(),
        ..Default::default()
    };

    // One pass keeps flat and grouped post-processors in declaration order.
    for child in block.body().blocks() {
        match child.identifier() {
            "provisioner" => {
                if let Some(step) = decode_provisioner(child, vars) {
                    build.provisioners.push(step);
                }
            }
            "post-processor" => {
                if let Some(step) = decode_post_processor(child, vars) {
                    build.post_processors.push(step);
                }
            }
            "post-processors" => {
                build.post_processors.extend(
                    child
                        .body()
                        .blocks()
                        .filter(|b| b.identifier() == "post-processor")
                        .filter_map(|b| decode_post_processor(b, vars)),
                );
            }
            _ => {}
        }
    }

    build
}

fn type_label(block: &Block) -> Option<&str> {
    let label = block.labels().first().map(|l| l.as_str());
    if label.is_none() {
        warn!(block = block.identifier(), "Skipping block without a type label");
    }
    label
}

fn decode_provisioner(block: &Block, vars: &VariableTable) -> Option<ProvisionerStep> {
    let provisioner_type = type_label(block)?;
    let d = BlockDecoder::new(block.body(), vars);

    let kind = match provisioner_type {
        SHELL_PROVISIONER => ProvisionerKind::Shell(decode_shell(d)),
        ANSIBLE_PROVISIONER => ProvisionerKind::Ansible(decode_ansible(d)),
        other => ProvisionerKind::Other(other.to_string()),
    };

    Some(ProvisionerStep {
        only: d.get_string_list("only").unwrap_or_default(),
        except: d.get_string_list("except").unwrap_or_default(),
        kind,
    })
}

fn decode_shell(d: BlockDecoder<'_>) -> ShellProvisioner {
    let mut scripts: Vec<String> = d.get_non_empty_string("script").into_iter().collect();
    scripts.extend(d.get_string_list("scripts").unwrap_or_default());

    ShellProvisioner {
        inline: d.get_string_list("inline").unwrap_or_default(),
        scripts,
    }
}

fn decode_ansible(d: BlockDecoder<'_>) -> AnsibleProvisioner {
    let extra_arguments = d.get_string_list("extra_arguments").unwrap_or_default();
    let extra_vars = parse_ansible_extra_args(&extra_arguments);

    AnsibleProvisioner {
        user: d.get_non_empty_string("user"),
        playbook_file: d.get_non_empty_string("playbook_file"),
        galaxy_file: d.get_non_empty_string("galaxy_file"),
        inventory_file: d.get_non_empty_string("inventory_file"),
        collections_path: d.get_non_empty_string("ansible_collections_path"),
        use_proxy: d.get_bool("use_proxy").unwrap_or(false),
        env_vars: d.get_string_list("ansible_env_vars").unwrap_or_default(),
        extra_arguments,
        extra_vars,
    }
}

fn decode_post_processor(block: &Block, vars: &VariableTable) -> Option<PostProcessorStep> {
    let post_processor_type = type_label(block)?;
    let d = BlockDecoder::new(block.body(), vars);

    let kind = match post_processor_type {
        DOCKER_TAG_POST_PROCESSOR => PostProcessorKind::DockerTag {
            repository: d.get_non_empty_string("repository"),
            tags: d.get_string_list("tags").unwrap_or_default(),
            force: d.get_bool("force").unwrap_or(false),
        },
        DOCKER_PUSH_POST_PROCESSOR => PostProcessorKind::DockerPush,
        MANIFEST_POST_PROCESSOR => PostProcessorKind::Manifest {
            output: d.get_non_empty_string("output"),
            strip_path: d.get_bool("strip_path").unwrap_or(false),
        },
        other => PostProcessorKind::Other(other.to_string()),
    };

    Some(PostProcessorStep {
        only: d.get_string_list("only").unwrap_or_default(),
        except: d.get_string_list("except").unwrap_or_default(),
        kind,
    })
}

/// Extract `-e key=value` and `--extra-vars key=value` pairs from ansible
/// command-line arguments.
///
/// The value is everything after the first `=`. A flag whose next token has
/// no `=` produces nothing; all other tokens are skipped.
pub fn parse_ansible_extra_args<S: AsRef<str>>(args: &[S]) -> BTreeMap<String, String> {
    let tokens: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
    let mut tokens = tokens.into_iter().peekable();
    let mut vars = BTreeMap::new();

    while let Some(token) = tokens.next() {
        if token != "-e" && token != "--extra-vars" {
            continue;
        }
        let Some((key, value)) = tokens.peek().copied().and_then(|next| next.split_once('='))
        else {
            continue;
        };
        vars.insert(key.to_string(), value.to_string());
        tokens.next();
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn builds(hcl_text: &str) -> Vec<BuildBlock> {
        extract_builds(&hcl::parse(hcl_text).unwrap(), &VariableTable::new())
    }

    fn shell(step: &ProvisionerStep) -> &ShellProvisioner {
        match &step.kind {
            ProvisionerKind::Shell(shell) => shell,
            other => panic!("expected shell provisioner, got {:?}", other),
        }
    }

    fn ansible(step: &ProvisionerStep) -> &AnsibleProvisioner {
        match &step.kind {
            ProvisionerKind::Ansible(ansible) => ansible,
            other => panic!("expected ansible provisioner, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_args_pairs() {
        let vars = parse_ansible_extra_args(&["-e", "a=1", "-e", "b=2"]);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["a"], "1");
        assert_eq!(vars["b"], "2");
    }

    #[test]
    fn test_extra_args_long_flag_and_other_flags() {
        let vars = parse_ansible_extra_args(&[
            "-vvv",
            "--extra-vars",
            "ansible_python_interpreter=/usr/bin/python3",
            "--connection",
            "docker",
            "-e",
            "var=key=value",
        ]);
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["ansible_python_interpreter"], "/usr/bin/python3");
        assert_eq!(vars["var"], "key=value");
    }

    #[test]
    fn test_extra_args_flag_without_pair() {
        assert!(parse_ansible_extra_args(&["-e"]).is_empty());
        assert!(parse_ansible_extra_args(&["-e", "noequals"]).is_empty());
        assert!(parse_ansible_extra_args::<&str>(&[]).is_empty());

        // the following flag is still examined
        let vars = parse_ansible_extra_args(&["-e", "-e", "x=1"]);
        assert_eq!(vars["x"], "1");
    }

    #[test]
    fn test_shell_provisioner() {
        let builds = builds(
            r#"
            build {
              name    = "tools"
              sources = ["source.docker.amd64", "source.docker.arm64"]

              provisioner "shell" {
                script  = "/path/to/script.sh"
                scripts = ["a.sh", "b.sh"]
                inline  = ["echo hello"]
                only    = ["docker.amd64"]
              }
            }
            "#,
        );

        assert_eq!(builds.len(), 1);
        let build = &builds[0];
        assert_eq!(build.name.as_deref(), Some("tools"));
        assert_eq!(build.sources, vec!["source.docker.amd64", "source.docker.arm64"]);

        let step = &build.provisioners[0];
        assert_eq!(step.type_name(), "shell");
        assert_eq!(step.only, vec!["docker.amd64"]);
        assert!(step.except.is_empty());
        let shell = shell(step);
        assert_eq!(shell.inline, vec!["echo hello"]);
        assert_eq!(shell.scripts, vec!["/path/to/script.sh", "a.sh", "b.sh"]);
    }

    #[test]
    fn test_ansible_provisioner() {
        let builds = builds(
            r#"
            build {
              provisioner "ansible" {
                user                     = "ubuntu"
                playbook_file            = "/path/to/playbook.yml"
                galaxy_file              = "/path/to/requirements.yml"
                inventory_file           = "inventory.ini"
                ansible_collections_path = "/collections"
                use_proxy                = true
                ansible_env_vars         = ["ANSIBLE_HOST_KEY_CHECKING=False"]
                extra_arguments          = ["-e", "var=value", "-vvv"]
                only                     = ["docker.ubuntu"]
                except                   = ["amazon-ebs.ubuntu"]
              }
            }
            "#,
        );

        let step = &builds[0].provisioners[0];
        assert_eq!(step.type_name(), "ansible");
        assert_eq!(step.only, vec!["docker.ubuntu"]);
        assert_eq!(step.except, vec!["amazon-ebs.ubuntu"]);

        let ansible = ansible(step);
        assert_eq!(ansible.user.as_deref(), Some("ubuntu"));
        assert_eq!(ansible.playbook_file.as_deref(), Some("/path/to/playbook.yml"));
        assert_eq!(ansible.galaxy_file.as_deref(), Some("/path/to/requirements.yml"));
        assert_eq!(ansible.inventory_file.as_deref(), Some("inventory.ini"));
        assert_eq!(ansible.collections_path.as_deref(), Some("/collections"));
        assert!(ansible.use_proxy);
        assert_eq!(ansible.env_vars, vec!["ANSIBLE_HOST_KEY_CHECKING=False"]);
        assert_eq!(ansible.extra_arguments, vec!["-e", "var=value", "-vvv"]);
        assert_eq!(ansible.extra_vars["var"], "value");
    }

    #[test]
    fn test_unknown_provisioner_kept_by_type() {
        let builds = builds(
            r#"
            build {
              provisioner "file" {
                source      = "a"
                destination = "/tmp/a"
              }
              provisioner {
                inline = ["no label"]
              }
            }
            "#,
        );

        let provisioners = &builds[0].provisioners;
        assert_eq!(provisioners.len(), 1);
        assert_eq!(provisioners[0].kind, ProvisionerKind::Other("file".to_string()));
    }

    #[test]
    fn test_flat_and_grouped_post_processors_keep_order() {
        let builds = builds(
            r#"
            build {
              post-processor "manifest" {
                output     = "manifest.json"
                strip_path = true
                only       = ["docker.amd64"]
              }

              post-processors {
                post-processor "docker-tag" {
                  repository = "ghcr.io/org/tools"
                  tags       = ["latest", "1.0"]
                  force      = true
                }
                post-processor "docker-push" {}
              }

              post-processor "checksum" {}
            }
            "#,
        );

        let types: Vec<_> = builds[0]
            .post_processors
            .iter()
            .map(|p| p.type_name())
            .collect();
        assert_eq!(types, vec!["manifest", "docker-tag", "docker-push", "checksum"]);

        let post = &builds[0].post_processors;
        assert_eq!(
            post[0].kind,
            PostProcessorKind::Manifest {
                output: Some("manifest.json".to_string()),
                strip_path: true,
            }
        );
        assert_eq!(post[0].only, vec!["docker.amd64"]);
        assert_eq!(
            post[1].kind,
            PostProcessorKind::DockerTag {
                repository: Some("ghcr.io/org/tools".to_string()),
                tags: vec!["latest".to_string(), "1.0".to_string()],
                force: true,
            }
        );
        assert_eq!(post[3].kind, PostProcessorKind::Other("checksum".to_string()));
    }

    #[test]
    fn test_multiple_builds_and_empty_file() {
        assert_eq!(builds("build {}\nbuild {}").len(), 2);
        assert!(builds("").is_empty());
    }

    #[test]
    fn test_variables_resolved_in_provisioners() {
        let mut vars = VariableTable::new();
        vars.load_body(
            &hcl::parse(r#"variable "provision_repo_path" { type = string }"#).unwrap(),
        );
        let body = hcl::parse(
            r#"
            build {
              provisioner "ansible" {
                playbook_file = "${var.provision_repo_path}/playbooks/site.yml"
              }
            }
            "#,
        )
        .unwrap();

        let builds = extract_builds(&body, &vars);
        assert_eq!(
            builds[0].provisioners[0].playbook_file(),
            Some("${PROVISION_REPO_PATH}/playbooks/site.yml")
        );
    }

    #[test]
    fn test_parse_build_file_errors() {
        let err = parse_build_file(Path::new("/nonexistent/docker.pkr.hcl"), &VariableTable::new())
            .unwrap_err();
        assert!(err.to_string().contains("failed to read build file"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "build {{ provisioner \"shell\" {{").unwrap();
        let err = parse_build_file(file.path(), &VariableTable::new()).unwrap_err();
        assert!(matches!(
            err,
            crate::ConfigError::Parse {
                role: FileRole::Build,
                ..
            }
        ));
    }
}
