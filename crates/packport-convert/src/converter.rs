//! Template directory to normalized build configuration.

use packport_config::{ConvertSettings, TemplateParser};
use packport_core::ImageRef;
use packport_core::build::{
    BaseImage, BuildTarget, ContainerTarget, MachineImageTarget, Metadata, NormalizedBuildConfig,
    ProvisionerKind, ProvisionerStep,
};
use packport_core::redact::{redact_sensitive_patterns, redact_sensitive_value, redact_url};
use packport_core::template::{BuildBlock, ContainerSource, PostProcessorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn};

use crate::error::{ConvertError, ConvertResult, Stage};
use crate::readme::read_description;
use crate::reconcile::{ProvisionerOrigin, reconcile};

pub const VARIABLES_FILE: &str = "variables.pkr.hcl";
pub const CONTAINER_TEMPLATE: &str = "docker.pkr.hcl";
pub const MACHINE_IMAGE_TEMPLATE: &str = "ami.pkr.hcl";

/// Platforms every container target includes.
pub const REQUIRED_PLATFORMS: &[&str] = &["linux/amd64", "linux/arm64"];

/// Caller-supplied conversion options. Unset values fall back to settings.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub template_dir: PathBuf,
    /// Overrides the template directory's base name.
    pub name: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub version: Option<String>,
    /// `name[:tag]`; `:latest` is added when no tag is given.
    pub base_image_override: Option<String>,
    pub include_machine_image_target: bool,
}

impl ConvertOptions {
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            ..Default::default()
        }
    }
}

/// Everything extracted from a template directory before assembly.
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    pub parser: TemplateParser,
    /// `None` when the file does not exist.
    pub container_builds: Option<Vec<BuildBlock>>,
    pub machine_image_builds: Option<Vec<BuildBlock>>,
}

impl ParsedTemplate {
    pub fn container_provisioners(&self) -> Vec<ProvisionerStep> {
        collect_provisioners(self.container_builds.as_deref())
    }

    pub fn machine_image_provisioners(&self) -> Vec<ProvisionerStep> {
        collect_provisioners(self.machine_image_builds.as_deref())
    }
}

fn collect_provisioners(builds: Option<&[BuildBlock]>) -> Vec<ProvisionerStep> {
    builds
        .unwrap_or_default()
        .iter()
        .flat_map(|build| build.provisioners.iter().cloned())
        .collect()
}

/// Registry, tags and push flag derived from post-processors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Delivery {
    registry: Option<String>,
    tags: Vec<String>,
    push: bool,
}

/// Converts one Packer template directory.
pub struct PackerConverter {
    options: ConvertOptions,
    settings: ConvertSettings,
}

impl PackerConverter {
    pub fn new(options: ConvertOptions, settings: ConvertSettings) -> Self {
        Self { options, settings }
    }

    /// Template name: the override, or the directory's base name.
    pub fn template_name(&self) -> String {
        if let Some(name) = self.options.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        let dir = &self.options.template_dir;
        let resolved = dir.canonicalize().unwrap_or_else(|_| dir.clone());
        resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string())
    }

    /// Run every extraction stage without assembling a configuration.
    pub fn parse(&self) -> ConvertResult<ParsedTemplate> {
        let dir = &self.options.template_dir;
        if !dir.is_dir() {
            return Err(ConvertError::MissingDirectory(dir.clone()));
        }

        let mut parser = TemplateParser::new();

        let variables_path = dir.join(VARIABLES_FILE);
        if variables_path.is_file() {
            parser
                .parse_variables_file(&variables_path)
                .map_err(|e| ConvertError::stage(Stage::Variables, e))?;
            debug!(count = parser.variables().len(), "Loaded template variables");
        } else {
            debug!("No variables.pkr.hcl found, using defaults");
        }

        let container_builds =
            parse_optional_template(&mut parser, dir, CONTAINER_TEMPLATE, Stage::ContainerBuild)?;
        let machine_image_builds = parse_optional_template(
            &mut parser,
            dir,
            MACHINE_IMAGE_TEMPLATE,
            Stage::MachineImageBuild,
        )?;

        Ok(ParsedTemplate {
            parser,
            container_builds,
            machine_image_builds,
        })
    }

    /// Convert the template directory into a normalized build configuration.
    pub fn convert(&self) -> ConvertResult<NormalizedBuildConfig> {
        let name = self.template_name();
        let span = info_span!("convert", template = %name);
        let _enter = span.enter();

        info!(path = %self.options.template_dir.display(), "Starting Packer template conversion");

        let parsed = self.parse()?;
        let metadata = self.metadata(name);
        let base = self.base_image(&parsed.parser);

        let (provisioners, origin) = reconcile(
            parsed.container_provisioners(),
            parsed.machine_image_provisioners(),
        );
        log_provisioners(&provisioners, origin);

        let delivery = project_post_processors(parsed.container_builds.as_deref().unwrap_or_default());
        let targets = self.targets(&parsed.parser, delivery);

        info!(
            provisioners = provisioners.len(),
            targets = targets.len(),
            base = %base.image,
            "Conversion complete"
        );

        Ok(NormalizedBuildConfig {
            metadata,
            base,
            provisioners,
            targets,
        })
    }

    fn metadata(&self, name: String) -> Metadata {
        let pick = |option: &Option<String>, default: &str| {
            option
                .as_deref()
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        Metadata {
            description: read_description(&self.options.template_dir, &name),
            name,
            version: pick(&self.options.version, &self.settings.default_version),
            author: pick(&self.options.author, &self.settings.default_author),
            license: pick(&self.options.license, &self.settings.default_license),
        }
    }

    fn base_image(&self, parser: &TemplateParser) -> BaseImage {
        let docker = parser.docker_source();
        let reference = self.base_reference(parser, docker);
        debug!(image = %reference, "Resolved base image");

        let mut base = BaseImage::new(reference);
        if let Some(source) = docker {
            base.privileged = source.privileged;
            base.pull = source.pull;
            base.commit = source.commit;
            base.platform = source.platform.clone();
            base.volumes = source.volumes.clone();
            base.run_command = source.run_command.clone();
            base.changes = source.changes.clone();
        }
        base
    }

    /// Override, then `base_image`/`base_image_version` variables, then the
    /// docker source's `image`, then settings.
    ///
    /// An override that is not a valid image reference is used verbatim with
    /// `:latest` appended.
    fn base_reference(&self, parser: &TemplateParser, docker: Option<&ContainerSource>) -> String {
        if let Some(reference) = self
            .options
            .base_image_override
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
        {
            return match ImageRef::parse(reference) {
                Ok(image) => image.with_default_tag("latest").to_string(),
                Err(err) => {
                    warn!(reference, error = %err, "Base image override is not a valid image reference");
                    format!("{reference}:latest")
                }
            };
        }

        let vars = parser.variable_table();
        if let Some(image) = vars.default_value("base_image") {
            let tag = vars
                .default_value("base_image_version")
                .unwrap_or(&self.settings.default_base_version);
            return ImageRef::from_parts(image, tag).to_string();
        }

        if let Some(image) = docker.and_then(|d| d.image.as_deref()) {
            if let Ok(reference) = ImageRef::parse(image) {
                return reference.to_string();
            }
        }

        ImageRef::from_parts(
            self.settings.default_base_image.as_str(),
            self.settings.default_base_version.as_str(),
        )
        .to_string()
    }

    fn targets(&self, parser: &TemplateParser, delivery: Delivery) -> Vec<BuildTarget> {
        let mut platforms = self.settings.platforms.clone();
        for required in REQUIRED_PLATFORMS {
            if !platforms.iter().any(|p| p == required) {
                platforms.push(required.to_string());
            }
        }

        let mut targets = vec![BuildTarget::Container(ContainerTarget {
            platforms,
            registry: delivery.registry,
            tags: delivery.tags,
            push: delivery.push,
        })];

        if self.options.include_machine_image_target {
            let source = parser.ami_source();
            let region = source
                .and_then(|s| s.region.clone())
                .or_else(|| Some(self.settings.ami_region.clone()).filter(|r| !r.is_empty()));

            targets.push(BuildTarget::MachineImage(MachineImageTarget {
                instance_type: source
                    .and_then(|s| s.instance_type.clone())
                    .unwrap_or_else(|| self.settings.ami_instance_type.clone()),
                region,
                volume_size: source
                    .and_then(|s| s.volume_size)
                    .unwrap_or(self.settings.ami_volume_size),
            }));
        }

        targets
    }
}

fn parse_optional_template(
    parser: &mut TemplateParser,
    dir: &Path,
    file: &str,
    stage: Stage,
) -> ConvertResult<Option<Vec<BuildBlock>>> {
    let path = dir.join(file);
    if !path.is_file() {
        debug!(file, "Template file not found, skipping");
        return Ok(None);
    }

    let builds = parser
        .parse_template_file(&path)
        .map_err(|e| ConvertError::stage(stage, e))?;
    debug!(file, builds = builds.len(), "Parsed template file");
    Ok(Some(builds))
}

/// Registry and tags come from the last `docker-tag`; any `docker-push` turns
/// on pushing. Other post-processors do not affect delivery.
fn project_post_processors(builds: &[BuildBlock]) -> Delivery {
    let mut delivery = Delivery::default();

    for step in builds.iter().flat_map(|b| &b.post_processors) {
        match &step.kind {
            PostProcessorKind::DockerTag {
                repository, tags, ..
            } => {
                if repository.is_some() {
                    delivery.registry = repository.clone();
                }
                delivery.tags = tags.clone();
            }
            PostProcessorKind::DockerPush => delivery.push = true,
            other => debug!(post_processor = other.type_name(), "Ignoring post-processor"),
        }
    }

    if let Some(registry) = &delivery.registry {
        info!(registry = %redact_url(registry), tags = ?delivery.tags, push = delivery.push, "Derived container delivery");
    }

    delivery
}

fn log_provisioners(provisioners: &[ProvisionerStep], origin: ProvisionerOrigin) {
    debug!(count = provisioners.len(), %origin, "Selected provisioners");

    for step in provisioners {
        if let ProvisionerKind::Ansible(ansible) = &step.kind {
            for (key, value) in &ansible.extra_vars {
                debug!(key = %key, value = %redact_sensitive_value(key, value), "Ansible extra var");
            }
            for env in &ansible.env_vars {
                debug!(env = %redact_sensitive_patterns(env), "Ansible env var");
            }
        }
    }
}
