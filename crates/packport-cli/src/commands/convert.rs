//! Template conversion command.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, ValueEnum};
use packport_config::ConvertSettings;
use packport_convert::{ConvertOptions, PackerConverter};
use packport_core::build::NormalizedBuildConfig;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl OutputFormat {
    fn default_file_name(self) -> &'static str {
        match self {
            OutputFormat::Yaml => "build.yaml",
            OutputFormat::Json => "build.json",
        }
    }
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Template directory containing the *.pkr.hcl files
    pub template_dir: PathBuf,

    /// Template name (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Author (defaults to `git config user.name`)
    #[arg(long)]
    pub author: Option<String>,

    #[arg(long)]
    pub license: Option<String>,

    #[arg(long)]
    pub version: Option<String>,

    /// Base image override, e.g. `debian:bookworm`
    #[arg(long)]
    pub base_image: Option<String>,

    /// Include an AMI target
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub include_ami: bool,

    /// Output file (defaults to build.yaml in the template directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "yaml")]
    pub format: OutputFormat,

    /// Print the result instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

/// Convert a template directory and write the result.
pub fn run(args: ConvertArgs, settings: ConvertSettings) -> Result<()> {
    let author = args.author.or_else(|| git_user_name(&args.template_dir));

    let options = ConvertOptions {
        template_dir: args.template_dir.clone(),
        name: args.name,
        author,
        license: args.license,
        version: args.version,
        base_image_override: args.base_image,
        include_machine_image_target: args.include_ami,
    };

    let config = PackerConverter::new(options, settings)
        .convert()
        .with_context(|| format!("Failed to convert template: {}", args.template_dir.display()))?;

    let rendered = render(&config, args.format)?;

    if args.dry_run {
        print!("{}", rendered);
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| args.template_dir.join(args.format.default_file_name()));
    std::fs::write(&output, rendered)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;

    info!(path = %output.display(), "Wrote build configuration");
    println!("Converted {} -> {}", config.metadata.name, output.display());
    Ok(())
}

fn render(config: &NormalizedBuildConfig, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(config).context("Failed to serialize configuration as YAML")?
        }
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration as JSON")?;
            json.push('\n');
            json
        }
    };
    Ok(rendered)
}

/// `git config user.name`, run from the template directory.
fn git_user_name(dir: &Path) -> Option<String> {
    let name = Command::new("git")
        .args(["config", "user.name"])
        .current_dir(dir)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|name| !name.is_empty());

    debug!(found = name.is_some(), "Looked up git author");
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(dir: &Path) -> ConvertArgs {
        ConvertArgs {
            template_dir: dir.to_path_buf(),
            name: None,
            author: Some("Test Author".to_string()),
            license: None,
            version: None,
            base_image: None,
            include_ami: false,
            output: None,
            format: OutputFormat::Yaml,
            dry_run: false,
        }
    }

    #[test]
    fn test_writes_default_output_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("docker.pkr.hcl"),
            "build {\n  provisioner \"shell\" {\n    inline = [\"echo hi\"]\n  }\n}\n",
        )
        .unwrap();

        run(args(dir.path()), ConvertSettings::default()).unwrap();

        let written = std::fs::read_to_string(dir.path().join("build.yaml")).unwrap();
        let config: NormalizedBuildConfig = serde_yaml::from_str(&written).unwrap();
        assert_eq!(config.metadata.author, "Test Author");
        assert_eq!(config.provisioners.len(), 1);
    }

    #[test]
    fn test_json_output_to_explicit_path() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out.json");

        let mut args = args(dir.path());
        args.format = OutputFormat::Json;
        args.output = Some(out.clone());
        args.include_ami = true;
        run(args, ConvertSettings::default()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(json["targets"][1]["type"], "ami");
        assert!(!dir.path().join("build.yaml").exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut args = args(dir.path());
        args.dry_run = true;

        run(args, ConvertSettings::default()).unwrap();
        assert!(!dir.path().join("build.yaml").exists());
    }
}
