//! Template validation command.

use anyhow::{Context, Result};
use packport_config::ConvertSettings;
use packport_convert::converter::{CONTAINER_TEMPLATE, MACHINE_IMAGE_TEMPLATE, VARIABLES_FILE};
use packport_convert::{ConvertOptions, PackerConverter, provisioners_match};
use packport_core::template::BuildBlock;
use std::path::Path;

/// Parse every file of a template directory and print a summary.
pub fn run(template_dir: &Path, settings: ConvertSettings) -> Result<()> {
    let converter = PackerConverter::new(ConvertOptions::new(template_dir), settings);
    let parsed = converter
        .parse()
        .with_context(|| format!("Invalid template: {}", template_dir.display()))?;

    println!("Template: {}", converter.template_name());

    if template_dir.join(VARIABLES_FILE).is_file() {
        println!("  {}: {} variables", VARIABLES_FILE, parsed.parser.variables().len());
    } else {
        println!("  {}: not found", VARIABLES_FILE);
    }
    print_builds(CONTAINER_TEMPLATE, parsed.container_builds.as_deref());
    print_builds(MACHINE_IMAGE_TEMPLATE, parsed.machine_image_builds.as_deref());

    if let Some(docker) = parsed.parser.docker_source() {
        println!(
            "  source docker.{}: image {}",
            docker.name,
            docker.image.as_deref().unwrap_or("-")
        );
    }
    if let Some(ami) = parsed.parser.ami_source() {
        println!(
            "  source amazon-ebs.{}: instance type {}",
            ami.name,
            ami.instance_type.as_deref().unwrap_or("-")
        );
    }

    let container = parsed.container_provisioners();
    let machine_image = parsed.machine_image_provisioners();
    if !container.is_empty() && !machine_image.is_empty() {
        if provisioners_match(&container, &machine_image) {
            println!("  provisioners: container and AMI templates agree");
        } else {
            println!("  provisioners: container and AMI templates differ, container wins");
        }
    }

    println!("Template is valid");
    Ok(())
}

fn print_builds(file: &str, builds: Option<&[BuildBlock]>) {
    let Some(builds) = builds else {
        println!("  {}: not found", file);
        return;
    };

    let provisioners: usize = builds.iter().map(|b| b.provisioners.len()).sum();
    let post_processors: usize = builds.iter().map(|b| b.post_processors.len()).sum();
    println!(
        "  {}: {} builds, {} provisioners, {} post-processors",
        file,
        builds.len(),
        provisioners,
        post_processors
    );
}
