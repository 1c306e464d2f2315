//! A stateful parser over the files of one template directory.

use packport_core::template::{BuildBlock, ContainerSource, MachineImageSource, Variable};
use std::collections::HashMap;
use std::path::Path;

use crate::build::{extract_builds, parse_build_file};
use crate::loader::load_body;
use crate::source::SourceSet;
use crate::variables::VariableTable;
use crate::{ConfigResult, FileRole};

/// Accumulates variables and sources across the files of a template.
///
/// Variables must be loaded before the files that reference them.
#[derive(Debug, Clone, Default)]
pub struct TemplateParser {
    variables: VariableTable,
    sources: SourceSet,
}

impl TemplateParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_variables_file(&mut self, path: &Path) -> ConfigResult<()> {
        self.variables.parse_file(path)
    }

    pub fn parse_source_blocks(&mut self, path: &Path) -> ConfigResult<()> {
        self.sources.parse_file(path, &self.variables)
    }

    pub fn parse_build_file(&self, path: &Path) -> ConfigResult<Vec<BuildBlock>> {
        parse_build_file(path, &self.variables)
    }

    /// Read a template file once, collecting its sources and returning its
    /// build blocks.
    pub fn parse_template_file(&mut self, path: &Path) -> ConfigResult<Vec<BuildBlock>> {
        let body = load_body(path, FileRole::Build)?;
        self.sources.load_body(&body, &self.variables);
        Ok(extract_builds(&body, &self.variables))
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn variables(&self) -> &HashMap<String, Variable> {
        self.variables.all()
    }

    pub fn variable_table(&self) -> &VariableTable {
        &self.variables
    }

    pub fn docker_source(&self) -> Option<&ContainerSource> {
        self.sources.docker_source()
    }

    pub fn ami_source(&self) -> Option<&MachineImageSource> {
        self.sources.ami_source()
    }
}
