//! Packer HCL template decoding for packport.
//!
//! This crate handles:
//! - Typed attribute access over loosely typed HCL block bodies
//! - Variable declarations and `${var.NAME}` interpolation
//! - `source` blocks (docker, amazon-ebs)
//! - `build` blocks with their provisioners and post-processors
//! - Converter settings (global defaults)

pub mod build;
pub mod decoder;
pub mod error;
pub mod loader;
pub mod parser;
pub mod settings;
pub mod source;
pub mod variables;

pub use build::parse_ansible_extra_args;
pub use decoder::{AttributeValue, BlockDecoder};
pub use error::{ConfigError, ConfigResult, FileRole};
pub use parser::TemplateParser;
pub use settings::ConvertSettings;
pub use source::SourceSet;
pub use variables::VariableTable;
