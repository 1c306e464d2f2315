//! Core domain types for the packport template converter.
//!
//! This crate contains:
//! - Entities extracted from Packer HCL templates (variables, sources, build blocks)
//! - The normalized build configuration handed to the image builder
//! - Image reference handling
//! - Credential redaction helpers for log output

pub mod build;
pub mod error;
pub mod image;
pub mod redact;
pub mod template;

pub use error::{Error, Result};
pub use image::ImageRef;
