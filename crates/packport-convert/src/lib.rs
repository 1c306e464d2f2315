//! Packer template conversion.
//!
//! Reads a template directory (`variables.pkr.hcl`, `docker.pkr.hcl`,
//! `ami.pkr.hcl`, `README.md`) and assembles one normalized build
//! configuration from it.

pub mod converter;
pub mod error;
pub mod readme;
pub mod reconcile;

pub use converter::{ConvertOptions, PackerConverter, ParsedTemplate};
pub use error::{ConvertError, ConvertResult, Stage};
pub use reconcile::provisioners_match;
