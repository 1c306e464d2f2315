//! Container image references (`name[:tag][@digest]`).

use std::fmt;

use crate::{Error, Result};

/// A parsed container image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Repository including any registry host, e.g. `ghcr.io/org/app`.
    pub repository: String,
    /// Tag, if one was given.
    pub tag: Option<String>,
    /// Content digest, if one was given.
    pub digest: Option<String>,
}

impl ImageRef {
    /// Build a reference from a repository and a tag; an empty tag means none.
    pub fn from_parts(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            repository: repository.into(),
            tag: (!tag.is_empty()).then_some(tag),
            digest: None,
        }
    }

    /// Parse a reference such as `debian:bookworm` or `registry:5000/app@sha256:...`.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(Error::InvalidInput("empty image reference".to_string()));
        }

        let (name, digest) = match reference.split_once('@') {
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (reference, None),
        };

        // A colon only separates a tag when it comes after the last path
        // segment separator; `localhost:5000/app` has a port, not a tag.
        let last_segment = name.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match name[last_segment..].rfind(':') {
            Some(i) => {
                let split = last_segment + i;
                (&name[..split], Some(name[split + 1..].to_string()))
            }
            None => (name, None),
        };

        if repository.is_empty() {
            return Err(Error::InvalidInput(format!(
                "image reference has no repository: {reference}"
            )));
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.filter(|t| !t.is_empty()),
            digest,
        })
    }

    /// Whether the reference pins a tag or a digest.
    pub fn is_pinned(&self) -> bool {
        self.tag.is_some() || self.digest.is_some()
    }

    /// Fill in `tag` when the reference pins neither a tag nor a digest.
    pub fn with_default_tag(mut self, tag: &str) -> Self {
        if !self.is_pinned() {
            self.tag = Some(tag.to_string());
        }
        self
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_and_tag() {
        let image = ImageRef::parse("debian:bullseye").unwrap();
        assert_eq!(image.repository, "debian");
        assert_eq!(image.tag.as_deref(), Some("bullseye"));
        assert_eq!(image.to_string(), "debian:bullseye");
    }

    #[test]
    fn test_default_tag_only_when_unpinned() {
        let bare = ImageRef::parse("kalilinux/kali-rolling").unwrap();
        assert_eq!(
            bare.with_default_tag("latest").to_string(),
            "kalilinux/kali-rolling:latest"
        );

        let tagged = ImageRef::parse("debian:bullseye").unwrap();
        assert_eq!(tagged.with_default_tag("latest").to_string(), "debian:bullseye");
    }

    #[test]
    fn test_registry_port_is_not_a_tag() {
        let image = ImageRef::parse("localhost:5000/tools/app").unwrap();
        assert_eq!(image.repository, "localhost:5000/tools/app");
        assert!(image.tag.is_none());
        assert_eq!(
            image.with_default_tag("latest").to_string(),
            "localhost:5000/tools/app:latest"
        );
    }

    #[test]
    fn test_digest_counts_as_pinned() {
        let image = ImageRef::parse("ubuntu@sha256:abc123").unwrap();
        assert!(image.is_pinned());
        assert_eq!(image.with_default_tag("latest").to_string(), "ubuntu@sha256:abc123");
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(ImageRef::from_parts("ubuntu", "22.04").to_string(), "ubuntu:22.04");
        assert_eq!(ImageRef::from_parts("ubuntu", "").to_string(), "ubuntu");
    }

    #[test]
    fn test_empty_reference_rejected() {
        assert!(matches!(ImageRef::parse("  "), Err(Error::InvalidInput(_))));
        assert!(ImageRef::parse(":tag").is_err());
    }
}
