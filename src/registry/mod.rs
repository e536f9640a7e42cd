//! Registry module for container runtime and registry interactions
//!
//! This module defines the [`RegistryClient`] contract the sync engine drives
//! (pull, list, tag, push, ping), the [`Image`] value it works on, and helpers
//! for splitting and normalising image references. Concrete implementations
//! talk to the Docker Engine API ([`docker`]) and to managed registries such
//! as ECR ([`ecr`]).

pub mod auth;
pub mod docker;
pub mod ecr;

pub use auth::{RegistryAuth, RegistryToken};
pub use docker::{DockerClient, DockerClientBuilder};
pub use ecr::{AwsCliEcr, EcrIdentity, ManagedRegistry};

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Registry host assumed for references that do not name one
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Operations the sync engine needs from the container runtime.
///
/// Implementations are not required to support concurrent calls; the
/// scheduler never runs two tasks at once.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Wait for the runtime to become reachable
    async fn ping(&self, max_attempts: u32, interval: Duration) -> Result<()>;

    /// Pull `reference`; with `all_tags` every tag of the repository is fetched
    async fn pull(&self, reference: &str, auth: &str, all_tags: bool, verbose: bool) -> Result<()>;

    /// Images present locally that match `reference` (with or without tag)
    async fn list(&self, reference: &str) -> Result<Vec<Image>>;

    /// Point `new_reference` (including tag) at the image with `image_id`
    async fn tag(&self, image_id: &str, new_reference: &str) -> Result<()>;

    /// Push `reference`; with `all_tags` every local tag of it is pushed
    async fn push(&self, reference: &str, all_tags: bool, auth: &str, verbose: bool) -> Result<()>;
}

/// A pulled or to-be-pushed image: content id plus the tags it carries
/// under `repo/path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    pub repo: String,
    pub path: String,
    pub tags: Vec<String>,
}

impl Image {
    /// Tags are kept sorted and unique so iteration order is deterministic
    pub fn new(id: impl Into<String>, repo: impl Into<String>, path: impl Into<String>, tags: Vec<String>) -> Self {
        let mut tags = tags;
        tags.sort();
        tags.dedup();
        Self {
            id: id.into(),
            repo: repo.into(),
            path: path.into(),
            tags,
        }
    }

    /// `repo/path` without tag
    pub fn reference(&self) -> String {
        join_ref(&self.repo, &self.path)
    }

    /// The same content bound to another repository; the tag set is kept
    pub fn retarget(&self, repo: &str, path: &str) -> Image {
        Image {
            id: self.id.clone(),
            repo: repo.to_string(),
            path: path.to_string(),
            tags: self.tags.clone(),
        }
    }

    pub fn reference_with_tags(&self) -> String {
        format!("{}:[{}]", self.reference(), self.tags.join(", "))
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference_with_tags())
    }
}

/// An image reference broken into registry host, repository path and tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub repo: String,
    pub path: String,
    pub tag: Option<String>,
}

impl ImageRef {
    pub fn parse(reference: &str) -> Self {
        // digests are not tags; drop them
        let reference = reference.split('@').next().unwrap_or_default();

        let (name, tag) = match reference.rfind(':') {
            Some(pos) if !is_tag_separator(reference, pos) => (reference, None),
            Some(pos) => (&reference[..pos], Some(reference[pos + 1..].to_string())),
            None => (reference, None),
        };

        let (repo, path) = match name.split_once('/') {
            Some((first, rest)) if is_registry_host(first) => (first, rest),
            None if is_registry_host(name) => (name, ""),
            _ => ("", name),
        };

        Self {
            repo: repo.to_string(),
            path: path.trim_matches('/').to_string(),
            tag: tag.filter(|t| !t.is_empty()),
        }
    }

    /// `repo/path` without tag
    pub fn name(&self) -> String {
        join_ref(&self.repo, &self.path)
    }
}

/// Split a reference into registry host and repository path, e.g.
/// `registry.example.com/mirror/alpine` → (`registry.example.com`, `mirror/alpine`)
pub fn split_ref(reference: &str) -> (String, String) {
    let parsed = ImageRef::parse(reference);
    (parsed.repo, parsed.path)
}

/// Canonical `host/path` form used for comparing image names, so that
/// `alpine` and `docker.io/library/alpine` compare equal.
pub fn normalize_name(name: &str) -> String {
    let parsed = ImageRef::parse(name);
    let repo = match parsed.repo.as_str() {
        "" | "index.docker.io" | "registry-1.docker.io" => DEFAULT_REGISTRY,
        other => other,
    };
    if repo == DEFAULT_REGISTRY && !parsed.path.contains('/') && !parsed.path.is_empty() {
        format!("{}/library/{}", repo, parsed.path)
    } else {
        join_ref(repo, &parsed.path)
    }
}

/// A colon separates a tag unless it belongs to a `host:port` prefix
fn is_tag_separator(reference: &str, pos: usize) -> bool {
    let (before, after) = (&reference[..pos], &reference[pos + 1..]);
    !after.contains('/') && !(!before.contains('/') && is_registry_host(before))
}

fn is_registry_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment == "localhost"
}

fn join_ref(repo: &str, path: &str) -> String {
    match (repo.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => repo.to_string(),
        (false, false) => format!("{}/{}", repo, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_ref() {
        assert_eq!(
            split_ref("myregistry.example.com/mirror/alpine"),
            ("myregistry.example.com".to_string(), "mirror/alpine".to_string())
        );
        assert_eq!(
            split_ref("localhost:5000/test/busybox:1.36"),
            ("localhost:5000".to_string(), "test/busybox".to_string())
        );
        assert_eq!(split_ref("library/alpine"), (String::new(), "library/alpine".to_string()));
        assert_eq!(split_ref("registry.acme.com"), ("registry.acme.com".to_string(), String::new()));
        assert_eq!(split_ref("localhost:5000"), ("localhost:5000".to_string(), String::new()));
    }

    #[test]
    fn test_parse_tag_and_port() {
        let parsed = ImageRef::parse("localhost:5000/busybox:1.36");
        assert_eq!(parsed.repo, "localhost:5000");
        assert_eq!(parsed.path, "busybox");
        assert_eq!(parsed.tag.as_deref(), Some("1.36"));

        let parsed = ImageRef::parse("localhost:5000/busybox");
        assert_eq!(parsed.tag, None);

        let parsed = ImageRef::parse("alpine@sha256:abcdef");
        assert_eq!(parsed.name(), "alpine");
        assert_eq!(parsed.tag, None);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("alpine"), "docker.io/library/alpine");
        assert_eq!(normalize_name("docker.io/library/alpine:3.18"), "docker.io/library/alpine");
        assert_eq!(normalize_name("acme/tools"), "docker.io/acme/tools");
        assert_eq!(normalize_name("quay.io/coreos/etcd"), "quay.io/coreos/etcd");
    }

    #[test]
    fn test_image_tags_are_a_sorted_set() {
        let image = Image::new(
            "sha256:1",
            "registry.acme.com",
            "mirror/alpine",
            vec!["3.19".into(), "3.18".into(), "3.19".into()],
        );
        assert_eq!(image.tags, vec!["3.18", "3.19"]);
        assert_eq!(image.reference_with_tags(), "registry.acme.com/mirror/alpine:[3.18, 3.19]");
    }

    #[test]
    fn test_retarget_keeps_source_untouched() {
        let source = Image::new("sha256:1", "docker.io", "library/alpine", vec!["3.18".into()]);
        let target = source.retarget("registry.acme.com", "mirror/alpine");
        assert_eq!(source.reference(), "docker.io/library/alpine");
        assert_eq!(target.reference(), "registry.acme.com/mirror/alpine");
        assert_eq!(target.id, source.id);
        assert_eq!(target.tags, source.tags);
    }
}
