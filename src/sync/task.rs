//! Tasks, mappings and registry locations

use crate::registry::ecr::EcrIdentity;
use crate::registry::split_ref;
use std::time::Duration;

/// What kind of registry a location points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryKind {
    /// Plain registry with a static (or no) credential
    Generic,
    /// AWS ECR; credentials expire and repositories must be created
    Ecr(EcrIdentity),
}

/// A registry endpoint and its configured credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub registry: String,
    /// Encoded `X-Registry-Auth` credential, empty for anonymous access
    pub auth: String,
}

impl Location {
    pub fn new(registry: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            registry: registry.into(),
            auth: auth.into(),
        }
    }

    pub fn kind(&self) -> RegistryKind {
        match EcrIdentity::parse(&self.registry) {
            Some(identity) => RegistryKind::Ecr(identity),
            None => RegistryKind::Generic,
        }
    }

    /// Host part of the endpoint, used as credential server address
    pub fn server_address(&self) -> String {
        let (repo, path) = split_ref(&self.registry);
        if repo.is_empty() { path } else { repo }
    }
}

/// One source path to target path pairing, optionally limited to some tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub from: String,
    pub to: String,
    /// Empty means all tags
    pub tags: Vec<String>,
}

impl Mapping {
    /// Paths get a leading `/`; an empty target path mirrors the source path
    pub fn new(from: &str, to: &str, tags: Vec<String>) -> Self {
        let from = normalize_path(from);
        let to = if to.trim().is_empty() { from.clone() } else { normalize_path(to) };
        Self { from, to, tags }
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.trim().trim_end_matches('/');
    if path.is_empty() || path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub source: Location,
    pub target: Location,
    pub mappings: Vec<Mapping>,
    /// Zero means the task runs once
    pub interval: Duration,
    pub verbose: bool,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Full source and target references for a mapping
    pub fn mapping_refs(&self, mapping: &Mapping) -> (String, String) {
        (
            format!("{}{}", self.source.registry.trim_end_matches('/'), mapping.from),
            format!("{}{}", self.target.registry.trim_end_matches('/'), mapping.to),
        )
    }
}
