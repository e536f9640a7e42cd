//! Configuration file model, loading and validation

use crate::error::{Result, SyncError};
use crate::registry::auth::RegistryAuth;
use crate::registry::docker::DEFAULT_API_VERSION;
use crate::sync::{Location, Mapping, PingPolicy, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Container daemon settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DockerConfig {
    /// Daemon address; the command line and `DOCKER_HOST` take precedence
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_ping_attempts")]
    pub ping_attempts: u32,
    /// Seconds between ping attempts
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: None,
            api_version: default_api_version(),
            ping_attempts: default_ping_attempts(),
            ping_interval: default_ping_interval(),
        }
    }
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_ping_attempts() -> u32 {
    30
}

fn default_ping_interval() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConfig {
    pub registry: String,
    /// Base64 encoded credential JSON, as used for `X-Registry-Auth`
    #[serde(default)]
    pub auth: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    /// Seconds between runs, zero for a one-off task
    #[serde(default)]
    pub interval: u64,
    #[serde(default)]
    pub verbose: bool,
    pub source: LocationConfig,
    pub target: LocationConfig,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,
}

impl SyncConfig {
    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: SyncConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.docker.ping_attempts == 0 {
            return Err(SyncError::Config(
                "docker.ping-attempts must be greater than 0".to_string(),
            ));
        }

        if self.tasks.is_empty() {
            return Err(SyncError::Config("no tasks defined".to_string()));
        }

        let mut names = HashSet::new();
        for task in &self.tasks {
            task.validate()?;
            if !names.insert(task.name.as_str()) {
                return Err(SyncError::Config(format!(
                    "duplicate task name '{}'",
                    task.name
                )));
            }
        }

        Ok(())
    }

    /// Tasks in configuration order
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.iter().map(TaskConfig::to_task).collect()
    }

    pub fn ping_policy(&self) -> PingPolicy {
        PingPolicy {
            attempts: self.docker.ping_attempts,
            interval: Duration::from_secs(self.docker.ping_interval),
        }
    }
}

impl TaskConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SyncError::Config("task name cannot be empty".to_string()));
        }

        for (side, location) in [("source", &self.source), ("target", &self.target)] {
            if location.registry.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "task '{}': {} registry cannot be empty",
                    self.name, side
                )));
            }
            if !location.auth.trim().is_empty() {
                RegistryAuth::decode(&location.auth).map_err(|e| {
                    SyncError::Config(format!("task '{}': invalid {} auth: {}", self.name, side, e))
                })?;
            }
        }

        if self.mappings.is_empty() {
            return Err(SyncError::Config(format!(
                "task '{}': at least one mapping is required",
                self.name
            )));
        }

        if self
            .mappings
            .iter()
            .any(|m| m.tags.iter().any(|t| t.trim().is_empty()))
        {
            return Err(SyncError::Config(format!(
                "task '{}': tags cannot be empty",
                self.name
            )));
        }

        Ok(())
    }

    pub fn to_task(&self) -> Task {
        Task {
            name: self.name.clone(),
            source: Location::new(self.source.registry.trim(), self.source.auth.trim()),
            target: Location::new(self.target.registry.trim(), self.target.auth.trim()),
            mappings: self
                .mappings
                .iter()
                .map(|m| Mapping::new(&m.from, &m.to, m.tags.clone()))
                .collect(),
            interval: Duration::from_secs(self.interval),
            verbose: self.verbose,
        }
    }
}
