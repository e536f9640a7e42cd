//! Command-line argument parsing

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "docker-image-syncer")]
#[command(about = "Keep container image repositories in sync across registries")]
#[command(version, author)]
pub struct Args {
    /// Path to the sync configuration file
    #[arg(
        long = "config",
        short = 'c',
        help = "Path to the YAML sync configuration"
    )]
    pub config: String,

    /// Docker daemon address
    #[arg(
        long = "docker-host",
        help = "Docker daemon address, e.g. tcp://127.0.0.1:2375 (default: DOCKER_HOST or config)"
    )]
    pub docker_host: Option<String>,

    /// Docker Engine API version
    #[arg(
        long = "api-version",
        help = "Docker Engine API version to request (default: config, or 1.24)"
    )]
    pub api_version: Option<String>,

    /// Verbose output
    #[arg(
        long = "verbose",
        short = 'v',
        help = "Show daemon progress messages for every task"
    )]
    pub verbose: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.config.trim().is_empty() {
            return Err("Config file path cannot be empty".to_string());
        }

        if let Some(host) = &self.docker_host {
            if host.trim().is_empty() {
                return Err("Docker host cannot be empty".to_string());
            }
        }

        if let Some(version) = &self.api_version {
            let version = version.trim_start_matches('v');
            let valid = version.split('.').count() == 2
                && version.split('.').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
            if !valid {
                return Err(format!("Invalid API version '{}', expected e.g. 1.41", version));
            }
        }

        Ok(())
    }

    /// Print usage examples
    pub fn print_examples() {
        println!("Examples:");
        println!("  # Run all tasks of a config file");
        println!("  docker-image-syncer -c config.yaml");
        println!();
        println!("  # Talk to a docker-in-docker sidecar");
        println!("  docker-image-syncer -c config.yaml --docker-host tcp://dind:2375");
        println!();
        println!("  # Using environment variables");
        println!("  export DOCKER_HOST=tcp://127.0.0.1:2375");
        println!("  export SYNCER_VERBOSE=1");
        println!("  docker-image-syncer -c config.yaml");
    }

    /// Fill unset options from the environment
    pub fn from_env(mut self) -> Self {
        if self.docker_host.is_none() {
            self.docker_host = std::env::var("DOCKER_HOST").ok().filter(|h| !h.trim().is_empty());
        }

        if self.api_version.is_none() {
            self.api_version = std::env::var("DOCKER_API_VERSION").ok().filter(|v| !v.trim().is_empty());
        }

        if std::env::var("SYNCER_VERBOSE").is_ok_and(|v| is_enabled(&v)) {
            self.verbose = true;
        }

        self
    }
}

/// Boolean environment flag; unknown values count as off
fn is_enabled(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
