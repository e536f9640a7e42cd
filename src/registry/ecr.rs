//! Managed registry support for AWS ECR
//!
//! ECR hands out login tokens that expire after a few hours and requires
//! repositories to exist before anything can be pushed into them. Endpoints
//! are recognised purely from their host name
//! (`<account>.dkr.ecr.<region>.amazonaws.com`); the service itself is
//! reached through the `aws` command line tool.

use crate::error::{Result, SyncError};
use crate::registry::auth::RegistryToken;
use async_trait::async_trait;
use tokio::process::Command;

const REPOSITORY_NOT_FOUND: &str = "RepositoryNotFoundException";

/// Account and region of an ECR registry endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcrIdentity {
    pub account: String,
    pub region: String,
}

impl EcrIdentity {
    pub fn parse(endpoint: &str) -> Option<Self> {
        let host = endpoint.split('/').next()?;
        let parts: Vec<&str> = host.splitn(5, '.').collect();

        match parts.as_slice() {
            [account, "dkr", "ecr", region, domain]
                if !account.is_empty() && !region.is_empty() && is_aws_domain(domain) =>
            {
                Some(Self {
                    account: account.to_string(),
                    region: region.to_string(),
                })
            }
            _ => None,
        }
    }
}

/// `amazonaws.com` or `amazonaws.com.cn`, optionally followed by a port
fn is_aws_domain(domain: &str) -> bool {
    let host = domain.split(':').next().unwrap_or_default();
    matches!(host, "amazonaws.com" | "amazonaws.com.cn")
}

/// Credential issuance and repository management of a managed registry
#[async_trait]
pub trait ManagedRegistry: Send + Sync {
    /// Fresh login for the registry in `region`
    async fn issue_token(&self, region: &str) -> Result<RegistryToken>;

    /// Create repository `name` unless it already exists
    async fn ensure_repository(&self, identity: &EcrIdentity, name: &str) -> Result<()>;
}

/// [`ManagedRegistry`] backed by the `aws` CLI
#[derive(Debug, Clone)]
pub struct AwsCliEcr {
    program: String,
}

impl Default for AwsCliEcr {
    fn default() -> Self {
        Self::new()
    }
}

impl AwsCliEcr {
    pub fn new() -> Self {
        Self {
            program: "aws".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| SyncError::ManagedRegistry(format!("cannot run '{}': {}", self.program, e)))?;

        if output.status.success() {
            Ok(String::from_utf8(output.stdout)?)
        } else {
            Err(SyncError::ManagedRegistry(format!(
                "'{} {}' failed ({}): {}",
                self.program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    /// Remove a repository; a missing repository is not an error
    pub async fn delete_repository(&self, region: &str, name: &str, force: bool) -> Result<()> {
        let mut args = vec!["ecr", "delete-repository", "--region", region, "--repository-name", name];
        if force {
            args.push("--force");
        }
        match self.run(&args).await {
            Err(SyncError::ManagedRegistry(msg)) if msg.contains(REPOSITORY_NOT_FOUND) => Ok(()),
            other => other.map(|_| ()),
        }
    }
}

#[async_trait]
impl ManagedRegistry for AwsCliEcr {
    async fn issue_token(&self, region: &str) -> Result<RegistryToken> {
        let password = self.run(&["ecr", "get-login-password", "--region", region]).await?;
        let password = password.trim();
        if password.is_empty() {
            return Err(SyncError::ManagedRegistry(format!(
                "empty authorization token for region '{}'",
                region
            )));
        }
        Ok(RegistryToken {
            username: "AWS".to_string(),
            password: password.to_string(),
        })
    }

    async fn ensure_repository(&self, identity: &EcrIdentity, name: &str) -> Result<()> {
        let describe = self
            .run(&[
                "ecr",
                "describe-repositories",
                "--region",
                &identity.region,
                "--registry-id",
                &identity.account,
                "--repository-names",
                name,
            ])
            .await;

        match describe {
            Ok(_) => Ok(()),
            Err(SyncError::ManagedRegistry(msg)) if msg.contains(REPOSITORY_NOT_FOUND) => self
                .run(&[
                    "ecr",
                    "create-repository",
                    "--region",
                    &identity.region,
                    "--registry-id",
                    &identity.account,
                    "--repository-name",
                    name,
                ])
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ecr_endpoint() {
        let identity = EcrIdentity::parse("123456789012.dkr.ecr.eu-central-1.amazonaws.com/mirror").unwrap();
        assert_eq!(identity.account, "123456789012");
        assert_eq!(identity.region, "eu-central-1");

        assert!(EcrIdentity::parse("123456789012.dkr.ecr.cn-north-1.amazonaws.com.cn").is_some());
    }

    #[test]
    fn test_parse_is_pure_and_idempotent() {
        let endpoint = "123456789012.dkr.ecr.us-east-1.amazonaws.com";
        assert_eq!(EcrIdentity::parse(endpoint), EcrIdentity::parse(endpoint));
    }

    #[test]
    fn test_other_registries_are_not_ecr() {
        assert!(EcrIdentity::parse("docker.io/library/alpine").is_none());
        assert!(EcrIdentity::parse("registry.acme.com").is_none());
        assert!(EcrIdentity::parse("public.ecr.aws/bottlerocket").is_none());
        assert!(EcrIdentity::parse(".dkr.ecr.us-east-1.amazonaws.com").is_none());
        assert!(EcrIdentity::parse("1.dkr.ecr.us-east-1.amazonaws.company.io").is_none());
        assert!(EcrIdentity::parse("1.dkr.ecr.us-east-1.amazonaws.com.evil.io").is_none());
    }

    #[test]
    fn test_parse_accepts_port_suffix() {
        let identity = EcrIdentity::parse("123456789012.dkr.ecr.us-east-1.amazonaws.com:443/app").unwrap();
        assert_eq!(identity.region, "us-east-1");
        assert!(EcrIdentity::parse("123456789012.dkr.ecr.cn-north-1.amazonaws.com.cn:443").is_some());
    }

    #[tokio::test]
    async fn test_missing_cli_is_managed_registry_error() {
        let ecr = AwsCliEcr::new().with_program("/nonexistent/aws-cli");
        let err = ecr.issue_token("eu-west-1").await.unwrap_err();
        assert!(matches!(err, SyncError::ManagedRegistry(ref msg) if msg.contains("cannot run")));
    }
}
