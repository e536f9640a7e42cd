//! Runner wiring configuration, Docker client and scheduler together

use crate::cli::args::Args;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::logging::Logger;
use crate::registry::docker::DEFAULT_DOCKER_HOST;
use crate::registry::{AwsCliEcr, DockerClient};
use crate::sync::{Scheduler, Syncer, Task};
use std::path::Path;

pub struct Runner {
    args: Args,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        args.validate().map_err(SyncError::Config)?;
        Ok(Self {
            args,
            output: Logger::detect(),
        })
    }

    pub fn with_logger(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    /// Run until all one-off tasks are done and, if there are recurring
    /// tasks, until the process is asked to stop.
    pub async fn run(&self) -> Result<()> {
        let config = SyncConfig::load(Path::new(&self.args.config))?;
        let client = self.create_docker_client(&config)?;
        self.output
            .info(&format!("using Docker daemon at {}", client.base_url()));

        let tasks = self.prepare_tasks(&config);
        let syncer = Syncer::new(Box::new(client), Box::new(AwsCliEcr::new()), self.output.clone());
        let scheduler = Scheduler::new(syncer).with_ping_policy(config.ping_policy());

        scheduler.run(tasks, shutdown_signal()).await;
        Ok(())
    }

    /// Command line and environment take precedence over the config file
    fn create_docker_client(&self, config: &SyncConfig) -> Result<DockerClient> {
        let host = self
            .args
            .docker_host
            .clone()
            .or_else(|| config.docker.host.clone())
            .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string());
        let api_version = self
            .args
            .api_version
            .clone()
            .unwrap_or_else(|| config.docker.api_version.clone());

        DockerClient::builder(host)
            .with_api_version(api_version)
            .with_logger(self.output.clone())
            .build()
    }

    fn prepare_tasks(&self, config: &SyncConfig) -> Vec<Task> {
        let mut tasks = config.tasks();
        if self.args.verbose {
            for task in &mut tasks {
                task.verbose = true;
            }
        }
        tasks
    }
}

/// Completes on Ctrl-C, or SIGTERM where available
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            futures::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => futures::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = futures::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
