// This file contains the DockerClient, which drives a container daemon
// through the Docker Engine HTTP API: pulling, listing, tagging and pushing
// images on behalf of the sync engine.

use crate::error::handlers::{DaemonErrorHandler, NetworkErrorHandler};
use crate::error::{Result, SyncError};
use crate::logging::Logger;
use crate::registry::auth::RegistryAuth;
use crate::registry::{Image, ImageRef, RegistryClient, normalize_name};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_DOCKER_HOST: &str = "tcp://127.0.0.1:2375";
pub const DEFAULT_API_VERSION: &str = "1.24";

const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

pub struct DockerClientBuilder {
    host: String,
    api_version: String,
    connect_timeout: Duration,
    ping_timeout: Duration,
    output: Logger,
}

impl DockerClientBuilder {
    pub fn new(host: String) -> Self {
        Self {
            host,
            api_version: DEFAULT_API_VERSION.to_string(),
            connect_timeout: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(5),
            output: Logger::new_quiet(),
        }
    }

    pub fn with_api_version(mut self, api_version: String) -> Self {
        if !api_version.is_empty() {
            self.api_version = api_version.trim_start_matches('v').to_string();
        }
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Deadline for a single ping attempt, response included
    pub fn with_ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    pub fn with_logger(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Result<DockerClient> {
        let base_url = resolve_host(&self.host)?;

        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("cannot create Docker client: {}", e)))?;

        Ok(DockerClient {
            client,
            base_url,
            api_version: self.api_version,
            ping_timeout: self.ping_timeout,
            output: self.output,
        })
    }
}

pub struct DockerClient {
    client: Client,
    base_url: Url,
    api_version: String,
    ping_timeout: Duration,
    output: Logger,
}

impl DockerClient {
    pub fn builder(host: String) -> DockerClientBuilder {
        DockerClientBuilder::new(host)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.api_version,
            path
        )
    }

    async fn ping_once(&self) -> Result<()> {
        let url = format!("{}/_ping", self.base_url.as_str().trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .timeout(self.ping_timeout)
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "ping"))?;
        check_status(response, "ping").await.map(|_| ())
    }

    /// Drain the daemon's JSON message stream, failing on the first error message
    async fn consume_messages(&self, response: Response, verbose: bool) -> Result<()> {
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| NetworkErrorHandler::handle_network_error(&e, "message stream"))?;
            buffer.extend_from_slice(&chunk);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                self.handle_message(&String::from_utf8_lossy(&line), verbose)?;
            }
        }

        if !buffer.is_empty() {
            self.handle_message(&String::from_utf8_lossy(&buffer), verbose)?;
        }
        Ok(())
    }

    fn handle_message(&self, line: &str, verbose: bool) -> Result<()> {
        if let Some(text) = check_message(line)? {
            if verbose {
                self.output.info(&text);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for DockerClient {
    async fn ping(&self, max_attempts: u32, interval: Duration) -> Result<()> {
        let max_attempts = max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match self.ping_once().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    self.output.warning(&format!(
                        "Docker daemon not reachable (attempt {}/{}): {}",
                        attempt, max_attempts, e
                    ));
                    last_error = Some(e);
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        Err(SyncError::Daemon(format!(
            "Docker daemon not reachable after {} attempts: {}",
            max_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn pull(&self, reference: &str, auth: &str, all_tags: bool, verbose: bool) -> Result<()> {
        let parsed = ImageRef::parse(reference);
        let mut query = vec![("fromImage", parsed.name())];
        if !all_tags {
            query.push(("tag", parsed.tag.clone().unwrap_or_else(|| "latest".to_string())));
        }

        let response = self
            .client
            .post(self.endpoint("/images/create"))
            .query(&query)
            .header(REGISTRY_AUTH_HEADER, RegistryAuth::header_value(auth))
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "pull"))?;

        let response = check_status(response, "pull").await?;
        self.consume_messages(response, verbose).await
    }

    async fn list(&self, reference: &str) -> Result<Vec<Image>> {
        let response = self
            .client
            .get(self.endpoint("/images/json"))
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "list"))?;

        let response = check_status(response, "list").await?;
        let body = response.text().await?;
        let summaries: Vec<ImageSummary> = serde_json::from_str(&body)?;

        Ok(images_matching(&ImageRef::parse(reference), summaries))
    }

    async fn tag(&self, image_id: &str, new_reference: &str) -> Result<()> {
        let parsed = ImageRef::parse(new_reference);
        let tag = parsed.tag.clone().unwrap_or_else(|| "latest".to_string());

        let response = self
            .client
            .post(self.endpoint(&format!("/images/{}/tag", image_id)))
            .query(&[("repo", parsed.name()), ("tag", tag)])
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "tag"))?;

        check_status(response, "tag").await.map(|_| ())
    }

    async fn push(&self, reference: &str, all_tags: bool, auth: &str, verbose: bool) -> Result<()> {
        let parsed = ImageRef::parse(reference);
        let mut request = self
            .client
            .post(self.endpoint(&format!("/images/{}/push", parsed.name())))
            .header(REGISTRY_AUTH_HEADER, RegistryAuth::header_value(auth));
        if !all_tags {
            request = request.query(&[("tag", parsed.tag.clone().unwrap_or_else(|| "latest".to_string()))]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "push"))?;

        let response = check_status(response, "push").await?;
        self.consume_messages(response, verbose).await
    }
}

/// Entry of `GET /images/json`
#[derive(Debug, Deserialize)]
struct ImageSummary {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "RepoTags", default)]
    repo_tags: Option<Vec<String>>,
}

/// One line of a pull/push progress stream
#[derive(Debug, Default, Deserialize)]
struct JsonMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    progress: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(rename = "errorDetail", default)]
    error_detail: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Turn a `tcp://`, `http://` or `https://` daemon address into a base URL
pub fn resolve_host(host: &str) -> Result<Url> {
    let host = host.trim();
    let host = if host.is_empty() { DEFAULT_DOCKER_HOST } else { host };

    let url = if let Some(rest) = host.strip_prefix("tcp://") {
        Url::parse(&format!("http://{}", rest))?
    } else if !host.contains("://") {
        Url::parse(&format!("http://{}", host))?
    } else {
        Url::parse(host)?
    };

    match url.scheme() {
        "http" | "https" => Ok(url),
        "unix" | "npipe" => Err(SyncError::Config(format!(
            "cannot create Docker client for '{}': socket transports are not supported, expose the daemon via tcp://",
            host
        ))),
        other => Err(SyncError::Config(format!(
            "cannot create Docker client: unsupported scheme '{}' in '{}'",
            other, host
        ))),
    }
}

async fn check_status(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string());
    Err(DaemonErrorHandler::handle_image_error(status, &error_text, operation))
}

/// Check one stream line; returns the text worth showing, if any
fn check_message(line: &str) -> Result<Option<String>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let message: JsonMessage = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(_) => return Ok(Some(line.to_string())),
    };

    if let Some(detail) = message.error_detail.and_then(|d| d.message) {
        return Err(SyncError::Daemon(detail));
    }
    if let Some(error) = message.error {
        return Err(SyncError::Daemon(error));
    }

    let text = [message.id, message.status, message.progress]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Images whose tags fall under `wanted`, bound to the requested repo/path
fn images_matching(wanted: &ImageRef, summaries: Vec<ImageSummary>) -> Vec<Image> {
    let wanted_name = normalize_name(&wanted.name());

    let mut images: Vec<Image> = summaries
        .into_iter()
        .filter_map(|summary| {
            let tags: Vec<String> = summary
                .repo_tags
                .unwrap_or_default()
                .iter()
                .filter_map(|repo_tag| {
                    let candidate = ImageRef::parse(repo_tag);
                    if normalize_name(&candidate.name()) != wanted_name {
                        return None;
                    }
                    let tag = candidate.tag?;
                    match &wanted.tag {
                        Some(wanted_tag) if *wanted_tag != tag => None,
                        _ => Some(tag),
                    }
                })
                .collect();

            if tags.is_empty() {
                None
            } else {
                Some(Image::new(summary.id, wanted.repo.clone(), wanted.path.clone(), tags))
            }
        })
        .collect();

    images.sort_by(|a, b| a.id.cmp(&b.id));
    images
}
