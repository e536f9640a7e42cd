//! In-memory stand-in for the Docker daemon and the ECR service
#![allow(dead_code)]

use async_trait::async_trait;
use docker_image_syncer::error::{Result, SyncError};
use docker_image_syncer::logging::Logger;
use docker_image_syncer::registry::{
    EcrIdentity, Image, ImageRef, ManagedRegistry, RegistryClient, RegistryToken,
};
use docker_image_syncer::sync::{Location, Mapping, Syncer, Task};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    Pull { reference: String, auth: String, all_tags: bool },
    List(String),
    Tag { id: String, reference: String },
    Push { reference: String, auth: String, all_tags: bool },
    IssueToken(String),
    EnsureRepository { account: String, region: String, name: String },
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    /// name -> [(tag, id)] available for pulling
    remote: HashMap<String, Vec<(String, String)>>,
    /// local `name:tag` -> id
    local: BTreeMap<String, String>,
    pushed: Vec<String>,
    fail_pull: HashSet<String>,
    fail_push: HashSet<String>,
    /// target names whose tagging fails
    fail_tag: HashSet<String>,
    /// exact references whose listing fails
    fail_list: HashSet<String>,
    /// names whose listing comes back empty
    unlisted: HashSet<String>,
    fail_ensure: bool,
    fail_token: bool,
    pull_delay: Duration,
    running: usize,
    max_running: usize,
}

#[derive(Clone, Default)]
pub struct FakeDaemon {
    state: Arc<Mutex<State>>,
}

impl FakeDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote(self, name: &str, tags: &[(&str, &str)]) -> Self {
        self.state.lock().unwrap().remote.insert(
            name.to_string(),
            tags.iter().map(|(t, id)| (t.to_string(), id.to_string())).collect(),
        );
        self
    }

    pub fn fail_pull(self, name: &str) -> Self {
        self.state.lock().unwrap().fail_pull.insert(name.to_string());
        self
    }

    pub fn fail_push(self, name: &str) -> Self {
        self.state.lock().unwrap().fail_push.insert(name.to_string());
        self
    }

    pub fn fail_tag(self, name: &str) -> Self {
        self.state.lock().unwrap().fail_tag.insert(name.to_string());
        self
    }

    pub fn fail_list(self, reference: &str) -> Self {
        self.state.lock().unwrap().fail_list.insert(reference.to_string());
        self
    }

    pub fn unlisted(self, name: &str) -> Self {
        self.state.lock().unwrap().unlisted.insert(name.to_string());
        self
    }

    pub fn fail_ensure(self) -> Self {
        self.state.lock().unwrap().fail_ensure = true;
        self
    }

    pub fn fail_token(self) -> Self {
        self.state.lock().unwrap().fail_token = true;
        self
    }

    pub fn with_pull_delay(self, delay: Duration) -> Self {
        self.state.lock().unwrap().pull_delay = delay;
        self
    }

    pub fn syncer(&self) -> Syncer {
        Syncer::new(Box::new(self.clone()), Box::new(self.clone()), Logger::new_quiet())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn pulls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Pull { .. }))
            .collect()
    }

    pub fn pushes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Push { .. }))
            .collect()
    }

    pub fn tags(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Tag { .. }))
            .collect()
    }

    pub fn local_tags(&self) -> Vec<String> {
        self.state.lock().unwrap().local.keys().cloned().collect()
    }

    /// `name:tag` entries sent by pushes so far
    pub fn pushed(&self) -> Vec<String> {
        self.state.lock().unwrap().pushed.clone()
    }

    pub fn max_concurrent(&self) -> usize {
        self.state.lock().unwrap().max_running
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl RegistryClient for FakeDaemon {
    async fn ping(&self, _max_attempts: u32, _interval: Duration) -> Result<()> {
        self.record(Call::Ping);
        Ok(())
    }

    async fn pull(&self, reference: &str, auth: &str, all_tags: bool, _verbose: bool) -> Result<()> {
        self.record(Call::Pull {
            reference: reference.to_string(),
            auth: auth.to_string(),
            all_tags,
        });

        let delay = {
            let mut state = self.state.lock().unwrap();
            state.running += 1;
            state.max_running = state.max_running.max(state.running);
            state.pull_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.running -= 1;

        let parsed = ImageRef::parse(reference);
        let name = parsed.name();
        if state.fail_pull.contains(&name) {
            return Err(SyncError::Daemon(format!("pull access denied for {}", name)));
        }

        let available = state
            .remote
            .get(&name)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("repository {} not found", name)))?;

        let wanted: Vec<(String, String)> = if all_tags {
            available
        } else {
            let tag = parsed.tag.unwrap_or_else(|| "latest".to_string());
            let found = available
                .into_iter()
                .find(|(t, _)| *t == tag)
                .ok_or_else(|| SyncError::NotFound(format!("manifest for {}:{} not found", name, tag)))?;
            vec![found]
        };

        for (tag, id) in wanted {
            state.local.insert(format!("{}:{}", name, tag), id);
        }
        Ok(())
    }

    async fn list(&self, reference: &str) -> Result<Vec<Image>> {
        self.record(Call::List(reference.to_string()));

        let wanted = ImageRef::parse(reference);
        let name = wanted.name();
        let state = self.state.lock().unwrap();
        if state.fail_list.contains(reference) {
            return Err(SyncError::Daemon(format!("cannot list {}", reference)));
        }
        if state.unlisted.contains(&name) {
            return Ok(Vec::new());
        }

        let mut by_id: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (local_ref, id) in &state.local {
            let candidate = ImageRef::parse(local_ref);
            if candidate.name() != name {
                continue;
            }
            let Some(tag) = candidate.tag else { continue };
            if wanted.tag.as_ref().is_some_and(|t| *t != tag) {
                continue;
            }
            by_id.entry(id.clone()).or_default().push(tag);
        }

        Ok(by_id
            .into_iter()
            .map(|(id, tags)| Image::new(id, wanted.repo.clone(), wanted.path.clone(), tags))
            .collect())
    }

    async fn tag(&self, image_id: &str, new_reference: &str) -> Result<()> {
        self.record(Call::Tag {
            id: image_id.to_string(),
            reference: new_reference.to_string(),
        });
        let mut state = self.state.lock().unwrap();
        let name = ImageRef::parse(new_reference).name();
        if state.fail_tag.contains(&name) {
            return Err(SyncError::Daemon(format!("invalid reference format: {}", new_reference)));
        }
        state.local.insert(new_reference.to_string(), image_id.to_string());
        Ok(())
    }

    async fn push(&self, reference: &str, all_tags: bool, auth: &str, _verbose: bool) -> Result<()> {
        self.record(Call::Push {
            reference: reference.to_string(),
            auth: auth.to_string(),
            all_tags,
        });

        let parsed = ImageRef::parse(reference);
        let name = parsed.name();
        let mut state = self.state.lock().unwrap();
        if state.fail_push.contains(&name) {
            return Err(SyncError::Auth(format!("denied: requested access to {} is denied", name)));
        }

        let tags: Vec<String> = state
            .local
            .keys()
            .filter(|local_ref| {
                let candidate = ImageRef::parse(local_ref);
                candidate.name() == name && (all_tags || candidate.tag == parsed.tag)
            })
            .cloned()
            .collect();
        state.pushed.extend(tags);
        Ok(())
    }
}

#[async_trait]
impl ManagedRegistry for FakeDaemon {
    async fn issue_token(&self, region: &str) -> Result<RegistryToken> {
        self.record(Call::IssueToken(region.to_string()));
        if self.state.lock().unwrap().fail_token {
            return Err(SyncError::ManagedRegistry("unable to locate credentials".to_string()));
        }
        Ok(RegistryToken {
            username: "AWS".to_string(),
            password: format!("token-{}", region),
        })
    }

    async fn ensure_repository(&self, identity: &EcrIdentity, name: &str) -> Result<()> {
        self.record(Call::EnsureRepository {
            account: identity.account.clone(),
            region: identity.region.clone(),
            name: name.to_string(),
        });
        if self.state.lock().unwrap().fail_ensure {
            return Err(SyncError::ManagedRegistry("AccessDeniedException: ecr:CreateRepository".to_string()));
        }
        Ok(())
    }
}

pub fn task(name: &str, source: &str, target: &str, mappings: Vec<Mapping>, interval: Duration) -> Task {
    Task {
        name: name.to_string(),
        source: Location::new(source, ""),
        target: Location::new(target, ""),
        mappings,
        interval,
        verbose: false,
    }
}

pub fn tags(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|t| t.to_string()).collect()
}
