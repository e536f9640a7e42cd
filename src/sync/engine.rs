//! Sync engine: executes tasks mapping by mapping and runs the
//! pull → list → tag → push pipeline for each of them.

use crate::error::{Result, SyncError};
use crate::logging::Logger;
use crate::registry::auth::RegistryAuth;
use crate::registry::ecr::ManagedRegistry;
use crate::registry::{Image, RegistryClient, split_ref};
use crate::sync::task::{Location, RegistryKind, Task};

/// Credentials resolved for one mapping run. Refreshed values live here and
/// are never written back into the task's locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCredentials {
    pub source: String,
    pub target: String,
}

/// Owns the registry client; not meant to be driven from more than one task at a time.
pub struct Syncer {
    client: Box<dyn RegistryClient>,
    managed: Box<dyn ManagedRegistry>,
    output: Logger,
}

impl Syncer {
    pub fn new(client: Box<dyn RegistryClient>, managed: Box<dyn ManagedRegistry>, output: Logger) -> Self {
        Self {
            client,
            managed,
            output,
        }
    }

    pub fn client(&self) -> &dyn RegistryClient {
        self.client.as_ref()
    }

    pub fn logger(&self) -> &Logger {
        &self.output
    }

    /// Sync every mapping of `task` in order. A failing mapping is logged and
    /// does not stop the ones after it. Returns the number of failed mappings.
    pub async fn sync_task(&self, task: &Task) -> usize {
        self.output.info(&format!(
            "syncing task '{}': '{}' --> '{}'",
            task.name, task.source.registry, task.target.registry
        ));

        let mut failed = 0;
        for mapping in &task.mappings {
            self.output.info(&format!("mapping '{}' to '{}'", mapping.from, mapping.to));
            let (src, trgt) = task.mapping_refs(mapping);

            let credentials = self.refresh_credentials(task).await;
            self.output.log_error(&self.ensure_target_exists(&task.target, &trgt).await);

            let result = self
                .sync(
                    &src,
                    &credentials.source,
                    &trgt,
                    &credentials.target,
                    &mapping.tags,
                    task.verbose,
                )
                .await;
            if self.output.log_error(&result) {
                failed += 1;
            }
        }

        self.output.blank();
        failed
    }

    /// Pull `src_ref` (all tags, or just `tags`), re-tag what was pulled
    /// under `trgt_ref` and push it. Pull, tag and push failures abort the
    /// call; listing failures only shrink the set of synced tags.
    pub async fn sync(
        &self,
        src_ref: &str,
        src_auth: &str,
        trgt_ref: &str,
        trgt_auth: &str,
        tags: &[String],
        verbose: bool,
    ) -> Result<()> {
        self.output.info(&format!("pulling source image '{}'", src_ref));

        if tags.is_empty() {
            self.pull(src_ref, src_auth, true, verbose).await?;
        } else {
            for tag in tags {
                self.pull(&format!("{}:{}", src_ref, tag), src_auth, false, verbose)
                    .await?;
            }
        }

        self.output.info("relevant tags");
        let mut src_images: Vec<Image> = Vec::new();

        if tags.is_empty() {
            match self.client.list(src_ref).await {
                Ok(images) => src_images = images,
                Err(e) => self.output.error(&format!(
                    "error listing all tags of source image '{}': {}",
                    src_ref, e
                )),
            }
        } else {
            for tag in tags {
                let src_ref_tagged = format!("{}:{}", src_ref, tag);
                match self.client.list(&src_ref_tagged).await {
                    Ok(images) => src_images.extend(images),
                    Err(e) => self.output.error(&format!(
                        "error listing source image '{}': {}",
                        src_ref_tagged, e
                    )),
                }
            }
        }

        for image in &src_images {
            self.output.info(&format!(" - {}", image));
        }

        self.output.info(&format!("setting tags for target image '{}'", trgt_ref));
        self.tag(&src_images, trgt_ref).await?;

        self.output.info(&format!("pushing target image '{}'", trgt_ref));
        self.client
            .push(trgt_ref, true, trgt_auth, verbose)
            .await
            .map_err(|e| SyncError::Push(e.to_string()))
    }

    async fn pull(&self, reference: &str, auth: &str, all_tags: bool, verbose: bool) -> Result<()> {
        self.client
            .pull(reference, auth, all_tags, verbose)
            .await
            .map_err(|e| SyncError::Pull {
                reference: reference.to_string(),
                reason: e.to_string(),
            })
    }

    /// Create `repo/path:tag` for every tag of every image; the first failure aborts
    async fn tag(&self, images: &[Image], target_ref: &str) -> Result<Vec<Image>> {
        let (target_repo, target_path) = split_ref(target_ref);
        let mut tagged_images = Vec::with_capacity(images.len());

        for image in images {
            let tagged = image.retarget(&target_repo, &target_path);
            for tag in &image.tags {
                self.client
                    .tag(&image.id, &format!("{}:{}", tagged.reference(), tag))
                    .await
                    .map_err(|e| SyncError::Tag(e.to_string()))?;
            }
            tagged_images.push(tagged);
        }

        Ok(tagged_images)
    }

    async fn refresh_credentials(&self, task: &Task) -> RunCredentials {
        RunCredentials {
            source: self.credential_for(&task.source).await,
            target: self.credential_for(&task.target).await,
        }
    }

    /// A failed refresh falls back to the configured credential; an invalid
    /// one is rejected later by the pull or push that uses it.
    async fn credential_for(&self, location: &Location) -> String {
        match self.refresh_auth(location).await {
            Ok(credential) => credential,
            Err(e) => {
                self.output.error(&format!(
                    "cannot refresh credential for '{}': {}",
                    location.registry, e
                ));
                location.auth.clone()
            }
        }
    }

    /// Fresh credential for managed registries; the configured one otherwise
    pub async fn refresh_auth(&self, location: &Location) -> Result<String> {
        match location.kind() {
            RegistryKind::Generic => Ok(location.auth.clone()),
            RegistryKind::Ecr(identity) => {
                let token = self.managed.issue_token(&identity.region).await?;
                RegistryAuth::from_token(&token, &location.server_address()).encode()
            }
        }
    }

    /// Create the target repository where the registry requires it
    pub async fn ensure_target_exists(&self, target: &Location, reference: &str) -> Result<()> {
        let RegistryKind::Ecr(identity) = target.kind() else {
            return Ok(());
        };

        let (_, path) = split_ref(reference);
        if path.is_empty() {
            return Ok(());
        }

        self.managed.ensure_repository(&identity, &path).await
    }
}
