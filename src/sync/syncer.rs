// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One reconcile pass: bring a target secret in line with its OCI artifact.

use crate::config::Config;
use crate::error::{OciSyncError, Result};
use crate::filter::filter_files;
use crate::kubernetes::SecretStore;
use crate::registry::RegistryConnector;
use crate::sync::secrets::{
    apply_content, last_synced_digest, needs_sync, new_target_secret, pull_credential,
};
use crate::types::{OCISecret, PullCredential};
use kube::ResourceExt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

/// Drives OCISecrets towards their desired state.
///
/// Keeps no state between passes apart from what is stored on the target secret.
/// Callers must not run two passes for the same OCISecret concurrently.
pub struct SecretSyncer<S, R> {
    store: S,
    registry: R,
    config: Config,
}

impl<S: SecretStore, R: RegistryConnector> SecretSyncer<S, R> {
    pub fn new(store: S, registry: R, config: Config) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Reconcile the OCISecret called `name` and return when to look again
    #[instrument(skip(self))]
    pub async fn reconcile(&self, name: &str) -> Result<Duration> {
        let Some(oci_secret) = self.store.get_sync_spec(name).await? else {
            // Deleted; the target secret goes with it through its owner reference
            info!("OCISecret not found, nothing to do");
            return Ok(self.config.requeue_interval);
        };
        oci_secret.validate()?;

        let credential = self.resolve_credential(&oci_secret).await?;
        let deadline = Instant::now() + self.config.registry_timeout;
        let source = self.registry.connect(
            &oci_secret.spec.registry_address,
            credential.as_ref(),
            deadline,
        )?;

        let artifact = &oci_secret.spec.artifact_reference;
        let current_digest = source.fetch_digest(artifact).await?;

        let target_ref = &oci_secret.spec.target_secret;
        if self.store.get_secret(target_ref).await?.is_none() {
            let secret = new_target_secret(&oci_secret)?;
            self.store.create_secret(&secret).await?;
            info!("Created target secret {}", target_ref);
        }

        // Always compare against what the store holds, never the object just sent
        let mut target = self.store.get_secret(target_ref).await?.ok_or_else(|| {
            OciSyncError::persist_failed(
                target_ref.to_string(),
                "target secret missing right after creation",
            )
        })?;

        let allow_list = oci_secret.allow_list();
        if !needs_sync(&target, &current_digest, allow_list) {
            debug!(
                "Target secret {} is current at {}",
                target_ref, current_digest
            );
            return Ok(self.config.requeue_interval);
        }

        info!(
            "Target secret {} is stale ({} -> {}), syncing",
            target_ref,
            last_synced_digest(&target).unwrap_or("<none>"),
            current_digest
        );

        let mut content = source.fetch_content(artifact).await?;
        filter_files(&mut content.files, allow_list);
        let file_count = content.files.len();
        let synced_digest = content.digest.clone();

        apply_content(&mut target, content);
        self.store.replace_secret(&target).await?;

        info!(
            "Synced {} files into {} at {}",
            file_count, target_ref, synced_digest
        );
        Ok(self.config.requeue_interval)
    }

    /// Load the pull secret if one is referenced; `None` means anonymous access
    async fn resolve_credential(&self, oci_secret: &OCISecret) -> Result<Option<PullCredential>> {
        let Some(pull_ref) = oci_secret.pull_secret_ref() else {
            debug!(
                "No pull secret configured for {}, using anonymous access",
                oci_secret.name_any()
            );
            return Ok(None);
        };

        let secret = self.store.get_secret(pull_ref).await?.ok_or_else(|| {
            OciSyncError::NotFound(format!("Pull secret {} does not exist", pull_ref))
        })?;

        pull_credential(&secret).map(Some)
    }
}
