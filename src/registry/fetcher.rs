// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Digest lookups and full artifact retrieval over a [`RegistryClient`]

use crate::constants::oci::{TITLE_ANNOTATION, UNPACK_ANNOTATION};
use crate::error::{OciSyncError, Result};
use crate::registry::client::RegistryClient;
use crate::registry::retry::is_transient;
use crate::registry::staging::StagingArea;
use crate::registry::ArtifactSource;
use crate::types::{ArtifactContent, ArtifactDigest};
use async_trait::async_trait;
use oci_distribution::manifest::{OciDescriptor, OciImageIndex, OciImageManifest, OciManifest};
use oci_distribution::Reference;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

pub struct ArtifactFetcher {
    client: RegistryClient,
    deadline: Instant,
    staging_dir: Option<PathBuf>,
}

impl ArtifactFetcher {
    /// Every operation on this fetcher must complete before `deadline`
    pub fn new(client: RegistryClient, deadline: Instant) -> Self {
        Self {
            client,
            deadline,
            staging_dir: None,
        }
    }

    /// Create staging areas under `dir` instead of the system temp dir
    pub fn with_staging_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.staging_dir = dir;
        self
    }

    async fn pull_digest(&self, reference: &Reference) -> Result<ArtifactDigest> {
        let inner = self.client.client();
        let auth = self.client.auth();

        let digest = self
            .client
            .retry()
            .run("manifest digest lookup", is_transient, move || {
                inner.fetch_manifest_digest(reference, auth)
            })
            .await
            .map_err(|e| OciSyncError::fetch_failed(format!("digest of {}", reference), e))?;

        Ok(ArtifactDigest::new(digest))
    }

    /// Pull the manifest and the titled layers of every image it covers into a
    /// staging area, then read the staged top-level files back.
    ///
    /// The returned digest is the one of the manifest `reference` points at, an
    /// index included, so it always matches [`ArtifactFetcher::pull_digest`].
    /// The staging area is gone once this returns or the future is dropped.
    async fn pull_content(&self, reference: &Reference) -> Result<ArtifactContent> {
        let staging = StagingArea::new(self.staging_dir.as_deref())?;

        let (root, digest) = self.pull_manifest(reference).await?;
        let images = match root {
            OciManifest::Image(manifest) => vec![manifest],
            OciManifest::ImageIndex(index) => self.pull_index_images(reference, &index).await?,
        };

        let mut staged = HashSet::new();
        for layer in images.iter().flat_map(|image| &image.layers) {
            let annotations = layer.annotations.as_ref();
            let Some(title) = annotations.and_then(|a| a.get(TITLE_ANNOTATION)) else {
                debug!("Skipping untitled layer {}", layer.digest);
                continue;
            };
            if annotations
                .and_then(|a| a.get(UNPACK_ANNOTATION))
                .is_some_and(|v| v == "true")
            {
                debug!("Skipping directory layer {} ({})", title, layer.digest);
                continue;
            }
            if !staged.insert(layer.digest.as_str()) {
                continue;
            }

            let data = self.pull_layer(reference, layer).await?;
            staging.write(title, &data).await?;
        }

        let files = staging.read_files().await?;

        Ok(ArtifactContent {
            digest: ArtifactDigest::new(digest),
            files,
        })
    }

    async fn pull_manifest(&self, reference: &Reference) -> Result<(OciManifest, String)> {
        let inner = self.client.client();
        let auth = self.client.auth();

        self.client
            .retry()
            .run("manifest pull", is_transient, move || {
                inner.pull_manifest(reference, auth)
            })
            .await
            .map_err(|e| OciSyncError::fetch_failed(format!("manifest of {}", reference), e))
    }

    /// Image manifests listed by `index`. Nested indexes are not followed.
    async fn pull_index_images(
        &self,
        reference: &Reference,
        index: &OciImageIndex,
    ) -> Result<Vec<OciImageManifest>> {
        debug!("Index {} lists {} manifests", reference, index.manifests.len());

        let mut images = Vec::with_capacity(index.manifests.len());
        for entry in &index.manifests {
            let child = Reference::with_digest(
                reference.registry().to_string(),
                reference.repository().to_string(),
                entry.digest.clone(),
            );
            match self.pull_manifest(&child).await? {
                (OciManifest::Image(manifest), _) => images.push(manifest),
                (OciManifest::ImageIndex(_), digest) => {
                    debug!("Skipping nested index {}", digest);
                }
            }
        }
        Ok(images)
    }

    async fn pull_layer(&self, reference: &Reference, layer: &OciDescriptor) -> Result<Vec<u8>> {
        let inner = self.client.client();

        let data = self
            .client
            .retry()
            .run("layer pull", is_transient, move || async move {
                let mut data: Vec<u8> = Vec::new();
                let pulled = inner.pull_blob(reference, layer, &mut data).await;
                pulled.map(|_| data)
            })
            .await
            .map_err(|e| OciSyncError::fetch_failed(format!("layer {}", layer.digest), e))?;

        verify_layer_digest(&layer.digest, &data)?;
        Ok(data)
    }
}

#[async_trait]
impl ArtifactSource for ArtifactFetcher {
    #[instrument(
        skip(self),
        fields(registry = %self.client.registry(), repository = %self.client.repository())
    )]
    async fn fetch_digest(&self, artifact: &str) -> Result<ArtifactDigest> {
        let reference = self.client.reference(artifact)?;

        let digest = timeout_at(self.deadline, self.pull_digest(&reference))
            .await
            .map_err(|e| OciSyncError::fetch_failed(format!("digest of {}", reference), e))??;

        debug!("Artifact {} resolves to {}", reference, digest);
        Ok(digest)
    }

    #[instrument(
        skip(self),
        fields(registry = %self.client.registry(), repository = %self.client.repository())
    )]
    async fn fetch_content(&self, artifact: &str) -> Result<ArtifactContent> {
        let reference = self.client.reference(artifact)?;

        let content = timeout_at(self.deadline, self.pull_content(&reference))
            .await
            .map_err(|e| {
                warn!("Deadline exceeded while pulling {}", reference);
                OciSyncError::fetch_failed(format!("content of {}", reference), e)
            })??;

        info!(
            "Pulled {} files from {} ({})",
            content.files.len(),
            reference,
            content.digest
        );
        Ok(content)
    }
}

/// Check sha256 layer digests against the bytes received. Other algorithms are
/// passed through unchecked.
fn verify_layer_digest(expected: &str, data: &[u8]) -> Result<()> {
    let Some(expected_hex) = expected.strip_prefix("sha256:") else {
        return Ok(());
    };

    let actual_hex = hex::encode(Sha256::digest(data));
    if actual_hex.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(OciSyncError::fetch_failed(
            format!("layer {}", expected),
            format!("content digest mismatch, got sha256:{}", actual_hex),
        ))
    }
}
