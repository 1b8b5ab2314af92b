// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! OCI registry access: connection handles, credentials and artifact retrieval.

pub mod client;
pub mod credentials;
pub mod fetcher;
pub mod retry;
pub mod staging;

pub use client::{RegistryClient, RegistryOptions};
pub use fetcher::ArtifactFetcher;
pub use retry::RetryPolicy;

use crate::config::Config;
use crate::error::Result;
use crate::types::{ArtifactContent, ArtifactDigest, PullCredential};
use async_trait::async_trait;
use tokio::time::Instant;

/// Read access to the artifacts of one repository
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Resolve `artifact` to its manifest digest without pulling layers
    async fn fetch_digest(&self, artifact: &str) -> Result<ArtifactDigest>;

    /// Pull every file of `artifact`. Either all files or an error.
    async fn fetch_content(&self, artifact: &str) -> Result<ArtifactContent>;
}

/// Opens an [`ArtifactSource`] for a repository address
pub trait RegistryConnector: Send + Sync {
    fn connect(
        &self,
        address: &str,
        credential: Option<&PullCredential>,
        deadline: Instant,
    ) -> Result<Box<dyn ArtifactSource>>;
}

/// Connector backed by real OCI registries
#[derive(Debug, Clone, Default)]
pub struct OciRegistry {
    options: RegistryOptions,
}

impl OciRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(RegistryOptions {
            insecure_registries: config.insecure_registries.clone(),
            retry: RetryPolicy::default(),
            staging_dir: config.staging_dir.clone(),
        })
    }
}

impl RegistryConnector for OciRegistry {
    fn connect(
        &self,
        address: &str,
        credential: Option<&PullCredential>,
        deadline: Instant,
    ) -> Result<Box<dyn ArtifactSource>> {
        let client = RegistryClient::new(address, credential, &self.options)?;
        let fetcher =
            ArtifactFetcher::new(client, deadline).with_staging_dir(self.options.staging_dir.clone());
        Ok(Box::new(fetcher))
    }
}
