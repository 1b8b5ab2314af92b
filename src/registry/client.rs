// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Connection handle for one registry repository

use crate::error::{OciSyncError, Result};
use crate::registry::credentials::CredentialStore;
use crate::registry::retry::RetryPolicy;
use crate::types::PullCredential;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Settings shared by every handle the operator builds
#[derive(Debug, Clone, Default)]
pub struct RegistryOptions {
    /// Registries spoken to over plain HTTP
    pub insecure_registries: Vec<String>,
    pub retry: RetryPolicy,
    /// Parent directory for staging areas
    pub staging_dir: Option<PathBuf>,
}

/// Authenticated (or anonymous) handle to a single repository.
///
/// Bearer tokens obtained from the registry are cached inside the underlying
/// client, so they live as long as this handle and no longer.
pub struct RegistryClient {
    client: Client,
    registry: String,
    repository: String,
    auth: RegistryAuth,
    retry: RetryPolicy,
}

impl RegistryClient {
    /// Build a handle for `address` (`host[:port]/repository`).
    ///
    /// Empty or missing credential bytes mean anonymous access.
    #[instrument(skip(credential, options))]
    pub fn new(
        address: &str,
        credential: Option<&PullCredential>,
        options: &RegistryOptions,
    ) -> Result<Self> {
        let (registry, repository) = parse_address(address)?;

        let auth = match credential.filter(|c| !c.is_empty()) {
            Some(credential) => {
                let store = CredentialStore::from_docker_config(credential.as_bytes())?;
                debug!("Loaded {} registry credential entries", store.len());
                store.auth_for(&registry)
            }
            None => RegistryAuth::Anonymous,
        };

        let protocol = if options.insecure_registries.is_empty() {
            ClientProtocol::Https
        } else {
            ClientProtocol::HttpsExcept(options.insecure_registries.clone())
        };
        let client = Client::new(ClientConfig {
            protocol,
            ..Default::default()
        });

        debug!(
            "Prepared {} access to {}/{}",
            if matches!(auth, RegistryAuth::Anonymous) {
                "anonymous"
            } else {
                "authenticated"
            },
            registry,
            repository
        );

        Ok(Self {
            client,
            registry,
            repository,
            auth,
            retry: options.retry,
        })
    }

    /// Resolve a tag or digest within this repository
    pub fn reference(&self, artifact: &str) -> Result<Reference> {
        let artifact = artifact.trim();
        if artifact.is_empty() {
            return Err(OciSyncError::RegistryConfigInvalid(
                "artifact reference is empty".to_string(),
            ));
        }

        // A digest is `<algorithm>:<hex>`; tags may not contain ':'
        let separator = if artifact.contains(':') { '@' } else { ':' };
        let raw = format!("{}/{}{}{}", self.registry, self.repository, separator, artifact);
        raw.parse::<Reference>().map_err(|e| {
            OciSyncError::RegistryConfigInvalid(format!(
                "Invalid artifact reference '{}': {}",
                raw, e
            ))
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn auth(&self) -> &RegistryAuth {
        &self.auth
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }
}

/// Split `host[:port]/repository` into its parts, rejecting tags and digests
fn parse_address(address: &str) -> Result<(String, String)> {
    let address = address.trim().trim_end_matches('/');
    if address.is_empty() {
        return Err(OciSyncError::RegistryConfigInvalid(
            "registry address is empty".to_string(),
        ));
    }
    if address.contains("://") {
        return Err(OciSyncError::RegistryConfigInvalid(format!(
            "Registry address '{}' must not carry a scheme",
            address
        )));
    }

    let Some((_, last_segment)) = address.rsplit_once('/') else {
        return Err(OciSyncError::RegistryConfigInvalid(format!(
            "Registry address '{}' must be of the form host/repository",
            address
        )));
    };
    if address.contains('@') || last_segment.contains(':') {
        return Err(OciSyncError::RegistryConfigInvalid(format!(
            "Registry address '{}' must not include a tag or digest",
            address
        )));
    }

    let reference: Reference = address.parse().map_err(|e| {
        OciSyncError::RegistryConfigInvalid(format!(
            "Invalid registry address '{}': {}",
            address, e
        ))
    })?;

    Ok((
        reference.registry().to_string(),
        reference.repository().to_string(),
    ))
}
