// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Read/write contract for OCISecrets and the Secrets they reference

use crate::error::{OciSyncError, Result};
use crate::types::{OCISecret, SecretRef};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{api::PostParams, Api, Client, ResourceExt};
use tracing::{debug, instrument};

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// The OCISecret named `name`, `None` once deleted
    async fn get_sync_spec(&self, name: &str) -> Result<Option<OCISecret>>;

    async fn get_secret(&self, secret: &SecretRef) -> Result<Option<Secret>>;

    async fn create_secret(&self, secret: &Secret) -> Result<()>;

    /// Overwrite an existing secret; rejected if it changed since it was read
    async fn replace_secret(&self, secret: &Secret) -> Result<()>;
}

/// [`SecretStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn secret_key(secret: &Secret) -> String {
    format!(
        "{}/{}",
        secret.namespace().unwrap_or_default(),
        secret.name_any()
    )
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    #[instrument(skip(self))]
    async fn get_sync_spec(&self, name: &str) -> Result<Option<OCISecret>> {
        let api: Api<OCISecret> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    #[instrument(skip(self), fields(secret = %secret))]
    async fn get_secret(&self, secret: &SecretRef) -> Result<Option<Secret>> {
        Ok(self.secrets(secret.namespace()).get_opt(secret.name()).await?)
    }

    #[instrument(skip(self, secret), fields(secret = %secret_key(secret)))]
    async fn create_secret(&self, secret: &Secret) -> Result<()> {
        let namespace = secret.namespace().unwrap_or_default();
        self.secrets(&namespace)
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| OciSyncError::persist_failed(secret_key(secret), e))?;
        debug!("Secret created");
        Ok(())
    }

    #[instrument(skip(self, secret), fields(secret = %secret_key(secret)))]
    async fn replace_secret(&self, secret: &Secret) -> Result<()> {
        let namespace = secret.namespace().unwrap_or_default();
        self.secrets(&namespace)
            .replace(&secret.name_any(), &PostParams::default(), secret)
            .await
            .map_err(|e| OciSyncError::persist_failed(secret_key(secret), e))?;
        debug!("Secret replaced");
        Ok(())
    }
}
