// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! OCISecret reconciler - watches OCISecrets and syncs each into its target secret.

use crate::config::Config;
use crate::error::{OciSyncError, Result};
use crate::kubernetes::KubeSecretStore;
use crate::registry::OciRegistry;
use crate::sync::SecretSyncer;
use crate::types::OCISecret;
use futures::StreamExt;
use kube::{
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

pub struct OciSecretReconciler {
    client: Client,
    syncer: SecretSyncer<KubeSecretStore, OciRegistry>,
    requeue_interval: Duration,
}

impl OciSecretReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        let requeue_interval = config.requeue_interval;
        let syncer = SecretSyncer::new(
            KubeSecretStore::new(client.clone()),
            OciRegistry::from_config(&config),
            config,
        );
        Self {
            client,
            syncer,
            requeue_interval,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let oci_secrets: Api<OCISecret> = Api::all(self.client.clone());
        let context = Arc::new(self);

        // The controller never runs two reconciles for the same object at once
        Controller::new(oci_secrets, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled OCISecret: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(oci_secret: Arc<OCISecret>, ctx: Arc<OciSecretReconciler>) -> Result<Action> {
    let name = oci_secret.name_any();
    debug!("Reconciling OCISecret: {}", name);

    let delay = ctx.syncer.reconcile(&name).await?;
    Ok(Action::requeue(delay))
}

fn error_policy(
    oci_secret: Arc<OCISecret>,
    error: &OciSyncError,
    ctx: Arc<OciSecretReconciler>,
) -> Action {
    error!(
        kind = ?error.kind(),
        retryable = error.is_retryable(),
        "Failed to sync OCISecret {}: {}",
        oci_secret.name_any(),
        error
    );
    Action::requeue(ctx.requeue_interval)
}
