// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use oci_secret_sync::config::Config;
use oci_secret_sync::constants::OPERATOR_NAME;
use oci_secret_sync::kubernetes::wait_for_oci_secret_crd;
use oci_secret_sync::reconcilers::OciSecretReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting {} operator", OPERATOR_NAME);

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: requeue_interval={:?}, registry_timeout={:?}, insecure_registries={:?}",
        config.requeue_interval, config.registry_timeout, config.insecure_registries
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for OCISecret CRD to become available...");
    wait_for_oci_secret_crd(&client).await?;

    info!("Starting reconciler...");
    OciSecretReconciler::new(client, config).run().await?;

    // The controller only returns once its watch stream ends
    warn!("Reconciler stopped unexpectedly");
    Ok(())
}
