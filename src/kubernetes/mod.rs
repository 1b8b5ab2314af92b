// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes access: CRD discovery and the secret store.

pub mod crd;
pub mod store;

pub use crd::wait_for_oci_secret_crd;
pub use store::{KubeSecretStore, SecretStore};
