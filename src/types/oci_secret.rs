// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{OciSyncError, Result};

/// Desired state: which artifact to project into which secret.
///
/// Field names on the wire follow the published CRD schema, which mixes casing.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "oci-sync.brtrm.de", version = "v1alpha1", kind = "OCISecret")]
#[kube(shortname = "ocisec")]
pub struct OCISecretSpec {
    /// Tag or digest of the artifact inside the repository
    #[serde(rename = "orasArtefact")]
    pub artifact_reference: String,

    /// Repository address, e.g. `ghcr.io/org/configs`
    #[serde(rename = "ArtefactRegistry")]
    pub registry_address: String,

    #[serde(rename = "Sync", default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncFiles>,

    #[serde(
        rename = "ArtefactPullSecret",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pull_secret: Option<SecretRef>,

    #[serde(rename = "targetSecret")]
    pub target_secret: SecretRef,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
pub struct SyncFiles {
    /// Files to project; empty means all of them
    #[serde(rename = "Files", default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

/// Namespaced reference to a Secret
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
pub struct SecretRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl SecretRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        SecretRef {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or_default()
    }

    /// A reference is only usable when both parts are set
    pub fn is_complete(&self) -> bool {
        !self.name().is_empty() && !self.namespace().is_empty()
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace(), self.name())
    }
}

impl OCISecret {
    /// Files to keep in the target secret, empty meaning no restriction
    pub fn allow_list(&self) -> &[String] {
        self.spec
            .sync
            .as_ref()
            .map(|s| s.files.as_slice())
            .unwrap_or_default()
    }

    /// The pull secret reference, if one is configured
    pub fn pull_secret_ref(&self) -> Option<&SecretRef> {
        self.spec.pull_secret.as_ref().filter(|r| r.is_complete())
    }

    /// Check the fields the registry layer cannot do without
    pub fn validate(&self) -> Result<()> {
        if self.spec.artifact_reference.trim().is_empty() {
            return Err(OciSyncError::InvalidSpec(
                "orasArtefact must not be empty".to_string(),
            ));
        }
        if self.spec.registry_address.trim().is_empty() {
            return Err(OciSyncError::InvalidSpec(
                "ArtefactRegistry must not be empty".to_string(),
            ));
        }
        if !self.spec.target_secret.is_complete() {
            return Err(OciSyncError::InvalidSpec(
                "targetSecret needs both name and namespace".to_string(),
            ));
        }
        Ok(())
    }
}
