// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Target secret construction and change detection

use crate::constants::{annotations, PULL_SECRET_KEY, SENTINEL_DIGEST};
use crate::error::{OciSyncError, Result};
use crate::types::{ArtifactContent, ArtifactDigest, OCISecret, PullCredential};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{api::ObjectMeta, Resource, ResourceExt};
use std::collections::BTreeMap;

/// Extract the Docker config payload from a pull secret
pub fn pull_credential(secret: &Secret) -> Result<PullCredential> {
    secret
        .data
        .as_ref()
        .and_then(|d| d.get(PULL_SECRET_KEY))
        .filter(|v| !v.0.is_empty())
        .map(|v| PullCredential::new(v.0.clone()))
        .ok_or_else(|| {
            OciSyncError::NotFound(format!(
                "Pull secret {}/{} has no '{}' key",
                secret.namespace().unwrap_or_default(),
                secret.name_any(),
                PULL_SECRET_KEY
            ))
        })
}

/// Digest recorded on the target secret by the last successful sync
pub fn last_synced_digest(secret: &Secret) -> Option<&str> {
    secret
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::LAST_SYNCED_DIGEST))
        .map(String::as_str)
}

/// Whether the target secret has to be rewritten.
///
/// Besides a digest change, a non-empty allow-list whose length differs from the
/// number of stored files also triggers a sync, catching earlier passes that
/// stored fewer files than requested.
pub fn needs_sync(secret: &Secret, current: &ArtifactDigest, allow_list: &[String]) -> bool {
    let digest_changed = last_synced_digest(secret) != Some(current.as_str());
    let stored_files = secret.data.as_ref().map_or(0, BTreeMap::len);
    let count_mismatch = !allow_list.is_empty() && stored_files != allow_list.len();

    digest_changed || count_mismatch
}

/// A new, empty target secret owned by `owner` and marked as never synced
pub fn new_target_secret(owner: &OCISecret) -> Result<Secret> {
    let target = &owner.spec.target_secret;
    let owner_ref = owner.controller_owner_ref(&()).ok_or_else(|| {
        OciSyncError::InvalidSpec(format!(
            "OCISecret {} has no uid to own {}",
            owner.name_any(),
            target
        ))
    })?;

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(target.name().to_string()),
            namespace: Some(target.namespace().to_string()),
            annotations: Some(BTreeMap::from([(
                annotations::LAST_SYNCED_DIGEST.to_string(),
                SENTINEL_DIGEST.to_string(),
            )])),
            owner_references: Some(vec![owner_ref]),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        ..Default::default()
    })
}

/// Replace the data of `secret` with `content` and record its digest.
/// Other annotations and metadata are kept as they are.
pub fn apply_content(secret: &mut Secret, content: ArtifactContent) {
    secret.data = Some(
        content
            .files
            .into_iter()
            .map(|(name, bytes)| (name, ByteString(bytes)))
            .collect(),
    );
    secret.string_data = None;
    secret.annotations_mut().insert(
        annotations::LAST_SYNCED_DIGEST.to_string(),
        content.digest.to_string(),
    );
}
