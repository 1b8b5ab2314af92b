// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Values exchanged between the registry layer and the reconciler.

use std::collections::BTreeMap;
use std::fmt;

/// Opaque content identifier of an artifact manifest (`<algorithm>:<hex>`).
///
/// Only ever compared byte for byte; never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactDigest(String);

impl ArtifactDigest {
    pub fn new(digest: impl Into<String>) -> Self {
        ArtifactDigest(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ArtifactDigest {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// File name to file content
pub type FileMap = BTreeMap<String, Vec<u8>>;

/// Everything one full retrieval produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactContent {
    pub digest: ArtifactDigest,
    pub files: FileMap,
}

/// Raw Docker config JSON taken from a pull secret
#[derive(Clone, PartialEq, Eq)]
pub struct PullCredential(Vec<u8>);

impl PullCredential {
    pub fn new(bytes: Vec<u8>) -> Self {
        PullCredential(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Never print credential material
impl fmt::Debug for PullCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PullCredential({} bytes)", self.0.len())
    }
}
