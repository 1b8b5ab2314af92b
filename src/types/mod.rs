// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource and artifact value types.

pub mod artifact;
pub mod oci_secret;

pub use artifact::{ArtifactContent, ArtifactDigest, FileMap, PullCredential};
pub use oci_secret::{OCISecret, OCISecretSpec, SecretRef, SyncFiles};
