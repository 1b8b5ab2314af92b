// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Synchronization of OCI artifacts into target secrets.

pub mod secrets;
pub mod syncer;

pub use secrets::{apply_content, needs_sync, new_target_secret, pull_credential};
pub use syncer::SecretSyncer;
