// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory credential store built from a Docker config JSON payload.

use crate::error::{OciSyncError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use oci_distribution::secrets::RegistryAuth;
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Deserialize)]
struct DockerConfig {
    #[serde(default)]
    auths: HashMap<String, DockerAuthEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct DockerAuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl DockerAuthEntry {
    /// Prefer the explicit fields, fall back to the base64 `user:pass` blob
    fn into_basic(self, host: &str) -> Result<(String, String)> {
        if let (Some(username), Some(password)) = (self.username, self.password) {
            return Ok((username, password));
        }

        let Some(encoded) = self.auth.filter(|a| !a.is_empty()) else {
            return Err(OciSyncError::RegistryConfigInvalid(format!(
                "Credential entry for {} has neither username/password nor auth",
                host
            )));
        };

        let decoded = STANDARD.decode(encoded.trim()).map_err(|e| {
            OciSyncError::RegistryConfigInvalid(format!(
                "Credential entry for {} has invalid base64 auth: {}",
                host, e
            ))
        })?;
        let decoded = String::from_utf8(decoded).map_err(|e| {
            OciSyncError::RegistryConfigInvalid(format!(
                "Credential entry for {} is not UTF-8: {}",
                host, e
            ))
        })?;

        match decoded.split_once(':') {
            Some((user, pass)) => Ok((user.to_string(), pass.to_string())),
            None => Err(OciSyncError::RegistryConfigInvalid(format!(
                "Credential entry for {} is not of the form user:password",
                host
            ))),
        }
    }
}

/// Registry credentials keyed by normalized host
#[derive(Default)]
pub struct CredentialStore {
    entries: HashMap<String, (String, String)>,
}

impl CredentialStore {
    /// Parse a `.dockerconfigjson` payload. Every entry must be usable.
    pub fn from_docker_config(bytes: &[u8]) -> Result<Self> {
        let config: DockerConfig = serde_json::from_slice(bytes).map_err(|e| {
            OciSyncError::RegistryConfigInvalid(format!("Invalid Docker config JSON: {}", e))
        })?;

        let mut entries = HashMap::with_capacity(config.auths.len());
        for (key, entry) in config.auths {
            let host = normalize_host(&key);
            let basic = entry.into_basic(&host)?;
            entries.insert(host, basic);
        }

        Ok(Self { entries })
    }

    /// Credentials for `registry`, anonymous when the store has none
    pub fn auth_for(&self, registry: &str) -> RegistryAuth {
        match self.entries.get(&normalize_host(registry)) {
            Some((user, pass)) => RegistryAuth::Basic(user.clone(), pass.clone()),
            None => RegistryAuth::Anonymous,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reduce a Docker config key (`https://index.docker.io/v1/`, `ghcr.io`, ...) to a host
fn normalize_host(key: &str) -> String {
    let key = key.trim();
    let host = if key.contains("://") {
        Url::parse(key)
            .ok()
            .and_then(|u| {
                u.host_str().map(|h| match u.port() {
                    Some(p) => format!("{}:{}", h, p),
                    None => h.to_string(),
                })
            })
            .unwrap_or_else(|| key.to_string())
    } else {
        key.split('/').next().unwrap_or(key).to_string()
    };

    let host = host.to_lowercase();
    match host.as_str() {
        "index.docker.io" | "registry-1.docker.io" => "docker.io".to_string(),
        _ => host,
    }
}
