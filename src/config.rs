// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{DEFAULT_REGISTRY_TIMEOUT_SECS, DEFAULT_REQUEUE_SECS};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Delay before an OCISecret is checked again, after every pass
    pub requeue_interval: Duration,
    /// Deadline for all registry calls made during one pass
    pub registry_timeout: Duration,
    /// Registries reached over plain HTTP instead of HTTPS
    pub insecure_registries: Vec<String>,
    /// Parent directory for per-pass staging areas, the system temp dir if unset
    pub staging_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_SECS),
            registry_timeout: Duration::from_secs(DEFAULT_REGISTRY_TIMEOUT_SECS),
            insecure_registries: Vec::new(),
            staging_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let requeue_interval = secs_from_env("REQUEUE_INTERVAL_SECS", DEFAULT_REQUEUE_SECS)?;
        let registry_timeout =
            secs_from_env("REGISTRY_TIMEOUT_SECS", DEFAULT_REGISTRY_TIMEOUT_SECS)?;
        let insecure_registries = env::var("INSECURE_REGISTRIES")
            .map(|v| parse_registry_list(&v))
            .unwrap_or_default();
        let staging_dir = env::var("STAGING_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            requeue_interval,
            registry_timeout,
            insecure_registries,
            staging_dir,
        })
    }
}

fn secs_from_env(name: &str, default: u64) -> Result<Duration> {
    match env::var(name) {
        Ok(v) => {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds, got '{}'", name, v))?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn parse_registry_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
