// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum OciSyncError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid OCISecret spec: {0}")]
    InvalidSpec(String),

    #[error("Invalid registry configuration: {0}")]
    RegistryConfigInvalid(String),

    #[error("Failed to fetch {context}: {source}")]
    FetchFailed {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to persist secret {target}: {source}")]
    PersistFailed {
        target: String,
        #[source]
        source: BoxError,
    },
}

/// Coarse classification the controller's error policy reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced record does not exist or lacks the expected key
    NotFound,
    /// Address, credential or spec is malformed; retrying won't help until it changes
    RegistryConfigInvalid,
    /// Network, auth or decode failure talking to the registry
    FetchFailed,
    /// The target secret could not be written
    PersistFailed,
    /// Any other Kubernetes API failure
    Api,
}

impl OciSyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OciSyncError::KubeError(_) => ErrorKind::Api,
            OciSyncError::NotFound(_) => ErrorKind::NotFound,
            OciSyncError::InvalidSpec(_) | OciSyncError::RegistryConfigInvalid(_) => {
                ErrorKind::RegistryConfigInvalid
            }
            OciSyncError::FetchFailed { .. } => ErrorKind::FetchFailed,
            OciSyncError::PersistFailed { .. } => ErrorKind::PersistFailed,
        }
    }

    /// Whether polling again may succeed without anyone editing the OCISecret.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::RegistryConfigInvalid)
    }

    pub(crate) fn fetch_failed(
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        OciSyncError::FetchFailed {
            context: context.into(),
            source: source.into(),
        }
    }

    pub(crate) fn persist_failed(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        OciSyncError::PersistFailed {
            target: target.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OciSyncError>;
