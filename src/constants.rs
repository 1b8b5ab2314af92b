// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used on target secrets
pub mod annotations {
    /// Digest of the artifact last written into the target secret
    pub const LAST_SYNCED_DIGEST: &str = "OCISecret.operator.rev";
}

/// Placeholder digest written on creation. Real digests always contain a ':'
/// so this never compares equal to one.
pub const SENTINEL_DIGEST: &str = "00000";

/// Key holding the Docker config JSON inside a pull secret
pub const PULL_SECRET_KEY: &str = ".dockerconfigjson";

/// The operator name used in logs
pub const OPERATOR_NAME: &str = "oci-secret-sync";

/// Default revisit delay after every reconcile pass
pub const DEFAULT_REQUEUE_SECS: u64 = 60;

/// Default budget for all registry calls of one reconcile pass
pub const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 120;

/// OCI annotations understood when materializing artifact layers
pub mod oci {
    /// File name of a layer, as set by `oras push`
    pub const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";
    /// Marks a layer as a packed directory
    pub const UNPACK_ANNOTATION: &str = "io.deis.oras.content.unpack";
}

/// Registry retry policy for transient transport failures
pub mod retry {
    pub const MAX_RETRIES: u32 = 5;
    pub const MIN_WAIT_MILLIS: u64 = 200;
    pub const MAX_WAIT_MILLIS: u64 = 3_000;
}

/// CRD polling configuration
pub mod crd {
    pub const GROUP: &str = "oci-sync.brtrm.de";
    pub const VERSION: &str = "v1alpha1";
    pub const KIND: &str = "OCISecret";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
