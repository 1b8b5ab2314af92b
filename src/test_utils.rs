// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test doubles: a mocked Kubernetes API, an in-memory store, a fake registry
//! connector and a local HTTP registry.

use crate::error::{OciSyncError, Result};
use crate::kubernetes::SecretStore;
use crate::registry::{ArtifactSource, RegistryConnector, RegistryOptions, RetryPolicy};
use crate::types::{
    ArtifactContent, ArtifactDigest, FileMap, OCISecret, OCISecretSpec, PullCredential, SecretRef,
};
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use kube::client::Body;
use kube::{Client, ResourceExt};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tower::Service;

type Route = (String, String);

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<Route, (u16, String)>>>,
    requests: Arc<Mutex<Vec<Route>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PUT requests matching the exact path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    /// Method and path of every request received so far
    pub fn requests(&self) -> Vec<Route> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("resource", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a mock OCISecret JSON response
pub fn oci_secret_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "oci-sync.brtrm.de/v1alpha1",
        "kind": "OCISecret",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        },
        "spec": {
            "orasArtefact": "v1",
            "ArtefactRegistry": "ghcr.io/org/configs",
            "targetSecret": { "name": name, "namespace": "apps" }
        }
    })
    .to_string()
}

/// Create a mock Secret JSON response
pub fn secret_json(namespace: &str, name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": "1"
        },
        "type": "Opaque"
    })
    .to_string()
}

/// Create a Status failure response
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(
        404,
        "NotFound",
        &format!("{} \"{}\" not found", resource, name),
    )
}

/// Build an OCISecret the way the API server would return it
pub fn make_oci_secret(name: &str, allow_list: &[&str], pull_secret: Option<SecretRef>) -> OCISecret {
    let mut obj = OCISecret::new(
        name,
        OCISecretSpec {
            artifact_reference: "v1".to_string(),
            registry_address: "ghcr.io/org/configs".to_string(),
            sync: Some(crate::types::SyncFiles {
                files: allow_list.iter().map(|f| f.to_string()).collect(),
            }),
            pull_secret,
            target_secret: SecretRef::new("apps", name),
        },
    );
    obj.metadata.uid = Some(format!("{}-uid", name));
    obj
}

/// Build a Secret holding `data`
pub fn make_secret(namespace: &str, name: &str, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), k8s_openapi::ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

#[derive(Default)]
struct StoreState {
    specs: HashMap<String, OCISecret>,
    secrets: HashMap<String, Secret>,
    creates: usize,
    replaces: usize,
    next_version: u64,
}

/// In-memory [`SecretStore`] that counts writes and enforces resource versions
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

fn key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

impl InMemoryStore {
    pub fn with_spec(self, spec: OCISecret) -> Self {
        self.state
            .lock()
            .unwrap()
            .specs
            .insert(spec.name_any(), spec);
        self
    }

    pub fn with_secret(self, mut secret: Secret) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_version += 1;
            secret.metadata.resource_version = Some(state.next_version.to_string());
            let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
            state.secrets.insert(k, secret);
        }
        self
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.state
            .lock()
            .unwrap()
            .secrets
            .get(&key(namespace, name))
            .cloned()
    }

    /// Number of creates and replaces performed
    pub fn writes(&self) -> (usize, usize) {
        let state = self.state.lock().unwrap();
        (state.creates, state.replaces)
    }
}

#[async_trait]
impl SecretStore for InMemoryStore {
    async fn get_sync_spec(&self, name: &str) -> Result<Option<OCISecret>> {
        Ok(self.state.lock().unwrap().specs.get(name).cloned())
    }

    async fn get_secret(&self, secret: &SecretRef) -> Result<Option<Secret>> {
        Ok(self.secret(secret.namespace(), secret.name()))
    }

    async fn create_secret(&self, secret: &Secret) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        if state.secrets.contains_key(&k) {
            return Err(OciSyncError::persist_failed(k, "already exists"));
        }
        state.next_version += 1;
        let mut stored = secret.clone();
        stored.metadata.resource_version = Some(state.next_version.to_string());
        state.secrets.insert(k, stored);
        state.creates += 1;
        Ok(())
    }

    async fn replace_secret(&self, secret: &Secret) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let k = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        let current = state
            .secrets
            .get(&k)
            .and_then(|s| s.metadata.resource_version.clone());
        if current.is_none() || current != secret.metadata.resource_version {
            return Err(OciSyncError::persist_failed(k, "conflict"));
        }
        state.next_version += 1;
        let mut stored = secret.clone();
        stored.metadata.resource_version = Some(state.next_version.to_string());
        state.secrets.insert(k, stored);
        state.replaces += 1;
        Ok(())
    }
}

struct RegistryState {
    digest: String,
    files: FileMap,
    digest_calls: usize,
    content_calls: usize,
    credentials: Vec<Option<PullCredential>>,
    stall_content: bool,
    fail_digest: bool,
}

/// Fake registry serving one artifact, recording how it was accessed
#[derive(Clone)]
pub struct FakeRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl FakeRegistry {
    pub fn new(digest: &str, files: &[(&str, &str)]) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                digest: digest.to_string(),
                files: files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
                digest_calls: 0,
                content_calls: 0,
                credentials: Vec::new(),
                stall_content: false,
                fail_digest: false,
            })),
        }
    }

    /// Publish new content under a new digest
    pub fn publish(&self, digest: &str, files: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        state.digest = digest.to_string();
        state.files = files
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect();
    }

    /// Make content pulls hang until cancelled
    pub fn stall_content(&self) {
        self.state.lock().unwrap().stall_content = true;
    }

    pub fn fail_digest(&self) {
        self.state.lock().unwrap().fail_digest = true;
    }

    pub fn digest_calls(&self) -> usize {
        self.state.lock().unwrap().digest_calls
    }

    pub fn content_calls(&self) -> usize {
        self.state.lock().unwrap().content_calls
    }

    /// Credential passed to every connect call, in order
    pub fn credentials(&self) -> Vec<Option<PullCredential>> {
        self.state.lock().unwrap().credentials.clone()
    }
}

impl RegistryConnector for FakeRegistry {
    fn connect(
        &self,
        _address: &str,
        credential: Option<&PullCredential>,
        _deadline: Instant,
    ) -> Result<Box<dyn ArtifactSource>> {
        self.state
            .lock()
            .unwrap()
            .credentials
            .push(credential.cloned());
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ArtifactSource for FakeRegistry {
    async fn fetch_digest(&self, _artifact: &str) -> Result<ArtifactDigest> {
        let mut state = self.state.lock().unwrap();
        state.digest_calls += 1;
        if state.fail_digest {
            return Err(OciSyncError::fetch_failed("digest", "registry unreachable"));
        }
        Ok(ArtifactDigest::new(state.digest.clone()))
    }

    async fn fetch_content(&self, _artifact: &str) -> Result<ArtifactContent> {
        let stall = {
            let mut state = self.state.lock().unwrap();
            state.content_calls += 1;
            state.stall_content
        };
        if stall {
            std::future::pending::<()>().await;
        }

        let state = self.state.lock().unwrap();
        Ok(ArtifactContent {
            digest: ArtifactDigest::new(state.digest.clone()),
            files: state.files.clone(),
        })
    }
}

/// `sha256:<hex>` digest of `content`
pub fn sha256_digest(content: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(content)))
}

/// Layer descriptor for `content` carrying `annotations`
pub fn layer_json(content: &[u8], annotations: &[(&str, &str)]) -> serde_json::Value {
    let annotations: HashMap<&str, &str> = annotations.iter().copied().collect();
    serde_json::json!({
        "mediaType": "application/vnd.oci.image.layer.v1.tar",
        "digest": sha256_digest(content),
        "size": content.len(),
        "annotations": annotations
    })
}

/// Image manifest with an empty config and the given layers
pub fn image_manifest_json(layers: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "config": {
            "mediaType": "application/vnd.oci.empty.v1+json",
            "digest": sha256_digest(b"{}"),
            "size": 2
        },
        "layers": layers
    })
}

/// Image index over manifests given as `(digest, size)`
pub fn image_index_json(manifests: &[(&str, usize)]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = manifests
        .iter()
        .map(|(digest, size)| {
            serde_json::json!({
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": digest,
                "size": size,
                "platform": { "architecture": "amd64", "os": "linux" }
            })
        })
        .collect();
    serde_json::json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.index.v1+json",
        "manifests": entries
    })
}

#[derive(Clone)]
enum Served {
    Content {
        content_type: String,
        body: Vec<u8>,
        digest: Option<String>,
    },
    /// Accept the request and never answer
    Stall,
}

/// Minimal OCI distribution server on a loopback port, spoken to over plain HTTP
#[derive(Clone)]
pub struct LocalRegistry {
    host: String,
    routes: Arc<Mutex<HashMap<String, Served>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl LocalRegistry {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let registry = Self {
            host: listener.local_addr().unwrap().to_string(),
            routes: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let server = registry.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let server = server.clone();
                tokio::spawn(async move { server.serve(stream).await });
            }
        });
        registry
    }

    /// Repository address on this registry
    pub fn address(&self, repository: &str) -> String {
        format!("{}/{}", self.host, repository)
    }

    /// Plain HTTP towards this registry, failing fast instead of retrying
    pub fn options(&self) -> RegistryOptions {
        RegistryOptions {
            insecure_registries: vec![self.host.clone()],
            retry: RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
            staging_dir: None,
        }
    }

    /// Serve `manifest` under `tag` and under its digest; returns `(digest, size)`
    pub fn push_manifest(
        &self,
        repository: &str,
        tag: &str,
        manifest: &serde_json::Value,
    ) -> (String, usize) {
        let body = manifest.to_string().into_bytes();
        let digest = sha256_digest(&body);
        let content_type = manifest["mediaType"]
            .as_str()
            .unwrap_or("application/vnd.oci.image.manifest.v1+json")
            .to_string();
        let size = body.len();

        let mut routes = self.routes.lock().unwrap();
        for reference in [tag, digest.as_str()] {
            routes.insert(
                format!("/v2/{}/manifests/{}", repository, reference),
                Served::Content {
                    content_type: content_type.clone(),
                    body: body.clone(),
                    digest: Some(digest.clone()),
                },
            );
        }
        (digest, size)
    }

    /// Serve `content` as a blob under its own digest
    pub fn push_blob(&self, repository: &str, content: &[u8]) {
        self.serve_blob(repository, &sha256_digest(content), content);
    }

    /// Serve `content` under `digest`, whether or not it matches
    pub fn serve_blob(&self, repository: &str, digest: &str, content: &[u8]) {
        self.routes.lock().unwrap().insert(
            format!("/v2/{}/blobs/{}", repository, digest),
            Served::Content {
                content_type: "application/octet-stream".to_string(),
                body: content.to_vec(),
                digest: None,
            },
        );
    }

    /// Hang every download of the blob `digest`
    pub fn stall_blob(&self, repository: &str, digest: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(format!("/v2/{}/blobs/{}", repository, digest), Served::Stall);
    }

    /// Paths requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    async fn serve(&self, mut stream: TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = String::from_utf8_lossy(&request).into_owned();
        let mut request_line = head.lines().next().unwrap_or_default().split(' ');
        let method = request_line.next().unwrap_or_default().to_string();
        let path = request_line.next().unwrap_or_default().to_string();
        self.requests.lock().unwrap().push(path.clone());

        let served = if path == "/v2/" {
            Some(Served::Content {
                content_type: "application/json".to_string(),
                body: b"{}".to_vec(),
                digest: None,
            })
        } else {
            self.routes.lock().unwrap().get(&path).cloned()
        };

        let (status, content_type, body, digest) = match served {
            Some(Served::Stall) => {
                std::future::pending::<()>().await;
                return;
            }
            Some(Served::Content {
                content_type,
                body,
                digest,
            }) => ("200 OK", content_type, body, digest),
            None => (
                "404 Not Found",
                "application/json".to_string(),
                br#"{"errors":[]}"#.to_vec(),
                None,
            ),
        };

        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            status,
            content_type,
            body.len()
        );
        if let Some(digest) = digest {
            response.push_str(&format!("Docker-Content-Digest: {}\r\n", digest));
        }
        response.push_str("\r\n");

        let _ = stream.write_all(response.as_bytes()).await;
        if method != "HEAD" {
            let _ = stream.write_all(&body).await;
        }
        let _ = stream.shutdown().await;
    }
}
