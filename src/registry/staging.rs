// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Temporary on-disk area artifact layers are written into before being read back.
//!
//! The directory lives exactly as long as the [`StagingArea`] value. Dropping it,
//! whether on success, on error or because the owning future was cancelled,
//! removes the directory and everything in it.

use crate::error::{OciSyncError, Result};
use crate::types::FileMap;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    /// Create a fresh area under `root`, or under the system temp dir
    pub fn new(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("oci-secret-sync-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| OciSyncError::fetch_failed("staging directory", e))?;
        debug!("Created staging directory {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write one layer under its title. Nested titles land in subdirectories,
    /// which [`StagingArea::read_files`] does not descend into.
    pub async fn write(&self, title: &str, content: &[u8]) -> Result<()> {
        let target = self.dir.path().join(checked_relative_path(title)?);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OciSyncError::fetch_failed(format!("staging of {}", title), e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| OciSyncError::fetch_failed(format!("staging of {}", title), e))
    }

    /// Read every regular file at the top level of the area into memory
    pub async fn read_files(&self) -> Result<FileMap> {
        let mut files = FileMap::new();
        let mut entries = tokio::fs::read_dir(self.dir.path())
            .await
            .map_err(|e| OciSyncError::fetch_failed("staging directory listing", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| OciSyncError::fetch_failed("staging directory listing", e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| OciSyncError::fetch_failed("staging directory listing", e))?;
            if !file_type.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let content = tokio::fs::read(entry.path())
                .await
                .map_err(|e| OciSyncError::fetch_failed(format!("staged file {}", name), e))?;
            files.insert(name, content);
        }

        Ok(files)
    }
}

/// Layer titles come from the registry; never let one escape the staging area.
fn checked_relative_path(title: &str) -> Result<PathBuf> {
    let path = Path::new(title);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(OciSyncError::fetch_failed(
                    format!("layer {}", title),
                    "title is not a relative path inside the artifact",
                ))
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(OciSyncError::fetch_failed(
            format!("layer {:?}", title),
            "empty title",
        ));
    }
    Ok(clean)
}
