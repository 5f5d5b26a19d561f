// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator media uploads.
//!
//! Files land in `<media_dir>/<tenant>/` under a generated name and are served
//! back without authentication, so the relay can fetch them by URL.

use std::path::{Path, PathBuf};

use chrono::Utc;
use herald_core::{HeraldError, MediaRef, TenantId};
use tracing::info;
use uuid::Uuid;

/// Path prefix the stored files are served under.
pub const MEDIA_ROUTE: &str = "/media";

const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "mp4", "mov", "3gp", "pdf",
];

/// Where uploads are written and the public URL they are reachable at.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    public_base: String,
    max_upload_bytes: usize,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, public_url: &str, max_upload_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base: public_url.trim_end_matches('/').to_string(),
            max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Writes an uploaded file and returns the reference a broadcast can use.
    pub async fn store(
        &self,
        tenant: &TenantId,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<MediaRef, HeraldError> {
        if bytes.is_empty() {
            return Err(HeraldError::Validation("uploaded file is empty".into()));
        }
        let ext = allowed_extension(original_name)?;
        let folder = tenant_folder(tenant)?;
        let file_name = format!(
            "broadcast_{}_{}.{ext}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await.map_err(io_error)?;
        tokio::fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(io_error)?;
        info!(tenant = %tenant, file = %file_name, size = bytes.len(), "media uploaded");

        Ok(MediaRef(format!(
            "{}{MEDIA_ROUTE}/{folder}/{file_name}",
            self.public_base
        )))
    }
}

fn io_error(e: std::io::Error) -> HeraldError {
    HeraldError::Storage {
        source: Box::new(e),
    }
}

fn allowed_extension(name: &str) -> Result<String, HeraldError> {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(HeraldError::Validation(format!(
            "unsupported file type `{name}`; allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )))
    }
}

/// The tenant id as a single safe path segment.
fn tenant_folder(tenant: &TenantId) -> Result<&str, HeraldError> {
    let id = tenant.0.as_str();
    let safe = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if safe {
        Ok(id)
    } else {
        Err(HeraldError::Validation(format!(
            "tenant id `{id}` cannot be used as a media folder"
        )))
    }
}
