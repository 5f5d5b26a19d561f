// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File-backed credential store: one directory per tenant.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use herald_core::{Credentials, HeraldError, SessionStore, TenantId};
use tracing::debug;

const CREDENTIALS_FILE: &str = "creds.json";

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> HeraldError {
    HeraldError::Storage {
        source: Box::new(e),
    }
}

/// Keeps each tenant's credentials in `<root>/<tenant>/creds.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory for a tenant. Characters outside `[A-Za-z0-9_-]` are
    /// percent-encoded so a tenant id can never escape the root.
    pub fn tenant_dir(&self, tenant: &TenantId) -> PathBuf {
        let mut name = String::with_capacity(tenant.0.len());
        for byte in tenant.0.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        self.root.join(name)
    }

    fn credentials_path(&self, tenant: &TenantId) -> PathBuf {
        self.tenant_dir(tenant).join(CREDENTIALS_FILE)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn prepare(&self, tenant: &TenantId) -> Result<(), HeraldError> {
        tokio::fs::create_dir_all(self.tenant_dir(tenant))
            .await
            .map_err(storage_err)
    }

    async fn load(&self, tenant: &TenantId) -> Result<Option<Credentials>, HeraldError> {
        let raw = match tokio::fs::read(self.credentials_path(tenant)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err(e)),
        };
        serde_json::from_slice(&raw).map(Some).map_err(storage_err)
    }

    async fn save(&self, tenant: &TenantId, credentials: &Credentials) -> Result<(), HeraldError> {
        let dir = self.tenant_dir(tenant);
        tokio::fs::create_dir_all(&dir).await.map_err(storage_err)?;

        let body = serde_json::to_vec_pretty(credentials).map_err(storage_err)?;
        let tmp = dir.join(format!("{CREDENTIALS_FILE}.tmp"));
        tokio::fs::write(&tmp, body).await.map_err(storage_err)?;
        tokio::fs::rename(&tmp, dir.join(CREDENTIALS_FILE))
            .await
            .map_err(storage_err)?;
        debug!(tenant = %tenant, "credentials saved");
        Ok(())
    }

    async fn purge(&self, tenant: &TenantId) -> Result<(), HeraldError> {
        match tokio::fs::remove_dir_all(self.tenant_dir(tenant)).await {
            Ok(()) => {
                debug!(tenant = %tenant, "credentials purged");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err(e)),
        }
    }
}
