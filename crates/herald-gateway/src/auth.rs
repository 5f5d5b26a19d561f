// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token authentication.
//!
//! Every API route requires `Authorization: Bearer <token>`. The token
//! identifies exactly one tenant; the resolved [`TenantId`] is attached to
//! the request as an extension for handlers to scope their work.
//!
//! When no tokens are configured, all requests are rejected (fail-closed).

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    middleware::Next,
};
use herald_core::TenantId;

use crate::error::ApiError;

/// Token to tenant lookup table.
#[derive(Clone, Default)]
pub struct TenantTokens {
    tokens: Arc<HashMap<String, TenantId>>,
}

impl TenantTokens {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let tokens = entries
            .into_iter()
            .map(|(token, tenant)| (token.into(), TenantId(tenant.into())))
            .collect();
        Self {
            tokens: Arc::new(tokens),
        }
    }

    pub fn resolve(&self, token: &str) -> Option<&TenantId> {
        self.tokens.get(token)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for TenantTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantTokens")
            .field("tokens", &format_args!("[{} redacted]", self.tokens.len()))
            .finish()
    }
}

/// Resolves the bearer token to a tenant or rejects the request with 401.
pub async fn auth_middleware(
    State(tokens): State<TenantTokens>,
    mut request: Request,
    next: Next,
) -> Response {
    if tokens.is_empty() {
        tracing::error!("gateway has no tokens configured -- rejecting request");
        return ApiError::unauthorized().into_response();
    }

    let tenant = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| tokens.resolve(token.trim()))
        .cloned();

    match tenant {
        Some(tenant) => {
            request.extensions_mut().insert(tenant);
            next.run(request).await
        }
        None => ApiError::unauthorized().into_response(),
    }
}
