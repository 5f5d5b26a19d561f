// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Every authenticated handler receives the caller's [`TenantId`] from the
//! auth middleware and only ever touches that tenant's data.

use axum::{
    Extension, Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use herald_core::{
    BroadcastId, BroadcastStatistics, BroadcastStatus, BroadcastSummary, DateRange, MediaKind,
    MediaRef, SessionStatus, TenantId,
};
use herald_dispatch::{BroadcastDetail, CreateBroadcast, CreatedBroadcast, DispatchReport};
use herald_pool::{Acquired, PoolState};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::server::GatewayState;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Query string for GET /broadcasts.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<BroadcastStatus>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct BroadcastList {
    pub broadcasts: Vec<BroadcastSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub broadcast_id: BroadcastId,
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatusResponse {
    pub connected: bool,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub media: MediaRef,
    pub kind: MediaKind,
}

/// Response body for POST /connection/connect.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConnectResponse {
    AlreadyConnected,
    Connected,
    /// The operator must scan `challenge` to finish pairing.
    Pairing { challenge: String },
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub connected_sessions: usize,
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

fn query<T>(q: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    q.map(|Query(v)| v)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// POST /broadcasts
pub async fn create_broadcast(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
    body: Result<Json<CreateBroadcast>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedBroadcast>), ApiError> {
    let request = payload(body)?;
    let created = state.engine.create_broadcast(&tenant, request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /broadcasts?status&page&limit
pub async fn list_broadcasts(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<BroadcastList> {
    let params = query(params)?;
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1).saturating_mul(limit);

    let (broadcasts, total) = state
        .engine
        .list_broadcasts(&tenant, params.status, limit, offset)
        .await?;

    Ok(Json(BroadcastList {
        broadcasts,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: total.div_ceil(u64::from(limit)),
        },
    }))
}

/// GET /broadcasts/statistics?start&end
pub async fn get_statistics(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
    range: Result<Query<DateRange>, QueryRejection>,
) -> ApiResult<BroadcastStatistics> {
    let range = query(range)?;
    Ok(Json(state.engine.statistics(&tenant, &range).await?))
}

/// GET /broadcasts/{id}
pub async fn get_broadcast(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> ApiResult<BroadcastDetail> {
    let detail = state
        .engine
        .get_broadcast(&tenant, &BroadcastId(id))
        .await?;
    Ok(Json(detail))
}

/// DELETE /broadcasts/{id}
pub async fn delete_broadcast(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> ApiResult<StatusMessage> {
    state
        .engine
        .delete_broadcast(&tenant, &BroadcastId(id))
        .await?;
    Ok(Json(StatusMessage { status: "deleted" }))
}

/// POST /broadcasts/{id}/send
///
/// Runs the whole dispatch before responding.
pub async fn send_broadcast(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> ApiResult<DispatchReport> {
    let report = state
        .engine
        .send_broadcast(&tenant, &BroadcastId(id), None)
        .await
        .map_err(ApiError::for_send)?;
    Ok(Json(report))
}

/// POST /broadcasts/{id}/cancel
pub async fn cancel_broadcast(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
    Path(id): Path<String>,
) -> ApiResult<CancelResponse> {
    let id = BroadcastId(id);
    let cancelled = state.engine.cancel(&tenant, &id).await?;
    Ok(Json(CancelResponse {
        broadcast_id: id,
        cancelled,
    }))
}

/// GET /connection/status
pub async fn connection_status(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
) -> Json<ConnectionStatusResponse> {
    let status = state.pool.status(&tenant).await;
    let pool_state = state.pool.state(&tenant).await;
    Json(ConnectionStatusResponse {
        connected: status == SessionStatus::Connected,
        state: pool_state.to_string(),
    })
}

/// POST /connection/connect
pub async fn connect(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
) -> ApiResult<ConnectResponse> {
    if state.pool.state(&tenant).await == PoolState::Connected {
        return Ok(Json(ConnectResponse::AlreadyConnected));
    }
    let response = match state.pool.acquire(&tenant).await? {
        Acquired::Ready(_) => ConnectResponse::Connected,
        Acquired::Challenge(challenge) => ConnectResponse::Pairing {
            challenge: challenge.code,
        },
    };
    Ok(Json(response))
}

/// DELETE /connection
pub async fn disconnect(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
) -> ApiResult<StatusMessage> {
    state.pool.disconnect(&tenant).await?;
    Ok(Json(StatusMessage {
        status: "disconnected",
    }))
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        connected_sessions: state.pool.connected_count().await,
    })
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), e.body_text())
}

/// POST /uploads (multipart, file in the `file` or `image` field)
///
/// The returned `media` reference goes into a broadcast template as is.
pub async fn upload_media(
    State(state): State<GatewayState>,
    Extension(tenant): Extension<TenantId>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let Some(media) = state.media.as_ref() else {
        return Err(ApiError::bad_request("media uploads are not configured"));
    };
    let mut multipart = multipart.map_err(|e| ApiError::new(e.status(), e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if !matches!(field.name(), Some("file" | "image")) {
            continue;
        }
        let Some(name) = field.file_name().map(str::to_string) else {
            return Err(ApiError::bad_request("uploaded file has no file name"));
        };
        let bytes = field.bytes().await.map_err(multipart_error)?;
        let stored = media.store(&tenant, &name, &bytes).await?;
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                kind: stored.kind(),
                media: stored,
            }),
        ));
    }
    Err(ApiError::bad_request("multipart body has no `file` field"))
}
