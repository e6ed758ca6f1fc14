//! HTTP front end
//!
//! `GET /v1/map/:seed/:difficulty/:act` returns the batch as JSON (act `-1`
//! for none) and `GET /health` reports worker and queue state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;

use shared::{process_info, process_warn, MapBatch, ProcessId, SharedError};

use crate::error::{MapError, MapResult};
use crate::map_service::{MapService, ServiceHealth};
use crate::traits::MapGenerator;

/// Build the router over a shared map service
pub fn build_router<G>(service: Arc<MapService<G>>) -> Router
where
    G: MapGenerator + 'static,
{
    Router::new()
        .route("/v1/map/:seed/:difficulty/:act", get(map_handler::<G>))
        .route("/health", get(health_handler::<G>))
        .with_state(service)
}

/// Serve until `shutdown` resolves
pub async fn serve<G, F>(service: Arc<MapService<G>>, addr: SocketAddr, shutdown: F) -> MapResult<()>
where
    G: MapGenerator + 'static,
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    process_info!(ProcessId::Service, "🌐 Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn map_handler<G>(
    Path((seed, difficulty, act)): Path<(u32, u8, i32)>,
    State(service): State<Arc<MapService<G>>>,
) -> Result<Json<Arc<MapBatch>>, MapError>
where
    G: MapGenerator + 'static,
{
    let batch = service.map_by_id(seed, difficulty, act).await?;
    Ok(Json(batch))
}

async fn health_handler<G>(State(service): State<Arc<MapService<G>>>) -> Json<ServiceHealth>
where
    G: MapGenerator + 'static,
{
    Json(service.health().await)
}

impl MapError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MapError::SharedError(SharedError::InvalidRequest { .. }) => StatusCode::BAD_REQUEST,
            MapError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for MapError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status != StatusCode::BAD_REQUEST {
            process_warn!(ProcessId::Service, "Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
