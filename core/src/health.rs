use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    checkpoint::CheckpointStore,
    database::clickhouse::client::{ClickhouseClient, Sink},
    helpers::millis_to_datetime,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub column_store: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressStatus {
    pub address: String,
    pub last_synced_block: u64,
    pub last_backfill_at: String,
    pub last_delta_at: String,
    pub updated_at: String,
}

#[derive(Clone)]
pub struct StatusServerState {
    client: Arc<ClickhouseClient>,
    checkpoints: Arc<CheckpointStore<ClickhouseClient>>,
}

/// Read-only status API. Runs as its own process next to the ingester and
/// reads the same column store; it never writes.
pub struct StatusServer {
    port: u16,
    state: StatusServerState,
}

impl StatusServer {
    pub fn new(port: u16, client: Arc<ClickhouseClient>) -> Self {
        let checkpoints = Arc::new(CheckpointStore::new(Arc::clone(&client)));
        StatusServer { port, state: StatusServerState { client, checkpoints } }
    }

    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/status/{address}", get(status_handler))
            .with_state(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr).await?;
        info!("Status server listening on http://0.0.0.0:{}/health", self.port);

        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn health_handler(State(state): State<StatusServerState>) -> Json<HealthStatus> {
    let column_store = if !state.client.is_enabled() {
        "disabled"
    } else {
        match state.client.query_json_each_row("SELECT 1").await {
            Ok(_) => "healthy",
            Err(e) => {
                error!("Column store health check failed: {}", e);
                "unreachable"
            }
        }
    };

    Json(HealthStatus {
        status: if column_store == "unreachable" { "unhealthy" } else { "healthy" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        column_store: column_store.to_string(),
    })
}

async fn status_handler(
    State(state): State<StatusServerState>,
    Path(address): Path<String>,
) -> Result<Json<AddressStatus>, StatusCode> {
    match state.checkpoints.fetch_latest(&address).await {
        Ok(Some(checkpoint)) => Ok(Json(AddressStatus {
            address: checkpoint.address,
            last_synced_block: checkpoint.last_synced_block,
            last_backfill_at: millis_to_datetime(checkpoint.last_backfill_at),
            last_delta_at: millis_to_datetime(checkpoint.last_delta_at),
            updated_at: millis_to_datetime(checkpoint.updated_at),
        })),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Status lookup failed for {}: {}", address, e);
            Err(StatusCode::BAD_GATEWAY)
        }
    }
}
