use std::sync::Arc;

use walletctx::{ClickhouseClient, StatusServer};

pub async fn handle_status_api_command(
    port: u16,
    clickhouse_url: Option<String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let client = match clickhouse_url {
        Some(url) => ClickhouseClient::new(&url),
        None => ClickhouseClient::from_env()?,
    };

    let server = StatusServer::new(port, Arc::new(client));
    server.start().await?;
    Ok(())
}
