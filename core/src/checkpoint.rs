use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    database::clickhouse::client::{ClickhouseError, Sink},
    helpers::{datetime_to_millis, lower_hex},
    types::AddressCheckpoint,
};

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Could not read checkpoint row: {0}")]
    Read(#[source] ClickhouseError),

    #[error("Could not write checkpoint row: {0}")]
    Write(#[source] ClickhouseError),
}

/// Reads and writes the single-row-per-address cursor in the `addresses`
/// table. Writes are append-only; ReplacingMergeTree keeps the row with the
/// greatest `updated_at`. The current checkpoint is cached in process so a
/// hit skips the read entirely.
pub struct CheckpointStore<S> {
    sink: Arc<S>,
    cache: RwLock<HashMap<String, AddressCheckpoint>>,
}

fn timestamp_field(value: &Value) -> i64 {
    match value {
        Value::String(text) => datetime_to_millis(text),
        Value::Number(number) => number.as_i64().unwrap_or(0),
        _ => 0,
    }
}

fn block_field(value: &Value) -> u64 {
    match value {
        Value::Number(number) => number.as_u64().unwrap_or(0),
        Value::String(text) => text.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Missing timestamps normalize to epoch zero; a missing or empty address
/// defaults to the one the row was looked up with.
fn checkpoint_from_row(row: &Value, default_address: &str) -> AddressCheckpoint {
    let address = match row["address"].as_str() {
        Some(found) if !found.is_empty() => lower_hex(found),
        _ => default_address.to_string(),
    };

    AddressCheckpoint {
        address,
        last_synced_block: block_field(&row["last_synced_block"]),
        last_backfill_at: timestamp_field(&row["last_backfill_at"]),
        last_delta_at: timestamp_field(&row["last_delta_at"]),
        updated_at: timestamp_field(&row["updated_at"]),
    }
}

impl<S: Sink> CheckpointStore<S> {
    pub fn new(sink: Arc<S>) -> Self {
        CheckpointStore { sink, cache: RwLock::new(HashMap::new()) }
    }

    pub async fn load(
        &self,
        address: &str,
    ) -> Result<Option<AddressCheckpoint>, CheckpointError> {
        let key = lower_hex(address);

        if let Some(cached) =
            self.cache.read().unwrap_or_else(PoisonError::into_inner).get(&key)
        {
            return Ok(Some(cached.clone()));
        }

        self.fetch_latest(&key).await
    }

    /// Reads the latest row regardless of the cache. The status API uses
    /// this so long-lived readers never serve a stale cursor.
    pub async fn fetch_latest(
        &self,
        address: &str,
    ) -> Result<Option<AddressCheckpoint>, CheckpointError> {
        let key = lower_hex(address);

        let sql = format!(
            "SELECT address,last_synced_block,last_backfill_at,last_delta_at,updated_at \
             FROM addresses WHERE address='{}' ORDER BY updated_at DESC LIMIT 1 \
             FORMAT JSONEachRow SETTINGS output_format_json_quote_64bit_integers = 0",
            key.replace('\'', "\\'")
        );

        let rows = self.sink.query_json_each_row(&sql).await.map_err(CheckpointError::Read)?;
        let Some(row) = rows.first() else {
            debug!(address = %key, "no checkpoint row yet");
            return Ok(None);
        };

        let checkpoint = checkpoint_from_row(row, &key);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, checkpoint.clone());
        Ok(Some(checkpoint))
    }

    pub async fn save(&self, checkpoint: &AddressCheckpoint) -> Result<(), CheckpointError> {
        self.sink
            .insert_json_each_row(AddressCheckpoint::TABLE, &[checkpoint.to_row()])
            .await
            .map_err(CheckpointError::Write)?;

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(lower_hex(&checkpoint.address), checkpoint.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::clickhouse::client::ClickhouseClient;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    const ADDRESS: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn store_for(server: &mockito::Server) -> CheckpointStore<ClickhouseClient> {
        let client =
            ClickhouseClient::new(&server.url()).with_retry(1, Duration::from_millis(1));
        CheckpointStore::new(Arc::new(client))
    }

    #[tokio::test]
    async fn load_issues_the_replacing_merge_tree_read() {
        let mut server = mockito::Server::new_async().await;
        let expected_sql = format!(
            "SELECT address,last_synced_block,last_backfill_at,last_delta_at,updated_at \
             FROM addresses WHERE address='{ADDRESS}' ORDER BY updated_at DESC LIMIT 1 \
             FORMAT JSONEachRow SETTINGS output_format_json_quote_64bit_integers = 0"
        );
        let mock = server
            .mock("GET", "/")
            .match_query(Matcher::UrlEncoded("query".to_string(), expected_sql))
            .with_status(200)
            .with_body(format!(
                "{}\n",
                json!({
                    "address": ADDRESS,
                    "last_synced_block": 150,
                    "last_backfill_at": "2024-01-01 00:00:00.000",
                    "last_delta_at": "",
                    "updated_at": "2024-01-01 00:00:00.000",
                })
            ))
            .expect(1)
            .create_async()
            .await;

        let store = store_for(&server);
        let checkpoint = store.load(ADDRESS).await.unwrap().unwrap();
        assert_eq!(checkpoint.last_synced_block, 150);
        assert_eq!(checkpoint.last_backfill_at, 1_704_067_200_000);
        assert_eq!(checkpoint.last_delta_at, 0);

        // Cache hit skips the second read.
        let again = store.load(ADDRESS).await.unwrap().unwrap();
        assert_eq!(again, checkpoint);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_row_means_no_prior_state() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let store = store_for(&server);
        assert_eq!(store.load(ADDRESS).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_populates_the_cache() {
        let mut server = mockito::Server::new_async().await;
        let insert = server
            .mock("POST", "/")
            .match_query(Matcher::Any)
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let store = store_for(&server);
        let checkpoint = AddressCheckpoint {
            address: ADDRESS.to_string(),
            last_synced_block: 42,
            last_backfill_at: 1,
            last_delta_at: 2,
            updated_at: 3,
        };
        store.save(&checkpoint).await.unwrap();

        // load must come from the cache; no GET mock exists.
        assert_eq!(store.load(ADDRESS).await.unwrap(), Some(checkpoint));
        insert.assert_async().await;
    }

    #[test]
    fn row_normalization_defaults() {
        let checkpoint = checkpoint_from_row(&json!({}), ADDRESS);
        assert_eq!(checkpoint.address, ADDRESS);
        assert_eq!(checkpoint.last_synced_block, 0);
        assert_eq!(checkpoint.last_backfill_at, 0);

        let checkpoint = checkpoint_from_row(
            &json!({"address": "", "last_synced_block": "77", "updated_at": 5}),
            ADDRESS,
        );
        assert_eq!(checkpoint.address, ADDRESS);
        assert_eq!(checkpoint.last_synced_block, 77);
        assert_eq!(checkpoint.updated_at, 5);
    }
}
