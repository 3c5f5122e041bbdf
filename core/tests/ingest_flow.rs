//! End-to-end pass through the real JSON-RPC provider and ClickHouse writer
//! against in-process HTTP doubles.

use std::{sync::Arc, time::Duration};

use mockito::Matcher;
use walletctx::{
    indexer::Ingester,
    provider::{JsonRpcProvider, ProviderConfig},
    ClickhouseClient, Mode, Options,
};

const ADDRESS: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

fn rpc_result(result: &str) -> String {
    format!(r#"{{"jsonrpc":"2.0","id":0,"result":{result}}}"#)
}

#[tokio::test]
async fn backfill_moves_chain_data_into_the_column_store() {
    let mut rpc = mockito::Server::new_async().await;
    let mut clickhouse = mockito::Server::new_async().await;

    let padded_from = format!("0x{:0>64}", ADDRESS.trim_start_matches("0x"));
    let padded_to = "0x000000000000000000000000dac17f958d2ee523a2206206994597c13d831ec7";

    let _head = rpc
        .mock("POST", "/")
        .match_body(Matcher::PartialJsonString(r#"{"method":"eth_blockNumber"}"#.to_string()))
        .with_status(200)
        .with_body(rpc_result(r#""0x2""#))
        .create_async()
        .await;

    // One ERC-20 transfer from the tracked address in block 1. The same
    // payload answers all three topic-position queries; the engine
    // deduplicates on (tx_hash, log_index).
    let logs_body = format!(
        r#"[{{"address":"0xtoken","topics":["{TRANSFER_TOPIC}","{padded_from}","{padded_to}"],"data":"0x{amount:064x}","blockNumber":"0x1","transactionHash":"0xaaa","logIndex":"0x0"}}]"#,
        amount = 1500u64,
    );
    let _logs = rpc
        .mock("POST", "/")
        .match_body(Matcher::PartialJsonString(r#"{"method":"eth_getLogs"}"#.to_string()))
        .with_status(200)
        .with_body(rpc_result(&logs_body))
        .expect(3)
        .create_async()
        .await;

    let _trace_filter = rpc
        .mock("POST", "/")
        .match_body(Matcher::PartialJsonString(r#"{"method":"trace_filter"}"#.to_string()))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":0,"error":{"code":-32601,"message":"method not found"}}"#)
        .create_async()
        .await;

    // Serves both the timestamp lookups and the full-block transaction
    // scans; no transactions touch the address.
    let _blocks = rpc
        .mock("POST", "/")
        .match_body(Matcher::PartialJsonString(
            r#"{"method":"eth_getBlockByNumber"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(rpc_result(r#"{"timestamp":"0x64","transactions":[]}"#))
        .expect_at_least(3)
        .create_async()
        .await;

    let _checkpoint_read = clickhouse
        .mock("GET", "/")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let log_insert = clickhouse
        .mock("POST", "/")
        .match_query(Matcher::UrlEncoded(
            "query".to_string(),
            "INSERT INTO logs FORMAT JSONEachRow".to_string(),
        ))
        .match_body(Matcher::Regex("\"event_uid\":\"0xaaa:0\"".to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let transfer_insert = clickhouse
        .mock("POST", "/")
        .match_query(Matcher::UrlEncoded(
            "query".to_string(),
            "INSERT INTO token_transfers FORMAT JSONEachRow".to_string(),
        ))
        .match_body(Matcher::Regex("\"amount_raw\":\"1500\"".to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let checkpoint_insert = clickhouse
        .mock("POST", "/")
        .match_query(Matcher::UrlEncoded(
            "query".to_string(),
            "INSERT INTO addresses FORMAT JSONEachRow".to_string(),
        ))
        .match_body(Matcher::Regex("\"last_synced_block\":2".to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let provider = Arc::new(
        JsonRpcProvider::new(ProviderConfig {
            endpoint: rpc.url(),
            backoff_base: Duration::from_millis(1),
            ..Default::default()
        })
        .unwrap(),
    );
    let sink = Arc::new(
        ClickhouseClient::new(&clickhouse.url()).with_retry(1, Duration::from_millis(1)),
    );

    let options = Options {
        address: ADDRESS.to_string(),
        mode: Mode::Backfill,
        confirmations: 0,
        rpc_url: rpc.url(),
        clickhouse_dsn: clickhouse.url(),
        ..Default::default()
    }
    .validated()
    .unwrap();

    let ingester = Ingester::new(provider, sink, options);
    let summary = ingester.run().await.unwrap();

    assert_eq!(summary.ranges, 1);
    assert_eq!(summary.blocks, 3);
    assert_eq!(summary.logs, 1);
    assert_eq!(summary.token_transfers, 1);
    assert_eq!(summary.transactions, 0);

    log_insert.assert_async().await;
    transfer_insert.assert_async().await;
    checkpoint_insert.assert_async().await;
}
