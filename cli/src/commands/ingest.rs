use std::{sync::Arc, time::Duration};

use walletctx::{
    indexer::Ingester,
    provider::{JsonRpcProvider, ProviderConfig},
    ClickhouseClient, Mode, Options,
};

use crate::{cli_interface::IngestArgs, console::print_success_message};

pub async fn handle_ingest_command(
    mode: Mode,
    args: IngestArgs,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let rpc_url = args
        .rpc_url
        .or_else(|| std::env::var("RPC_URL").ok())
        .unwrap_or_default();
    let clickhouse_dsn = args
        .clickhouse_url
        .or_else(|| std::env::var("CLICKHOUSE_URL").ok())
        .unwrap_or_default();

    let options = Options {
        address: args.address,
        mode,
        from_block: args.from_block,
        to_block: args.to_block,
        confirmations: args.confirmations,
        batch_blocks: args.batch_blocks,
        rate_limit: args.rate_limit,
        timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
        schema: args.schema.parse()?,
        rpc_url,
        clickhouse_dsn,
        reject_dsn_credentials: false,
    }
    .validated()?;

    if args.dry_run {
        print_success_message(&format!(
            "would run {mode} for {}: blocks [{}, {}], confirmations {}, batch {}, \
             rate limit {}, schema {}, rpc {}, clickhouse {}",
            options.address,
            options.from_block,
            options
                .to_block
                .map(|b| b.to_string())
                .unwrap_or_else(|| "head".to_string()),
            options.confirmations,
            options.batch_blocks,
            options.rate_limit,
            options.schema,
            options.rpc_url,
            options.redacted_dsn(),
        ));
        return Ok(());
    }

    let provider = Arc::new(JsonRpcProvider::new(ProviderConfig {
        endpoint: options.rpc_url.clone(),
        rate_limit: options.rate_limit,
        ..Default::default()
    })?);
    let sink = Arc::new(ClickhouseClient::new(&options.clickhouse_dsn));

    let timeout = options.timeout;
    let address = options.address.clone();
    let ingester = Ingester::new(provider, sink, options);

    let summary = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, ingester.run())
            .await
            .map_err(|_| format!("{mode} timed out after {}s", timeout.as_secs()))??,
        None => ingester.run().await?,
    };

    print_success_message(&format!(
        "{mode} complete for {address}: {} ranges, {} blocks, {} logs, {} transfers, \
         {} approvals, {} transactions, {} traces, {} contracts",
        summary.ranges,
        summary.blocks,
        summary.logs,
        summary.token_transfers,
        summary.approvals,
        summary.transactions,
        summary.traces,
        summary.contracts,
    ));
    Ok(())
}
