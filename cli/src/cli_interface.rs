use clap::{Args, Parser, Subcommand};

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(name = "walletctx", about, version)]
pub struct CLI {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// The account address to ingest: 0x followed by 40 hex chars.
    #[clap(long)]
    pub address: String,

    /// First block of the pass. A stored cursor past it wins.
    #[clap(long, default_value_t = 0)]
    pub from_block: u64,

    /// optional - Last block of the pass, default is the confirmed head.
    #[clap(long)]
    pub to_block: Option<u64>,

    /// Blocks below head treated as reorg-able and excluded from safe
    /// processing.
    #[clap(long, default_value_t = 12)]
    pub confirmations: u64,

    /// Blocks per processing batch.
    #[clap(long, default_value_t = 1000)]
    pub batch_blocks: u64,

    /// Provider requests per second, 0 = unlimited.
    #[clap(long, default_value_t = 0)]
    pub rate_limit: u32,

    /// Overall pass timeout in seconds, 0 = no timeout.
    #[clap(long, default_value_t = 0)]
    pub timeout_secs: u64,

    /// Table family to write: canonical or dev.
    #[clap(long, default_value = "canonical")]
    pub schema: String,

    /// optional - JSON-RPC endpoint, default is the RPC_URL env var.
    #[clap(long)]
    pub rpc_url: Option<String>,

    /// optional - ClickHouse endpoint, default is the CLICKHOUSE_URL env
    /// var.
    #[clap(long)]
    pub clickhouse_url: Option<String>,

    /// Print the resolved options (credentials redacted) and exit.
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Historical sync from a block (or the stored cursor) up to the
    /// confirmed head.
    ///
    /// Example:
    /// `walletctx backfill --address 0x... --rpc-url https://...`
    #[clap(name = "backfill")]
    Backfill(IngestArgs),

    /// Incremental sync that reprocesses the rolling reorg window on every
    /// pass.
    ///
    /// Example:
    /// `walletctx delta --address 0x... --confirmations 12`
    #[clap(name = "delta")]
    Delta(IngestArgs),

    /// Serve the read-only health/status API next to the ingester.
    ///
    /// Example:
    /// `walletctx status-api --port 8080`
    #[clap(name = "status-api")]
    StatusApi {
        #[clap(long, default_value_t = 8080)]
        port: u16,

        /// optional - ClickHouse endpoint, default is the CLICKHOUSE_URL
        /// env var.
        #[clap(long)]
        clickhouse_url: Option<String>,
    },
}
