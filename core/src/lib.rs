// public
pub mod decode;
pub mod indexer;
pub mod provider;

mod checkpoint;
pub use checkpoint::{CheckpointError, CheckpointStore};

mod database;
pub use database::clickhouse::client::{
    clickhouse_connection, ClickhouseClient, ClickhouseConnectionError, ClickhouseError, Sink,
};

mod health;
pub use health::{AddressStatus, HealthStatus, StatusServer};

mod helpers;
pub use helpers::{
    address_from_topic, lower_hex, millis_to_datetime, now_millis, pad_address_topic,
    value_to_decimal,
};

mod logger;
pub use logger::{setup_info_logger, setup_logger};

mod options;
pub use options::{redact_dsn, Mode, Options, OptionsError};

mod types;
pub use types::{
    AddressCheckpoint, ApprovalRow, ContractRow, LogRow, SchemaKind, TokenStandard,
    TokenTransferRow, TraceRow, TransactionRow,
};

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tokio::main as walletctx_main;
pub use tracing::{error as walletctx_error, info as walletctx_info};
