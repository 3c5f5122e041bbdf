use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::SchemaKind;
use crate::helpers::millis_to_datetime;

/// Stable surrogate key for a log-derived row: `{tx_hash}:{log_index}`, with
/// an extra `:{k}` suffix for ERC-1155 batch items.
pub fn event_uid(tx_hash: &str, log_index: u64, batch_ordinal: Option<u32>) -> String {
    match batch_ordinal {
        Some(k) => format!("{tx_hash}:{log_index}:{k}"),
        None => format!("{tx_hash}:{log_index}"),
    }
}

/// Stable surrogate key for a trace row: `{tx_hash}:{trace_id}`.
pub fn trace_uid(tx_hash: &str, trace_id: &str) -> String {
    format!("{tx_hash}:{trace_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStandard {
    Erc20,
    Erc721,
    Erc1155,
}

impl TokenStandard {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStandard::Erc20 => "erc20",
            TokenStandard::Erc721 => "erc721",
            TokenStandard::Erc1155 => "erc1155",
        }
    }
}

/// Attaches the schema-dependent timestamp columns: canonical rows render
/// `ts` as a `DateTime64(3)` literal and carry the `ingested_at` version
/// column, dev rows carry raw `ts_millis`.
fn stamp(mut row: Value, schema: SchemaKind, ts_millis: i64, ingested_at_millis: i64) -> Value {
    if let Some(object) = row.as_object_mut() {
        match schema {
            SchemaKind::Canonical => {
                object.insert("ts".to_string(), json!(millis_to_datetime(ts_millis)));
                object.insert(
                    "ingested_at".to_string(),
                    json!(millis_to_datetime(ingested_at_millis)),
                );
            }
            SchemaKind::Dev => {
                object.insert("ts_millis".to_string(), json!(ts_millis));
            }
        }
    }
    row
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub event_uid: String,
    pub tx_hash: String,
    pub log_index: u64,
    pub address: String,
    pub topics: Vec<String>,
    pub data_hex: String,
    pub block_number: u64,
    pub ts_millis: i64,
}

impl LogRow {
    pub const TABLE: &'static str = "logs";

    pub fn to_row(&self, schema: SchemaKind, ingested_at_millis: i64) -> Value {
        stamp(
            json!({
                "event_uid": self.event_uid,
                "tx_hash": self.tx_hash,
                "log_index": self.log_index,
                "address": self.address,
                "topics": self.topics,
                "data_hex": self.data_hex,
                "block_number": self.block_number,
            }),
            schema,
            self.ts_millis,
            ingested_at_millis,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceRow {
    pub trace_uid: String,
    pub tx_hash: String,
    pub trace_id: String,
    pub from_address: String,
    pub to_address: String,
    pub value_raw: String,
    pub block_number: u64,
    pub ts_millis: i64,
}

impl TraceRow {
    pub const TABLE: &'static str = "traces";

    pub fn to_row(&self, schema: SchemaKind, ingested_at_millis: i64) -> Value {
        stamp(
            json!({
                "trace_uid": self.trace_uid,
                "tx_hash": self.tx_hash,
                "trace_id": self.trace_id,
                "from_address": self.from_address,
                "to_address": self.to_address,
                "value_raw": self.value_raw,
                "block_number": self.block_number,
            }),
            schema,
            self.ts_millis,
            ingested_at_millis,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub tx_hash: String,
    pub from_address: String,
    pub to_address: String,
    pub value_raw: String,
    pub gas_used: String,
    pub status: u8,
    pub input_method: String,
    pub block_number: u64,
    pub ts_millis: i64,
    pub is_internal: u8,
    /// Empty for external transactions, the non-`root` trace path for
    /// internal ones.
    pub trace_id: String,
}

impl TransactionRow {
    pub const TABLE: &'static str = "transactions";

    pub fn to_row(&self, schema: SchemaKind, ingested_at_millis: i64) -> Value {
        stamp(
            json!({
                "tx_hash": self.tx_hash,
                "from_address": self.from_address,
                "to_address": self.to_address,
                "value_raw": self.value_raw,
                "gas_used": self.gas_used,
                "status": self.status,
                "input_method": self.input_method,
                "block_number": self.block_number,
                "is_internal": self.is_internal,
                "trace_id": self.trace_id,
            }),
            schema,
            self.ts_millis,
            ingested_at_millis,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenTransferRow {
    pub event_uid: String,
    pub tx_hash: String,
    pub log_index: u64,
    pub token: String,
    pub from_address: String,
    pub to_address: String,
    pub amount_raw: String,
    pub token_id: String,
    pub standard: TokenStandard,
    pub batch_ordinal: u32,
    pub block_number: u64,
    pub ts_millis: i64,
}

impl TokenTransferRow {
    pub const TABLE: &'static str = "token_transfers";

    pub fn to_row(&self, schema: SchemaKind, ingested_at_millis: i64) -> Value {
        stamp(
            json!({
                "event_uid": self.event_uid,
                "tx_hash": self.tx_hash,
                "log_index": self.log_index,
                "token": self.token,
                "from_address": self.from_address,
                "to_address": self.to_address,
                "amount_raw": self.amount_raw,
                "token_id": self.token_id,
                "standard": self.standard.as_str(),
                "batch_ordinal": self.batch_ordinal,
                "block_number": self.block_number,
            }),
            schema,
            self.ts_millis,
            ingested_at_millis,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRow {
    pub event_uid: String,
    pub tx_hash: String,
    pub log_index: u64,
    pub token: String,
    pub owner: String,
    pub spender: String,
    pub amount_raw: String,
    pub token_id: String,
    pub is_approval_for_all: u8,
    pub standard: TokenStandard,
    pub block_number: u64,
    pub ts_millis: i64,
}

impl ApprovalRow {
    pub const TABLE: &'static str = "approvals";

    pub fn to_row(&self, schema: SchemaKind, ingested_at_millis: i64) -> Value {
        stamp(
            json!({
                "event_uid": self.event_uid,
                "tx_hash": self.tx_hash,
                "log_index": self.log_index,
                "token": self.token,
                "owner": self.owner,
                "spender": self.spender,
                "amount_raw": self.amount_raw,
                "token_id": self.token_id,
                "is_approval_for_all": self.is_approval_for_all,
                "standard": self.standard.as_str(),
                "block_number": self.block_number,
            }),
            schema,
            self.ts_millis,
            ingested_at_millis,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractRow {
    pub address: String,
    pub creator: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub ts_millis: i64,
}

impl ContractRow {
    pub const TABLE: &'static str = "contracts";

    pub fn to_row(&self, schema: SchemaKind, ingested_at_millis: i64) -> Value {
        stamp(
            json!({
                "address": self.address,
                "creator": self.creator,
                "tx_hash": self.tx_hash,
                "block_number": self.block_number,
            }),
            schema,
            self.ts_millis,
            ingested_at_millis,
        )
    }
}

/// The per-address ingestion cursor. Persisted append-only into `addresses`;
/// ReplacingMergeTree keeps the row with the greatest `updated_at`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressCheckpoint {
    pub address: String,
    pub last_synced_block: u64,
    pub last_backfill_at: i64,
    pub last_delta_at: i64,
    pub updated_at: i64,
}

impl AddressCheckpoint {
    pub const TABLE: &'static str = "addresses";

    pub fn to_row(&self) -> Value {
        json!({
            "address": self.address,
            "last_synced_block": self.last_synced_block,
            "last_backfill_at": millis_to_datetime(self.last_backfill_at),
            "last_delta_at": millis_to_datetime(self.last_delta_at),
            "updated_at": millis_to_datetime(self.updated_at),
        })
    }
}
