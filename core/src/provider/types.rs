use serde::{Deserialize, Serialize};

/// One position of an `eth_getLogs` topic filter: absent (wildcard), a
/// single topic, or a disjunction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicFilter {
    Single(String),
    Any(Vec<String>),
}

/// Result of an operation backed by an optional RPC method. `Unsupported`
/// means the endpoint lacks the method; callers treat it as "no data".
#[derive(Debug, Clone, PartialEq)]
pub enum RangeData<T> {
    Rows(Vec<T>),
    Unsupported,
}

impl<T> RangeData<T> {
    pub fn into_rows(self) -> Vec<T> {
        match self {
            RangeData::Rows(rows) => rows,
            RangeData::Unsupported => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Log {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u64,
    /// Zero until enriched from the block-timestamp cache.
    pub ts_millis: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub tx_hash: String,
    /// `"root"` for the top-level frame, a dash-joined path otherwise.
    pub trace_id: String,
    pub from_address: String,
    pub to_address: String,
    pub value_hex: String,
    pub input: String,
    pub gas_used_hex: String,
    pub error: Option<String>,
    pub block_number: u64,
    pub ts_millis: i64,
}

impl Trace {
    pub fn is_root(&self) -> bool {
        self.trace_id == "root"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub tx_hash: String,
    pub from_address: String,
    /// Empty for contract creations.
    pub to_address: String,
    pub value_hex: String,
    pub gas_used_hex: String,
    pub status: u8,
    pub input: String,
    pub block_number: u64,
    pub ts_millis: i64,
    /// Receipt `contractAddress` when this transaction deployed a contract.
    pub contract_address: Option<String>,
}

// Wire shapes below mirror the JSON-RPC payloads; quantities stay hex
// strings until the decode layer.

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: Option<String>,
    #[serde(rename = "logIndex")]
    pub log_index: Option<String>,
}

/// `eth_getBlockByNumber(block, false)` - only the header fields we need.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcBlockSummary {
    pub timestamp: String,
}

/// `eth_getBlockByNumber(block, true)` with full transaction objects.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcFullBlock {
    pub timestamp: String,
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "contractAddress")]
    pub contract_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcTraceItem {
    #[serde(default)]
    pub action: RpcTraceAction,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<u64>,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: Option<String>,
    #[serde(rename = "traceAddress", default)]
    pub trace_address: Vec<u64>,
    pub error: Option<String>,
    pub result: Option<RpcTraceResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RpcTraceAction {
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
    pub input: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcTraceResult {
    #[serde(rename = "gasUsed")]
    pub gas_used: Option<String>,
}
