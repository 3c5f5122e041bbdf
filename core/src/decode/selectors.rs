use std::collections::HashMap;

use alloy_primitives::keccak256;
use once_cell::sync::Lazy;
use serde::Deserialize;
use thiserror::Error;

use crate::helpers::lower_hex;

const ERC20_ABI: &str = include_str!("../../resources/abis/erc20.json");
const ERC721_ABI: &str = include_str!("../../resources/abis/erc721.json");
const ERC1155_ABI: &str = include_str!("../../resources/abis/erc1155.json");

/// Common entry points worth naming in `input_method` beyond what the
/// token-standard ABIs declare.
const MANUAL_SELECTORS: &[(&str, &str)] = &[
    ("mint(address,uint256)", "mint"),
    ("claim()", "claim"),
    ("deposit()", "deposit"),
    ("withdraw(uint256)", "withdraw"),
];

/// Canonical values for the common selectors and topics. Installed only when
/// the embedded ABI build did not already produce them.
const FALLBACK_SELECTORS: &[(&str, &str)] = &[
    ("0xa9059cbb", "transfer"),
    ("0x095ea7b3", "approve"),
    ("0x23b872dd", "transferFrom"),
    ("0xa22cb465", "setApprovalForAll"),
];

const FALLBACK_TOPICS: &[(&str, TokenEvent)] = &[
    ("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef", TokenEvent::Transfer),
    ("0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925", TokenEvent::Approval),
    (
        "0x17307eab39ab6107e8899845ad3d59bd9653f200f220920489ca2b5937696c31",
        TokenEvent::ApprovalForAll,
    ),
    (
        "0xc3d58168c5ae7397731d063d5bbf3d657854427343f4c083240f7aacaa2d0f62",
        TokenEvent::TransferSingle,
    ),
    (
        "0x4a39dc06d4c0dbc64b70af90fd698a233a518aa5d07e595d983b8c0526c8f7fb",
        TokenEvent::TransferBatch,
    ),
];

/// The token-standard events the decoder dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenEvent {
    Transfer,
    Approval,
    ApprovalForAll,
    TransferSingle,
    TransferBatch,
}

impl TokenEvent {
    fn from_name(name: &str) -> Option<TokenEvent> {
        match name {
            "Transfer" => Some(TokenEvent::Transfer),
            "Approval" => Some(TokenEvent::Approval),
            "ApprovalForAll" => Some(TokenEvent::ApprovalForAll),
            "TransferSingle" => Some(TokenEvent::TransferSingle),
            "TransferBatch" => Some(TokenEvent::TransferBatch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct AbiInput {
    #[serde(rename = "type")]
    type_: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AbiItem {
    #[serde(default)]
    name: String,

    #[serde(rename = "type", default)]
    type_: String,

    #[serde(default)]
    inputs: Vec<AbiInput>,
}

impl AbiItem {
    fn signature(&self) -> String {
        let params: Vec<&str> = self.inputs.iter().map(|input| input.type_.as_str()).collect();
        format!("{}({})", self.name, params.join(","))
    }
}

#[derive(Error, Debug)]
enum BuildIndexError {
    #[error("Could not read embedded ABI JSON: {0}")]
    BadAbiJson(#[from] serde_json::Error),
}

struct AbiIndex {
    /// `0x` + 8 hex chars → canonical function name.
    selectors: HashMap<String, String>,
    /// Full 32-byte topic hex → token event.
    event_topics: HashMap<String, TokenEvent>,
    /// First 10 chars of a topic → token event, for truncated topics.
    topic_prefixes: HashMap<String, TokenEvent>,
}

impl AbiIndex {
    fn build() -> Result<AbiIndex, BuildIndexError> {
        let mut selectors = HashMap::new();
        let mut event_topics = HashMap::new();

        for abi_json in [ERC20_ABI, ERC721_ABI, ERC1155_ABI] {
            let items: Vec<AbiItem> = serde_json::from_str(abi_json)?;
            for item in items {
                match item.type_.as_str() {
                    "function" => {
                        let digest = keccak256(item.signature().as_bytes());
                        let selector = format!("0x{}", hex::encode(&digest[..4]));
                        selectors.entry(selector).or_insert(item.name);
                    }
                    "event" => {
                        if let Some(event) = TokenEvent::from_name(&item.name) {
                            let digest = keccak256(item.signature().as_bytes());
                            let topic = format!("0x{}", hex::encode(digest));
                            event_topics.insert(topic, event);
                        }
                    }
                    _ => {}
                }
            }
        }

        for (signature, name) in MANUAL_SELECTORS {
            let digest = keccak256(signature.as_bytes());
            let selector = format!("0x{}", hex::encode(&digest[..4]));
            selectors.insert(selector, (*name).to_string());
        }

        for (selector, name) in FALLBACK_SELECTORS {
            selectors.entry((*selector).to_string()).or_insert_with(|| (*name).to_string());
        }
        for (topic, event) in FALLBACK_TOPICS {
            event_topics.entry((*topic).to_string()).or_insert(*event);
        }

        let topic_prefixes = event_topics
            .iter()
            .map(|(topic, event)| (topic[..10].to_string(), *event))
            .collect();

        Ok(AbiIndex { selectors, event_topics, topic_prefixes })
    }
}

static INDEX: Lazy<AbiIndex> =
    Lazy::new(|| AbiIndex::build().expect("embedded token ABIs must parse"));

/// Resolves a calldata prefix to a human-readable method name. Unknown but
/// well-formed selectors pass through as their 10-char hex prefix; empty or
/// all-zero selectors resolve to the empty string.
pub fn decode_input_method(input: &str) -> String {
    let lowered = lower_hex(input);
    if !lowered.starts_with("0x") || lowered.len() < 10 {
        return String::new();
    }

    let selector = &lowered[..10];
    if selector == "0x00000000" {
        return String::new();
    }

    match INDEX.selectors.get(selector) {
        Some(name) => name.clone(),
        None => selector.to_string(),
    }
}

/// Dispatches a log's first topic to a token event, accepting both the full
/// 32-byte signature and a truncated 10-char prefix.
pub fn token_event_for_topic(topic0: &str) -> Option<TokenEvent> {
    let lowered = lower_hex(topic0);
    if let Some(event) = INDEX.event_topics.get(&lowered) {
        return Some(*event);
    }
    if lowered.len() >= 10 {
        return INDEX.topic_prefixes.get(&lowered[..10]).copied();
    }
    None
}

/// All token-event topics, for building log topic filters. Sorted for
/// deterministic request shapes.
pub fn token_event_topics() -> Vec<String> {
    let mut topics: Vec<String> = INDEX.event_topics.keys().cloned().collect();
    topics.sort();
    topics
}
