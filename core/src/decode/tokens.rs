use alloy_primitives::U256;

use super::selectors::{token_event_for_topic, TokenEvent};
use crate::{
    helpers::address_from_topic,
    provider::Log,
    types::{event_uid, ApprovalRow, TokenStandard, TokenTransferRow},
};

/// Splits ABI-encoded data into 32-byte words, dropping a trailing partial
/// word so truncated payloads decode as far as they go.
fn data_words(data: &str) -> Vec<String> {
    let digits = data.strip_prefix("0x").unwrap_or(data);
    digits
        .as_bytes()
        .chunks(64)
        .filter(|chunk| chunk.len() == 64)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

fn word_to_decimal(word: &str) -> String {
    U256::from_str_radix(word, 16).map(|v| v.to_string()).unwrap_or_else(|_| "0".to_string())
}

fn word_to_index(word: &str) -> Option<u64> {
    u64::from_str_radix(word.trim_start_matches('0'), 16)
        .ok()
        .or_else(|| if word.bytes().all(|b| b == b'0') { Some(0) } else { None })
}

fn has_data(data: &str) -> bool {
    let trimmed = data.trim();
    !trimmed.is_empty() && trimmed != "0x"
}

fn first_word_decimal(data: &str) -> String {
    data_words(data).first().map(|word| word_to_decimal(word)).unwrap_or_else(|| "0".to_string())
}

/// Last data word equals one. ApprovalForAll encodes its bool as a full
/// right-aligned word.
fn last_word_is_one(data: &str) -> bool {
    data_words(data)
        .last()
        .and_then(|word| U256::from_str_radix(word, 16).ok())
        .map(|value| value == U256::from(1u64))
        .unwrap_or(false)
}

/// ABI-decodes `(uint256[] ids, uint256[] values)` out of TransferBatch
/// data: two word offsets, then for each array its length followed by
/// `length` words. Arrays truncate at whatever the payload actually holds.
fn decode_batch_arrays(data: &str) -> (Vec<String>, Vec<String>) {
    let words = data_words(data);

    let read_array = |offset_word: usize| -> Vec<String> {
        let offset = match words.get(offset_word).and_then(|w| word_to_index(w)) {
            // Byte offset into the data section, in 32-byte units.
            Some(bytes) => (bytes / 32) as usize,
            None => return Vec::new(),
        };
        let length = match words.get(offset).and_then(|w| word_to_index(w)) {
            Some(length) => length.min(words.len() as u64) as usize,
            None => return Vec::new(),
        };

        let mut out = Vec::with_capacity(length);
        for k in 0..length {
            match words.get(offset + 1 + k) {
                Some(word) => out.push(word_to_decimal(word)),
                None => break,
            }
        }
        out
    };

    (read_array(0), read_array(1))
}

/// Maps raw logs to token-transfer and approval rows, dispatching on the
/// first topic. Logs that are not token events pass through untouched.
pub fn decode_token_events(logs: &[Log]) -> (Vec<TokenTransferRow>, Vec<ApprovalRow>) {
    let mut transfers = Vec::new();
    let mut approvals = Vec::new();

    for log in logs {
        let Some(topic0) = log.topics.first() else { continue };
        let Some(event) = token_event_for_topic(topic0) else { continue };

        match event {
            TokenEvent::Transfer => {
                if log.topics.len() == 3 && has_data(&log.data) {
                    transfers.push(TokenTransferRow {
                        event_uid: event_uid(&log.tx_hash, log.log_index, None),
                        tx_hash: log.tx_hash.clone(),
                        log_index: log.log_index,
                        token: log.address.clone(),
                        from_address: address_from_topic(&log.topics[1]),
                        to_address: address_from_topic(&log.topics[2]),
                        amount_raw: first_word_decimal(&log.data),
                        token_id: String::new(),
                        standard: TokenStandard::Erc20,
                        batch_ordinal: 0,
                        block_number: log.block_number,
                        ts_millis: log.ts_millis,
                    });
                } else if log.topics.len() == 4 && !has_data(&log.data) {
                    transfers.push(TokenTransferRow {
                        event_uid: event_uid(&log.tx_hash, log.log_index, None),
                        tx_hash: log.tx_hash.clone(),
                        log_index: log.log_index,
                        token: log.address.clone(),
                        from_address: address_from_topic(&log.topics[1]),
                        to_address: address_from_topic(&log.topics[2]),
                        amount_raw: "1".to_string(),
                        token_id: word_to_decimal(log.topics[3].trim_start_matches("0x")),
                        standard: TokenStandard::Erc721,
                        batch_ordinal: 0,
                        block_number: log.block_number,
                        ts_millis: log.ts_millis,
                    });
                }
            }
            TokenEvent::Approval => {
                if log.topics.len() == 3 && has_data(&log.data) {
                    approvals.push(ApprovalRow {
                        event_uid: event_uid(&log.tx_hash, log.log_index, None),
                        tx_hash: log.tx_hash.clone(),
                        log_index: log.log_index,
                        token: log.address.clone(),
                        owner: address_from_topic(&log.topics[1]),
                        spender: address_from_topic(&log.topics[2]),
                        amount_raw: first_word_decimal(&log.data),
                        token_id: String::new(),
                        is_approval_for_all: 0,
                        standard: TokenStandard::Erc20,
                        block_number: log.block_number,
                        ts_millis: log.ts_millis,
                    });
                } else if log.topics.len() == 4 && !has_data(&log.data) {
                    approvals.push(ApprovalRow {
                        event_uid: event_uid(&log.tx_hash, log.log_index, None),
                        tx_hash: log.tx_hash.clone(),
                        log_index: log.log_index,
                        token: log.address.clone(),
                        owner: address_from_topic(&log.topics[1]),
                        spender: address_from_topic(&log.topics[2]),
                        amount_raw: String::new(),
                        token_id: word_to_decimal(log.topics[3].trim_start_matches("0x")),
                        is_approval_for_all: 0,
                        standard: TokenStandard::Erc721,
                        block_number: log.block_number,
                        ts_millis: log.ts_millis,
                    });
                }
            }
            TokenEvent::ApprovalForAll => {
                if log.topics.len() < 3 {
                    continue;
                }
                approvals.push(ApprovalRow {
                    event_uid: event_uid(&log.tx_hash, log.log_index, None),
                    tx_hash: log.tx_hash.clone(),
                    log_index: log.log_index,
                    token: log.address.clone(),
                    owner: address_from_topic(&log.topics[1]),
                    spender: address_from_topic(&log.topics[2]),
                    amount_raw: String::new(),
                    token_id: String::new(),
                    is_approval_for_all: last_word_is_one(&log.data) as u8,
                    standard: TokenStandard::Erc721,
                    block_number: log.block_number,
                    ts_millis: log.ts_millis,
                });
            }
            TokenEvent::TransferSingle => {
                if log.topics.len() < 4 {
                    continue;
                }
                let words = data_words(&log.data);
                transfers.push(TokenTransferRow {
                    event_uid: event_uid(&log.tx_hash, log.log_index, None),
                    tx_hash: log.tx_hash.clone(),
                    log_index: log.log_index,
                    token: log.address.clone(),
                    from_address: address_from_topic(&log.topics[2]),
                    to_address: address_from_topic(&log.topics[3]),
                    amount_raw: words
                        .get(1)
                        .map(|word| word_to_decimal(word))
                        .unwrap_or_else(|| "0".to_string()),
                    token_id: words
                        .first()
                        .map(|word| word_to_decimal(word))
                        .unwrap_or_else(|| "0".to_string()),
                    standard: TokenStandard::Erc1155,
                    batch_ordinal: 0,
                    block_number: log.block_number,
                    ts_millis: log.ts_millis,
                });
            }
            TokenEvent::TransferBatch => {
                if log.topics.len() < 4 {
                    continue;
                }
                let (ids, values) = decode_batch_arrays(&log.data);
                let pairs = ids.len().min(values.len());
                for k in 0..pairs {
                    transfers.push(TokenTransferRow {
                        event_uid: event_uid(&log.tx_hash, log.log_index, Some(k as u32)),
                        tx_hash: log.tx_hash.clone(),
                        log_index: log.log_index,
                        token: log.address.clone(),
                        from_address: address_from_topic(&log.topics[2]),
                        to_address: address_from_topic(&log.topics[3]),
                        amount_raw: values[k].clone(),
                        token_id: ids[k].clone(),
                        standard: TokenStandard::Erc1155,
                        batch_ordinal: k as u32,
                        block_number: log.block_number,
                        ts_millis: log.ts_millis,
                    });
                }
            }
        }
    }

    (transfers, approvals)
}
