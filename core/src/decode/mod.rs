mod selectors;
mod tokens;

pub use selectors::{decode_input_method, token_event_for_topic, token_event_topics, TokenEvent};
pub use tokens::decode_token_events;

use crate::{
    helpers::{lower_hex, value_to_decimal},
    provider::{Log, Trace, Transaction},
    types::{event_uid, trace_uid, ContractRow, LogRow, TraceRow, TransactionRow},
};

pub fn logs_to_rows(logs: &[Log]) -> Vec<LogRow> {
    logs.iter()
        .map(|log| LogRow {
            event_uid: event_uid(&log.tx_hash, log.log_index, None),
            tx_hash: log.tx_hash.clone(),
            log_index: log.log_index,
            address: log.address.clone(),
            // Defensive copy - rows must not alias provider buffers.
            topics: log.topics.to_vec(),
            data_hex: log.data.clone(),
            block_number: log.block_number,
            ts_millis: log.ts_millis,
        })
        .collect()
}

pub fn traces_to_rows(traces: &[Trace]) -> Vec<TraceRow> {
    traces
        .iter()
        .map(|trace| TraceRow {
            trace_uid: trace_uid(&trace.tx_hash, &trace.trace_id),
            tx_hash: trace.tx_hash.clone(),
            trace_id: trace.trace_id.clone(),
            from_address: trace.from_address.clone(),
            to_address: trace.to_address.clone(),
            value_raw: value_to_decimal(&trace.value_hex),
            block_number: trace.block_number,
            ts_millis: trace.ts_millis,
        })
        .collect()
}

pub fn transactions_to_rows(transactions: &[Transaction]) -> Vec<TransactionRow> {
    transactions
        .iter()
        .map(|tx| TransactionRow {
            tx_hash: tx.tx_hash.clone(),
            from_address: tx.from_address.clone(),
            to_address: tx.to_address.clone(),
            value_raw: value_to_decimal(&tx.value_hex),
            gas_used: value_to_decimal(&tx.gas_used_hex),
            status: tx.status,
            input_method: decode_input_method(&tx.input),
            block_number: tx.block_number,
            ts_millis: tx.ts_millis,
            is_internal: 0,
            trace_id: String::new(),
        })
        .collect()
}

/// Internal transactions out of non-root traces touching the target
/// address. Root traces duplicate the external transaction and are
/// excluded.
pub fn internal_transactions_from_traces(
    traces: &[Trace],
    address: &str,
) -> Vec<TransactionRow> {
    let target = lower_hex(address);

    traces
        .iter()
        .filter(|trace| !trace.is_root())
        .filter(|trace| trace.from_address == target || trace.to_address == target)
        .map(|trace| TransactionRow {
            tx_hash: trace.tx_hash.clone(),
            from_address: trace.from_address.clone(),
            to_address: trace.to_address.clone(),
            value_raw: value_to_decimal(&trace.value_hex),
            gas_used: value_to_decimal(&trace.gas_used_hex),
            status: if trace.error.is_some() { 0 } else { 1 },
            input_method: decode_input_method(&trace.input),
            block_number: trace.block_number,
            ts_millis: trace.ts_millis,
            is_internal: 1,
            trace_id: trace.trace_id.clone(),
        })
        .collect()
}

/// Contract creations: external transactions with no recipient whose
/// receipt reported a deployed address.
pub fn contracts_from_transactions(transactions: &[Transaction]) -> Vec<ContractRow> {
    transactions
        .iter()
        .filter(|tx| tx.to_address.is_empty())
        .filter_map(|tx| {
            tx.contract_address.as_ref().map(|deployed| ContractRow {
                address: deployed.clone(),
                creator: tx.from_address.clone(),
                tx_hash: tx.tx_hash.clone(),
                block_number: tx.block_number,
                ts_millis: tx.ts_millis,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trace(trace_id: &str, from: &str, to: &str) -> Trace {
        Trace {
            tx_hash: "0xabc".to_string(),
            trace_id: trace_id.to_string(),
            from_address: from.to_string(),
            to_address: to.to_string(),
            value_hex: "0x64".to_string(),
            input: "0xa9059cbb00000000".to_string(),
            gas_used_hex: "0x5208".to_string(),
            error: None,
            block_number: 11,
            ts_millis: 1_000,
        }
    }

    #[test]
    fn log_rows_get_stable_uids_and_copied_topics() {
        let log = Log {
            address: "0xtoken".to_string(),
            topics: vec!["0xt0".to_string(), "0xt1".to_string()],
            data: "0x01".to_string(),
            block_number: 5,
            tx_hash: "0xabc".to_string(),
            log_index: 2,
            ts_millis: 9,
        };

        let rows = logs_to_rows(std::slice::from_ref(&log));
        assert_eq!(rows[0].event_uid, "0xabc:2");
        assert_eq!(rows[0].topics, log.topics);
        assert_eq!(logs_to_rows(std::slice::from_ref(&log)), rows);
    }

    #[test]
    fn trace_rows_convert_values_to_decimal() {
        let rows = traces_to_rows(&[trace("0-1", "0xaa", "0xbb")]);
        assert_eq!(rows[0].trace_uid, "0xabc:0-1");
        assert_eq!(rows[0].value_raw, "100");
    }

    #[test]
    fn internal_rows_exclude_root_and_other_addresses() {
        let traces = vec![
            trace("root", "0xaa", "0xbb"),
            trace("0", "0xaa", "0xcc"),
            trace("0-1", "0xdd", "0xee"),
            trace("1", "0xcc", "0xAA"),
        ];

        let rows = internal_transactions_from_traces(&traces, "0xAA");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trace_id, "0");
        assert_eq!(rows[0].is_internal, 1);
        assert_eq!(rows[0].input_method, "transfer");
        assert_eq!(rows[0].gas_used, "21000");
    }

    #[test]
    fn failed_trace_maps_to_zero_status() {
        let mut failed = trace("0", "0xaa", "0xbb");
        failed.error = Some("Reverted".to_string());
        let rows = internal_transactions_from_traces(&[failed], "0xaa");
        assert_eq!(rows[0].status, 0);
    }

    #[test]
    fn external_rows_have_no_trace_id() {
        let tx = Transaction {
            tx_hash: "0xabc".to_string(),
            from_address: "0xaa".to_string(),
            to_address: "0xbb".to_string(),
            value_hex: "0xde0b6b3a7640000".to_string(),
            gas_used_hex: "0x5208".to_string(),
            status: 1,
            input: "0x".to_string(),
            block_number: 3,
            ts_millis: 1,
            contract_address: None,
        };

        let rows = transactions_to_rows(&[tx]);
        assert_eq!(rows[0].is_internal, 0);
        assert_eq!(rows[0].trace_id, "");
        assert_eq!(rows[0].value_raw, "1000000000000000000");
        assert_eq!(rows[0].input_method, "");
    }

    #[test]
    fn contract_creations_need_an_empty_recipient_and_a_receipt_address() {
        let deploy = Transaction {
            tx_hash: "0xabc".to_string(),
            from_address: "0xaa".to_string(),
            to_address: String::new(),
            value_hex: "0x0".to_string(),
            gas_used_hex: "0x0".to_string(),
            status: 1,
            input: "0x60806040".to_string(),
            block_number: 3,
            ts_millis: 1,
            contract_address: Some("0xnew".to_string()),
        };
        let mut plain = deploy.clone();
        plain.to_address = "0xbb".to_string();

        let rows = contracts_from_transactions(&[deploy, plain]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "0xnew");
        assert_eq!(rows[0].creator, "0xaa");
    }
}
