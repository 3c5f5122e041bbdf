use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::ranges::block_ranges;
use crate::{
    checkpoint::{CheckpointError, CheckpointStore},
    database::clickhouse::client::{ClickhouseError, Sink},
    decode::{
        contracts_from_transactions, decode_token_events, internal_transactions_from_traces,
        logs_to_rows, token_event_topics, traces_to_rows, transactions_to_rows,
    },
    helpers::{now_millis, pad_address_topic},
    options::{Mode, Options},
    provider::{ChainProvider, Log, ProviderError, RangeData, TopicFilter},
    types::{
        AddressCheckpoint, ApprovalRow, ContractRow, LogRow, SchemaKind, TokenTransferRow,
        TraceRow, TransactionRow,
    },
};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Provider failure: {0}")]
    Provider(#[from] ProviderError),

    #[error("Write failure on table {table}: {source}")]
    Write {
        table: String,
        #[source]
        source: ClickhouseError,
    },

    #[error("Checkpoint failure: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Cursor overflow: last synced block is already at the maximum")]
    CursorOverflow,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub ranges: usize,
    pub blocks: u64,
    pub logs: usize,
    pub token_transfers: usize,
    pub approvals: usize,
    pub transactions: usize,
    pub traces: usize,
    pub contracts: usize,
}

/// Drives one address through a backfill or delta pass: loads the
/// checkpoint, computes the safe block range, walks it in serial batches
/// through the provider and decoder into the column store, and advances the
/// cursor monotonically. Retries live in the provider and the writer; a
/// range that still fails aborts the pass.
pub struct Ingester<P, S> {
    provider: Arc<P>,
    sink: Arc<S>,
    checkpoints: CheckpointStore<S>,
    opts: Options,
}

impl<P: ChainProvider, S: Sink> Ingester<P, S> {
    pub fn new(provider: Arc<P>, sink: Arc<S>, opts: Options) -> Self {
        let checkpoints = CheckpointStore::new(Arc::clone(&sink));
        Ingester { provider, sink, checkpoints, opts }
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub async fn run(&self) -> Result<IngestSummary, IngestError> {
        self.run_pass(self.opts.mode).await
    }

    pub async fn backfill(&self) -> Result<IngestSummary, IngestError> {
        self.run_pass(Mode::Backfill).await
    }

    pub async fn delta(&self) -> Result<IngestSummary, IngestError> {
        self.run_pass(Mode::Delta).await
    }

    async fn run_pass(&self, mode: Mode) -> Result<IngestSummary, IngestError> {
        let head = self.provider.head_block().await?;
        let existing = self.checkpoints.load(&self.opts.address).await?;

        let safe_head = if self.opts.confirmations > 0 {
            if head <= self.opts.confirmations {
                // Entirely inside the confirmation window: nothing can be
                // processed safely, only an existing cursor gets its
                // timestamp refreshed.
                info!(head, confirmations = self.opts.confirmations, "no safe head yet");
                if existing.is_some() {
                    self.persist(existing.as_ref(), None, mode).await?;
                }
                return Ok(IngestSummary::default());
            }
            head - self.opts.confirmations
        } else {
            head
        };

        let from = self.compute_from(mode, existing.as_ref(), safe_head)?;
        let to = self.opts.to_block.unwrap_or(head).min(safe_head);

        if from > to {
            info!(address = %self.opts.address, %mode, from, to, "nothing new to process");
            if existing.is_some() {
                self.persist(existing.as_ref(), None, mode).await?;
            }
            return Ok(IngestSummary::default());
        }

        let ranges = block_ranges(from, to, self.opts.batch_blocks);
        let total = ranges.len();
        let mut summary = IngestSummary::default();
        let mut last_processed: Option<u64> = None;

        for (index, (start, end)) in ranges.into_iter().enumerate() {
            info!(
                address = %self.opts.address,
                %mode,
                range = index + 1,
                total,
                start,
                end,
                "processing range"
            );

            if let Err(error) = self.process_range(start, end, &mut summary).await {
                // Completed ranges stay committed; the cursor never moves
                // past the failed one.
                if last_processed.is_some() {
                    self.persist(existing.as_ref(), last_processed, mode).await?;
                }
                return Err(error);
            }

            last_processed = Some(end);
            summary.ranges += 1;
            summary.blocks += end - start + 1;
        }

        self.persist(existing.as_ref(), last_processed, mode).await?;

        info!(
            address = %self.opts.address,
            %mode,
            ranges = summary.ranges,
            blocks = summary.blocks,
            logs = summary.logs,
            token_transfers = summary.token_transfers,
            approvals = summary.approvals,
            transactions = summary.transactions,
            traces = summary.traces,
            contracts = summary.contracts,
            "pass complete"
        );
        Ok(summary)
    }

    fn compute_from(
        &self,
        mode: Mode,
        existing: Option<&AddressCheckpoint>,
        safe_head: u64,
    ) -> Result<u64, IngestError> {
        match mode {
            Mode::Backfill => {
                let mut from = self.opts.from_block;
                if let Some(checkpoint) = existing {
                    let resume = checkpoint
                        .last_synced_block
                        .checked_add(1)
                        .ok_or(IngestError::CursorOverflow)?;
                    from = from.max(resume);
                }
                Ok(from)
            }
            Mode::Delta => {
                let mut last = existing.map(|c| c.last_synced_block).unwrap_or(0);
                if last > safe_head {
                    warn!(
                        last_synced_block = last,
                        safe_head, "cursor is past the safe head, clamping for reorg replay"
                    );
                    last = safe_head;
                }

                if self.opts.confirmations > 0 {
                    // The rolling reorg window is reprocessed on every pass.
                    let reorg_start = (last + 1).saturating_sub(self.opts.confirmations);
                    Ok(self.opts.from_block.max(reorg_start))
                } else {
                    let resume = last.checked_add(1).ok_or(IngestError::CursorOverflow)?;
                    Ok(self.opts.from_block.max(resume))
                }
            }
        }
    }

    /// The unit of work: fetch, enrich timestamps, decode, insert. Failure
    /// on any table aborts the range.
    async fn process_range(
        &self,
        from: u64,
        to: u64,
        summary: &mut IngestSummary,
    ) -> Result<(), IngestError> {
        let address = self.opts.address.clone();

        let mut logs = self.fetch_address_logs(from, to).await?;
        let mut traces = self.provider.trace_block(from, to, &address).await?.into_rows();
        let mut transactions =
            self.provider.transactions(&address, from, to).await?.into_rows();

        // Per-range block -> timestamp map, asking the provider only for
        // blocks no record resolved yet.
        let mut timestamps: HashMap<u64, i64> = HashMap::new();
        for log in &logs {
            if log.ts_millis > 0 {
                timestamps.insert(log.block_number, log.ts_millis);
            }
        }
        for tx in &transactions {
            if tx.ts_millis > 0 {
                timestamps.insert(tx.block_number, tx.ts_millis);
            }
        }
        let missing: BTreeSet<u64> = logs
            .iter()
            .map(|l| l.block_number)
            .chain(traces.iter().map(|t| t.block_number))
            .chain(transactions.iter().map(|t| t.block_number))
            .filter(|block| !timestamps.contains_key(block))
            .collect();
        for block in missing {
            match self.provider.block_timestamp(block).await {
                Ok(millis) => {
                    timestamps.insert(block, millis);
                }
                Err(error) => {
                    warn!(block, %error, "leaving records without a block timestamp");
                }
            }
        }
        for log in &mut logs {
            if log.ts_millis == 0 {
                log.ts_millis = timestamps.get(&log.block_number).copied().unwrap_or(0);
            }
        }
        for trace in &mut traces {
            if trace.ts_millis == 0 {
                trace.ts_millis = timestamps.get(&trace.block_number).copied().unwrap_or(0);
            }
        }
        for tx in &mut transactions {
            if tx.ts_millis == 0 {
                tx.ts_millis = timestamps.get(&tx.block_number).copied().unwrap_or(0);
            }
        }

        let log_rows = logs_to_rows(&logs);
        let (transfer_rows, approval_rows) = decode_token_events(&logs);
        let trace_rows = traces_to_rows(&traces);
        let mut transaction_rows = transactions_to_rows(&transactions);
        transaction_rows.extend(internal_transactions_from_traces(&traces, &address));
        let contract_rows = contracts_from_transactions(&transactions);

        let schema = self.opts.schema;
        let ingested_at = now_millis();

        summary.logs += log_rows.len();
        summary.token_transfers += transfer_rows.len();
        summary.approvals += approval_rows.len();
        summary.transactions += transaction_rows.len();
        summary.traces += trace_rows.len();

        self.insert(
            schema.table(LogRow::TABLE),
            log_rows.iter().map(|row| row.to_row(schema, ingested_at)).collect(),
        )
        .await?;
        self.insert(
            schema.table(TokenTransferRow::TABLE),
            transfer_rows.iter().map(|row| row.to_row(schema, ingested_at)).collect(),
        )
        .await?;
        self.insert(
            schema.table(ApprovalRow::TABLE),
            approval_rows.iter().map(|row| row.to_row(schema, ingested_at)).collect(),
        )
        .await?;
        self.insert(
            schema.table(TransactionRow::TABLE),
            transaction_rows.iter().map(|row| row.to_row(schema, ingested_at)).collect(),
        )
        .await?;
        self.insert(
            schema.table(TraceRow::TABLE),
            trace_rows.iter().map(|row| row.to_row(schema, ingested_at)).collect(),
        )
        .await?;

        // Contract rows are a canonical-schema concern only.
        if schema == SchemaKind::Canonical {
            summary.contracts += contract_rows.len();
            self.insert(
                ContractRow::TABLE.to_string(),
                contract_rows.iter().map(|row| row.to_row(schema, ingested_at)).collect(),
            )
            .await?;
        }

        Ok(())
    }

    /// Logs touching the address: the padded address can sit in topic
    /// position 1, 2 or 3 of a token event, so the range is queried once per
    /// position and merged, deduplicated on (tx_hash, log_index).
    async fn fetch_address_logs(&self, from: u64, to: u64) -> Result<Vec<Log>, IngestError> {
        let events = TopicFilter::Any(token_event_topics());
        let padded = pad_address_topic(&self.opts.address);

        let positions: [Vec<Option<TopicFilter>>; 3] = [
            vec![Some(events.clone()), Some(TopicFilter::Single(padded.clone()))],
            vec![Some(events.clone()), None, Some(TopicFilter::Single(padded.clone()))],
            vec![Some(events), None, None, Some(TopicFilter::Single(padded))],
        ];

        let mut merged: Vec<Log> = Vec::new();
        let mut seen: HashSet<(String, u64)> = HashSet::new();
        for topics in positions {
            let logs = self.provider.get_logs(None, from, to, &topics).await?;
            for log in logs {
                if seen.insert((log.tx_hash.clone(), log.log_index)) {
                    merged.push(log);
                }
            }
        }
        merged.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(merged)
    }

    async fn insert(&self, table: String, rows: Vec<Value>) -> Result<(), IngestError> {
        self.sink
            .insert_json_each_row(&table, &rows)
            .await
            .map_err(|source| IngestError::Write { table, source })
    }

    /// Appends a fresh checkpoint row. `advanced_to` moves the cursor
    /// forward, never backward; `None` refreshes timestamps only.
    async fn persist(
        &self,
        existing: Option<&AddressCheckpoint>,
        advanced_to: Option<u64>,
        mode: Mode,
    ) -> Result<(), IngestError> {
        let now = now_millis();
        let prior = existing.cloned().unwrap_or_else(|| AddressCheckpoint {
            address: self.opts.address.clone(),
            ..Default::default()
        });

        let last_synced_block = match advanced_to {
            Some(block) => prior.last_synced_block.max(block),
            None => prior.last_synced_block,
        };

        let checkpoint = AddressCheckpoint {
            address: self.opts.address.clone(),
            last_synced_block,
            last_backfill_at: if mode == Mode::Backfill { now } else { prior.last_backfill_at },
            last_delta_at: if mode == Mode::Delta { now } else { prior.last_delta_at },
            updated_at: now,
        };

        self.checkpoints.save(&checkpoint).await?;
        Ok(())
    }
}
