mod ingest;
mod ranges;

pub use ingest::{IngestError, IngestSummary, Ingester};
pub use ranges::block_ranges;
