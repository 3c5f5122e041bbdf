mod rows;
mod schema;

pub use rows::{
    event_uid, trace_uid, AddressCheckpoint, ApprovalRow, ContractRow, LogRow, TokenStandard,
    TokenTransferRow, TraceRow, TransactionRow,
};
pub use schema::SchemaKind;
