// ABOUTME: Defines the RecordStore trait that all persistence adapters implement.
// ABOUTME: Also defines NewAccount (a row before the store assigns it a position) and StoreError.

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{AccountRecord, AccountStatus};

/// Errors surfaced by a record store. Every operation is a direct,
/// unbuffered call to the backing service; failures propagate to the
/// invoking command handler without retries.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport error: {0}")]
    Transport(String),

    #[error("unexpected response from store: {0}")]
    InvalidResponse(String),

    #[error("store authentication failed: {0}")]
    Auth(String),
}

/// Field values for a not-yet-persisted account row. The store assigns the
/// row position and sets the status to available on append.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub account_id: String,
    pub password: String,
    pub rank: String,
}

/// The persistence seam for account rows. Implemented by the spreadsheet
/// adapter in production and by an in-memory stub in tests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a new row with status "available". No duplicate-name check.
    async fn append(&self, account: NewAccount) -> Result<(), StoreError>;

    /// Read every data row. Row numbers are computed as header offset plus
    /// position; rows that do not parse are skipped.
    async fn list_all(&self) -> Result<Vec<AccountRecord>, StoreError>;

    /// Write the status cell of one row. No optimistic-concurrency check.
    async fn set_status(&self, row: u32, status: AccountStatus) -> Result<(), StoreError>;

    /// Write an arbitrary cell of one row, addressed by 1-based column.
    /// Used for rank changes.
    async fn set_field(&self, row: u32, column: u32, value: &str) -> Result<(), StoreError>;
}
