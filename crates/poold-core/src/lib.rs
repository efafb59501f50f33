// ABOUTME: Core library for poold, containing the account domain types and loan ledger.
// ABOUTME: Defines the RecordStore trait that persistence adapters implement.

pub mod ledger;
pub mod record;
pub mod store;
pub mod testing;

pub use ledger::{Ledger, LedgerError, RebuildReport, ReturnOutcome};
pub use record::{AccountRecord, AccountStatus, HolderId};
pub use store::{NewAccount, RecordStore, StoreError};
