// ABOUTME: The loan ledger: tracks which holder currently has which account.
// ABOUTME: Borrow, return, and reset are single atomic operations under one lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::record::{AccountRecord, AccountStatus, HolderId};
use crate::store::{NewAccount, RecordStore, StoreError};

/// Errors produced by ledger operations. Precondition violations carry
/// enough context for a user-facing message; store failures pass through.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("holder is already borrowing an account")]
    AlreadyBorrowing,

    #[error("holder has no account to return")]
    NothingBorrowed,

    #[error("account {0} is no longer available")]
    AccountTaken(String),

    #[error("no account with id {0} exists in the store")]
    AccountMissing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a successful return.
#[derive(Debug, Clone)]
pub enum ReturnOutcome {
    /// The store agreed the account was borrowed; it is now available again.
    Returned(AccountRecord),
    /// The store no longer showed the account as borrowed (changed
    /// out-of-band). The stale ledger entry was dropped without a store
    /// write; the holder must borrow again.
    OutOfSync(AccountRecord),
}

/// What a startup rebuild found in the store.
#[derive(Debug, Clone)]
pub struct RebuildReport {
    /// Total account rows read.
    pub total: usize,
    /// Rows still marked borrowed. Holder identities are not recoverable
    /// from the sheet, so these start the process stranded until an admin
    /// reset or a manual edit frees them.
    pub stranded: Vec<AccountRecord>,
}

struct LedgerInner {
    loans: HashMap<HolderId, AccountRecord>,
    active: HashSet<HolderId>,
}

/// Process-wide loan tracking over an injected record store.
///
/// Both structures live behind a single mutex that is held across the store
/// write, so a borrow or return observes and mutates the ledger as one
/// atomic step. `loans` and `active` are updated together and only under
/// that lock; every key in one is a key in the other.
pub struct Ledger {
    store: Arc<dyn RecordStore>,
    inner: Mutex<LedgerInner>,
}

impl Ledger {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(LedgerInner {
                loans: HashMap::new(),
                active: HashSet::new(),
            }),
        }
    }

    /// Derive startup state from the store. The ledger itself starts empty
    /// (holders are unknown after a restart); rows still marked borrowed
    /// are reported so an operator can free them.
    pub async fn rebuild(&self) -> Result<RebuildReport, StoreError> {
        let records = self.store.list_all().await?;
        let stranded: Vec<AccountRecord> = records
            .iter()
            .filter(|r| r.status == AccountStatus::Borrowed)
            .cloned()
            .collect();

        for record in &stranded {
            tracing::warn!(
                account = %record.name,
                row = record.row,
                "row still marked borrowed with no known holder"
            );
        }

        Ok(RebuildReport {
            total: records.len(),
            stranded,
        })
    }

    /// Append a new account row with status available.
    pub async fn register(&self, account: NewAccount) -> Result<(), StoreError> {
        self.store.append(account).await
    }

    /// All records currently marked available, freshly read from the store.
    pub async fn available(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let records = self.store.list_all().await?;
        Ok(records.into_iter().filter(AccountRecord::is_available).collect())
    }

    /// The record a holder currently has on loan, if any.
    pub async fn current_loan(&self, holder: HolderId) -> Option<AccountRecord> {
        self.inner.lock().await.loans.get(&holder).cloned()
    }

    /// Whether a holder currently has any loan.
    pub async fn is_active(&self, holder: HolderId) -> bool {
        self.inner.lock().await.active.contains(&holder)
    }

    /// Borrow the account with the given id for `holder`.
    ///
    /// The record's row is re-resolved from the store at write time rather
    /// than trusted from an earlier listing, so the status write lands on
    /// the row that currently holds the record.
    pub async fn borrow(
        &self,
        holder: HolderId,
        account_id: &str,
    ) -> Result<AccountRecord, LedgerError> {
        let mut inner = self.inner.lock().await;

        if inner.active.contains(&holder) {
            return Err(LedgerError::AlreadyBorrowing);
        }

        let mut record = self
            .resolve(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountMissing(account_id.to_string()))?;

        if !record.is_available() {
            return Err(LedgerError::AccountTaken(record.name));
        }

        self.store
            .set_status(record.row, AccountStatus::Borrowed)
            .await?;
        record.status = AccountStatus::Borrowed;

        inner.active.insert(holder);
        inner.loans.insert(holder, record.clone());

        tracing::info!(holder = %holder, account = %record.name, "account borrowed");
        Ok(record)
    }

    /// Return the account `holder` currently has on loan.
    ///
    /// If the store no longer shows the record as borrowed, the ledger
    /// entry is stale: it is dropped without a store write and the caller
    /// learns the loan was out of sync.
    pub async fn give_back(&self, holder: HolderId) -> Result<ReturnOutcome, LedgerError> {
        let mut inner = self.inner.lock().await;

        let held = inner
            .loans
            .get(&holder)
            .cloned()
            .ok_or(LedgerError::NothingBorrowed)?;

        let current = self.resolve(&held.account_id).await?;
        match current {
            Some(record) if record.status == AccountStatus::Borrowed => {
                self.store
                    .set_status(record.row, AccountStatus::Available)
                    .await?;
                inner.loans.remove(&holder);
                inner.active.remove(&holder);
                tracing::info!(holder = %holder, account = %held.name, "account returned");
                Ok(ReturnOutcome::Returned(held))
            }
            _ => {
                inner.loans.remove(&holder);
                inner.active.remove(&holder);
                tracing::warn!(
                    holder = %holder,
                    account = %held.name,
                    "store no longer shows loan as borrowed; dropping stale entry"
                );
                Ok(ReturnOutcome::OutOfSync(held))
            }
        }
    }

    /// Administrative reset: remove `holder` from both structures
    /// unconditionally. A no-op when the holder has no loan. When a loan
    /// existed, the released row is set back to available on a best-effort
    /// basis; a store failure is logged but never blocks the reset.
    pub async fn reset(&self, holder: HolderId) -> Option<AccountRecord> {
        let mut inner = self.inner.lock().await;
        inner.active.remove(&holder);
        let released = inner.loans.remove(&holder)?;

        match self.resolve(&released.account_id).await {
            Ok(Some(record)) => {
                if let Err(err) = self
                    .store
                    .set_status(record.row, AccountStatus::Available)
                    .await
                {
                    tracing::warn!(
                        holder = %holder,
                        row = record.row,
                        error = %err,
                        "failed to release row during reset"
                    );
                }
            }
            Ok(None) => {
                tracing::warn!(
                    holder = %holder,
                    account_id = %released.account_id,
                    "released account no longer exists in store"
                );
            }
            Err(err) => {
                tracing::warn!(holder = %holder, error = %err, "could not read store during reset");
            }
        }

        tracing::info!(holder = %holder, account = %released.name, "loan forcibly reset");
        Some(released)
    }

    /// Locate a record by its id column, resolving the row it currently
    /// occupies.
    async fn resolve(&self, account_id: &str) -> Result<Option<AccountRecord>, StoreError> {
        let records = self.store.list_all().await?;
        Ok(records.into_iter().find(|r| r.account_id == account_id))
    }
}
