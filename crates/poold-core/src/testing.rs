// ABOUTME: Test utilities for poold-core, including an in-memory record store.
// ABOUTME: Used in tests to exercise the ledger and handlers without a real spreadsheet.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::record::{
    AccountRecord, AccountStatus, COL_ID, COL_NAME, COL_PASSWORD, COL_RANK, COL_STATUS, HEADER_ROW,
};
use crate::store::{NewAccount, RecordStore, StoreError};

struct MemoryInner {
    rows: Vec<AccountRecord>,
    writes: usize,
    fail_next_write: bool,
}

/// An in-memory RecordStore backed by a plain Vec.
///
/// Row numbers follow the sheet convention: the first record sits directly
/// below the header row. `fail_next_write` lets a test simulate one
/// transport failure to exercise error paths.
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                rows: Vec::new(),
                writes: 0,
                fail_next_write: false,
            }),
        }
    }

    /// Create a store pre-seeded with available accounts given as
    /// (name, id, password, rank) tuples.
    pub fn with_accounts(accounts: Vec<(&str, &str, &str, &str)>) -> Self {
        let rows = accounts
            .into_iter()
            .enumerate()
            .map(|(i, (name, id, pw, rank))| AccountRecord {
                name: name.to_string(),
                account_id: id.to_string(),
                password: pw.to_string(),
                rank: rank.to_string(),
                status: AccountStatus::Available,
                row: HEADER_ROW + 1 + i as u32,
            })
            .collect();

        Self {
            inner: Mutex::new(MemoryInner {
                rows,
                writes: 0,
                fail_next_write: false,
            }),
        }
    }

    /// Current rows, for assertions.
    pub async fn snapshot(&self) -> Vec<AccountRecord> {
        self.inner.lock().await.rows.clone()
    }

    /// Number of mutating calls (append, set_status, set_field) so far.
    pub async fn write_count(&self) -> usize {
        self.inner.lock().await.writes
    }

    /// Make the next mutating call fail with a transport error.
    pub async fn fail_next_write(&self) {
        self.inner.lock().await.fail_next_write = true;
    }
}

fn take_failure(inner: &mut MemoryInner) -> Result<(), StoreError> {
    if inner.fail_next_write {
        inner.fail_next_write = false;
        return Err(StoreError::Transport("injected failure".to_string()));
    }
    inner.writes += 1;
    Ok(())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(&self, account: NewAccount) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        take_failure(&mut inner)?;
        let row = HEADER_ROW + 1 + inner.rows.len() as u32;
        inner.rows.push(AccountRecord {
            name: account.name,
            account_id: account.account_id,
            password: account.password,
            rank: account.rank,
            status: AccountStatus::Available,
            row,
        });
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AccountRecord>, StoreError> {
        Ok(self.inner.lock().await.rows.clone())
    }

    async fn set_status(&self, row: u32, status: AccountStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        take_failure(&mut inner)?;
        let record = inner
            .rows
            .iter_mut()
            .find(|r| r.row == row)
            .ok_or_else(|| StoreError::InvalidResponse(format!("no row {row}")))?;
        record.status = status;
        Ok(())
    }

    async fn set_field(&self, row: u32, column: u32, value: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        take_failure(&mut inner)?;
        let record = inner
            .rows
            .iter_mut()
            .find(|r| r.row == row)
            .ok_or_else(|| StoreError::InvalidResponse(format!("no row {row}")))?;
        match column {
            COL_NAME => record.name = value.to_string(),
            COL_ID => record.account_id = value.to_string(),
            COL_PASSWORD => record.password = value.to_string(),
            COL_RANK => record.rank = value.to_string(),
            COL_STATUS => {
                record.status = AccountStatus::parse(value)
                    .ok_or_else(|| StoreError::InvalidResponse(format!("bad status {value:?}")))?;
            }
            other => {
                return Err(StoreError::InvalidResponse(format!("no column {other}")));
            }
        }
        Ok(())
    }
}
