// ABOUTME: Defines AccountRecord, AccountStatus, and HolderId domain types.
// ABOUTME: Mirrors the fixed five-column layout of the backing spreadsheet.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 1-based row of the header line in the backing sheet. Data rows start
/// directly below it.
pub const HEADER_ROW: u32 = 1;

/// 1-based column positions, fixed by the sheet layout.
pub const COL_NAME: u32 = 1;
pub const COL_ID: u32 = 2;
pub const COL_PASSWORD: u32 = 3;
pub const COL_RANK: u32 = 4;
pub const COL_STATUS: u32 = 5;

/// Availability of an account. Stored in the sheet's status column as the
/// string literals "available" and "borrowed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Available,
    Borrowed,
}

impl AccountStatus {
    /// The exact string written to the status cell.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Available => "available",
            AccountStatus::Borrowed => "borrowed",
        }
    }

    /// Parse a status cell value. Returns None for anything but the two
    /// recognized literals.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(AccountStatus::Available),
            "borrowed" => Some(AccountStatus::Borrowed),
            _ => None,
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a chat platform user, as given by the platform's numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId(pub u64);

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One account row as read from the store. `row` is the 1-based sheet row
/// the record was found at; it is assigned by the store when reading and is
/// re-resolved before any targeted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub name: String,
    pub account_id: String,
    pub password: String,
    pub rank: String,
    pub status: AccountStatus,
    pub row: u32,
}

impl AccountRecord {
    pub fn is_available(&self) -> bool {
        self.status == AccountStatus::Available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_cell_literals() {
        assert_eq!(AccountStatus::parse("available"), Some(AccountStatus::Available));
        assert_eq!(AccountStatus::parse("borrowed"), Some(AccountStatus::Borrowed));
        assert_eq!(AccountStatus::Available.as_str(), "available");
        assert_eq!(AccountStatus::Borrowed.as_str(), "borrowed");
    }

    #[test]
    fn status_rejects_unknown_literals() {
        assert_eq!(AccountStatus::parse("AVAILABLE"), None);
        assert_eq!(AccountStatus::parse("free"), None);
        assert_eq!(AccountStatus::parse(""), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&AccountStatus::Borrowed).unwrap();
        assert_eq!(json, "\"borrowed\"");
    }

    #[test]
    fn record_availability_follows_status() {
        let mut record = AccountRecord {
            name: "Acct1".to_string(),
            account_id: "id1".to_string(),
            password: "pw1".to_string(),
            rank: "Beginner".to_string(),
            status: AccountStatus::Available,
            row: 2,
        };
        assert!(record.is_available());

        record.status = AccountStatus::Borrowed;
        assert!(!record.is_available());
    }

    #[test]
    fn holder_id_displays_raw_number() {
        assert_eq!(HolderId(42).to_string(), "42");
    }
}
