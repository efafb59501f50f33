// ABOUTME: Spreadsheet persistence for poold: the Google Sheets RecordStore adapter.
// ABOUTME: Handles service-account authentication and the values API calls.

pub mod auth;
pub mod sheets;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use sheets::SheetsStore;
