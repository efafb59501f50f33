// ABOUTME: Google Sheets adapter implementing the RecordStore trait.
// ABOUTME: Translates account records to/from rows via the spreadsheets values API.

use async_trait::async_trait;
use serde_json::{Value, json};

use poold_core::record::{AccountRecord, AccountStatus, COL_STATUS, HEADER_ROW};
use poold_core::store::{NewAccount, RecordStore, StoreError};

use crate::auth::{ServiceAccountKey, TokenProvider};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

/// RecordStore backed by one worksheet tab of a Google spreadsheet.
///
/// Every operation is a single, unbuffered values API call: no batching,
/// no retries. Transport failures surface to the invoking handler.
pub struct SheetsStore {
    client: reqwest::Client,
    tokens: TokenProvider,
    base_url: String,
    sheet_id: String,
    tab: String,
}

impl SheetsStore {
    pub fn new(key: ServiceAccountKey, sheet_id: String, tab: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens: TokenProvider::new(key),
            base_url: DEFAULT_BASE_URL.to_string(),
            sheet_id,
            tab,
        }
    }

    /// Point the adapter at a different API host. Used in tests.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// A1 range covering all data rows, starting directly below the header.
    fn data_range(&self) -> String {
        format!("{}!A{}:E", self.tab, HEADER_ROW + 1)
    }

    /// A1 range addressing one cell by 1-based row and column.
    fn cell_range(&self, row: u32, column: u32) -> String {
        format!("{}!{}{}", self.tab, column_letter(column), row)
    }

    fn values_url(&self, range: &str, suffix: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}{}",
            self.base_url, self.sheet_id, range, suffix
        )
    }

    /// Parse the values API's array-of-row-arrays into records. Rows that
    /// are too short or carry an unknown status literal are skipped with a
    /// warning rather than failing the whole listing.
    fn parse_rows(values: &[Value]) -> Vec<AccountRecord> {
        let mut records = Vec::new();

        for (i, row_value) in values.iter().enumerate() {
            let row_number = HEADER_ROW + 1 + i as u32;
            let Some(cells) = row_value.as_array() else {
                tracing::warn!(row = row_number, "skipping non-array row in sheet response");
                continue;
            };

            let cell = |col: usize| cells.get(col).and_then(Value::as_str).unwrap_or("");

            let status_text = cell(4);
            let Some(status) = AccountStatus::parse(status_text) else {
                tracing::warn!(
                    row = row_number,
                    status = status_text,
                    "skipping row with unrecognized status"
                );
                continue;
            };

            records.push(AccountRecord {
                name: cell(0).to_string(),
                account_id: cell(1).to_string(),
                password: cell(2).to_string(),
                rank: cell(3).to_string(),
                status,
                row: row_number,
            });
        }

        records
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, StoreError> {
        let token = self.tokens.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("sheets request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(StoreError::Auth("sheets API rejected the token".to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Transport(format!(
                "sheets API error {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("bad sheets response: {e}")))
    }
}

/// 1-based column number to its A1 letter. The sheet only has five columns,
/// all within A-Z.
fn column_letter(column: u32) -> char {
    debug_assert!((1..=26).contains(&column));
    (b'A' + (column - 1) as u8) as char
}

#[async_trait]
impl RecordStore for SheetsStore {
    async fn append(&self, account: NewAccount) -> Result<(), StoreError> {
        let url = self.values_url(
            &self.data_range(),
            ":append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        );
        let body = json!({
            "values": [[
                account.name,
                account.account_id,
                account.password,
                account.rank,
                AccountStatus::Available.as_str(),
            ]]
        });

        self.send_json(self.client.post(&url).json(&body)).await?;
        tracing::debug!(sheet = %self.sheet_id, "appended account row");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AccountRecord>, StoreError> {
        let url = self.values_url(&self.data_range(), "");
        let response = self.send_json(self.client.get(&url)).await?;

        // An empty sheet omits the values key entirely.
        let values = response
            .get("values")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(Self::parse_rows(&values))
    }

    async fn set_status(&self, row: u32, status: AccountStatus) -> Result<(), StoreError> {
        self.set_field(row, COL_STATUS, status.as_str()).await
    }

    async fn set_field(&self, row: u32, column: u32, value: &str) -> Result<(), StoreError> {
        let url = self.values_url(&self.cell_range(row, column), "?valueInputOption=RAW");
        let body = json!({ "values": [[value]] });

        self.send_json(self.client.put(&url).json(&body)).await?;
        tracing::debug!(row, column, "updated sheet cell");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SheetsStore {
        SheetsStore::new(
            ServiceAccountKey {
                client_email: "bot@demo".to_string(),
                private_key: "unused".to_string(),
                token_uri: "https://oauth2.googleapis.com/token".to_string(),
            },
            "sheet123".to_string(),
            "Sheet1".to_string(),
        )
    }

    #[test]
    fn data_range_starts_below_header() {
        assert_eq!(test_store().data_range(), "Sheet1!A2:E");
    }

    #[test]
    fn cell_range_addresses_status_column() {
        assert_eq!(test_store().cell_range(7, COL_STATUS), "Sheet1!E7");
    }

    #[test]
    fn column_letters_cover_the_schema() {
        assert_eq!(column_letter(1), 'A');
        assert_eq!(column_letter(5), 'E');
    }

    #[test]
    fn values_url_includes_sheet_and_range() {
        let url = test_store().values_url("Sheet1!A2:E", "");
        assert_eq!(
            url,
            "https://sheets.googleapis.com/v4/spreadsheets/sheet123/values/Sheet1!A2:E"
        );
    }

    #[test]
    fn base_url_override_applies() {
        let store = test_store().with_base_url("http://127.0.0.1:9".to_string());
        assert!(store.values_url("r", "").starts_with("http://127.0.0.1:9/"));
    }

    #[test]
    fn parse_rows_numbers_records_from_header_offset() {
        let values = vec![
            json!(["Acct1", "id1", "pw1", "Beginner", "available"]),
            json!(["Acct2", "id2", "pw2", "Expert", "borrowed"]),
        ];

        let records = SheetsStore::parse_rows(&values);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row, 2);
        assert_eq!(records[0].status, AccountStatus::Available);
        assert_eq!(records[1].row, 3);
        assert_eq!(records[1].status, AccountStatus::Borrowed);
        assert_eq!(records[1].name, "Acct2");
    }

    #[test]
    fn parse_rows_skips_malformed_rows_without_renumbering() {
        let values = vec![
            json!(["Acct1", "id1", "pw1", "Beginner", "available"]),
            json!(["short"]),
            json!(["Acct3", "id3", "pw3", "Mid", "nonsense"]),
            json!(["Acct4", "id4", "pw4", "Pro", "available"]),
        ];

        let records = SheetsStore::parse_rows(&values);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Acct1");
        // Acct4 keeps the row number of its actual sheet position.
        assert_eq!(records[1].name, "Acct4");
        assert_eq!(records[1].row, 5);
    }

    #[test]
    fn parse_rows_handles_empty_sheet() {
        assert!(SheetsStore::parse_rows(&[]).is_empty());
    }
}
