//! Google Sheets API client.
//!
//! Writes the ledger header and appends archive rows. The spreadsheet
//! file itself is created through the Drive API so it lands in the
//! right folder; this client only touches cell values by id.

use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

use super::drive::{map_api_error, map_transport_error};

/// Google Sheets API client.
#[derive(Debug)]
pub struct SheetsClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl SheetsClient {
    /// Creates a new Sheets client with the given access token.
    pub fn new(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            access_token: access_token.into(),
            base_url: base_url.into(),
        }
    }

    /// Writes the header row into the first row of the sheet.
    ///
    /// Called exactly once, right after the spreadsheet file is
    /// created.
    pub async fn write_header(&self, spreadsheet: &str, header: &[String]) -> ProviderResult<()> {
        let range = format!("A1:{}1", column_letter(header.len()));
        let url = format!(
            "{}/spreadsheets/{}/values/{}",
            self.base_url,
            urlencoding::encode(spreadsheet),
            range
        );

        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [header] }))
            .send()
            .await
            .map_err(map_transport_error)?;

        check_status(response).await?;
        debug!(spreadsheet, "wrote ledger header");
        Ok(())
    }

    /// Appends one row after the last populated row of the sheet.
    pub async fn append_row(&self, spreadsheet: &str, row: &[String]) -> ProviderResult<()> {
        let range = format!("A:{}", column_letter(row.len()));
        let url = format!(
            "{}/spreadsheets/{}/values/{}:append",
            self.base_url,
            urlencoding::encode(spreadsheet),
            range
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .map_err(map_transport_error)?;

        check_status(response).await?;
        debug!(spreadsheet, "appended ledger row");
        Ok(())
    }
}

/// Converts a 1-based column count to its A1-notation letter.
///
/// The ledger is six columns wide, so single letters cover every range
/// this client builds.
fn column_letter(columns: usize) -> char {
    let index = columns.clamp(1, 26) - 1;
    (b'A' + index as u8) as char
}

async fn check_status(response: reqwest::Response) -> ProviderResult<()> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(map_api_error(status, &body));
    }
    // The values-update response body is not used.
    response
        .bytes()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;
    Ok(())
}
