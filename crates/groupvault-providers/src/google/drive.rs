//! Google Drive API client.
//!
//! Low-level HTTP client for the Drive v3 API: name lookups, folder and
//! spreadsheet-file creation, and resumable media uploads.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

/// MIME type Drive assigns to folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// MIME type Drive assigns to native spreadsheets.
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Google Drive API client.
#[derive(Debug)]
pub struct DriveClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
    upload_base_url: String,
}

impl DriveClient {
    /// Creates a new Drive client with the given access token.
    pub fn new(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
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
            upload_base_url: upload_base_url.into(),
        }
    }

    /// Looks up a direct, non-trashed child of `parent` by exact name
    /// and MIME type. Returns the first match's id.
    ///
    /// Drive allows duplicate names, so this is a query rather than a
    /// keyed get; callers pair it with a create call to approximate
    /// get-or-create.
    pub async fn find_child(
        &self,
        parent: Option<&str>,
        name: &str,
        mime_type: &str,
    ) -> ProviderResult<Option<String>> {
        let parent_clause = match parent {
            Some(id) => format!("'{}' in parents", escape_query_value(id)),
            None => "'root' in parents".to_string(),
        };
        let query = format!(
            "name = '{}' and mimeType = '{}' and {} and trashed = false",
            escape_query_value(name),
            mime_type,
            parent_clause
        );

        let url = format!("{}/files", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id, name)"),
                ("pageSize", "1"),
                ("spaces", "drive"),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;

        let list: FileListResponse = read_json(response).await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    /// Creates a folder under `parent` (the Drive root when `None`).
    pub async fn create_folder(
        &self,
        parent: Option<&str>,
        name: &str,
    ) -> ProviderResult<String> {
        let id = self.create_node(parent, name, FOLDER_MIME).await?;
        debug!(name, id, "created Drive folder");
        Ok(id)
    }

    /// Creates an empty native spreadsheet file under `parent`.
    ///
    /// The sheet is created through the Drive files endpoint so it
    /// lands in the right folder in one call; the Sheets API then
    /// writes into it by id.
    pub async fn create_spreadsheet(&self, parent: &str, title: &str) -> ProviderResult<String> {
        let id = self.create_node(Some(parent), title, SPREADSHEET_MIME).await?;
        debug!(title, id, "created Drive spreadsheet");
        Ok(id)
    }

    async fn create_node(
        &self,
        parent: Option<&str>,
        name: &str,
        mime_type: &str,
    ) -> ProviderResult<String> {
        let mut metadata = json!({
            "name": name,
            "mimeType": mime_type,
        });
        if let Some(parent) = parent {
            metadata["parents"] = json!([parent]);
        }

        let url = format!("{}/files", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(map_transport_error)?;

        let file: DriveFile = read_json(response).await?;
        Ok(file.id)
    }

    /// Uploads a local file into `folder` via a resumable session.
    ///
    /// Two steps: an initiation request carrying the file metadata,
    /// then a PUT of the bytes to the session URI Drive hands back.
    pub async fn upload_file(
        &self,
        folder: &str,
        name: &str,
        mime_type: Option<&str>,
        local_path: &Path,
    ) -> ProviderResult<String> {
        let bytes = tokio::fs::read(local_path).await.map_err(|e| {
            ProviderError::internal(format!(
                "failed to read upload source {}: {}",
                local_path.display(),
                e
            ))
        })?;

        let mut metadata = json!({
            "name": name,
            "parents": [folder],
        });
        if let Some(mime) = mime_type {
            metadata["mimeType"] = json!(mime);
        }

        let url = format!("{}/files", self.upload_base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("uploadType", "resumable"), ("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_api_error(status, &body));
        }

        let session_uri = response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::invalid_response("upload session response missing Location header")
            })?;

        let size = bytes.len();
        let response = self
            .http_client
            .put(&session_uri)
            .header("Content-Length", size.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(map_transport_error)?;

        let file: DriveFile = read_json(response).await?;
        debug!(name, id = file.id, size, "uploaded file to Drive");
        Ok(file.id)
    }
}

/// Escapes a value for interpolation into a Drive `q` expression.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Maps a reqwest transport failure to a provider error.
pub(crate) fn map_transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::network("request timeout")
    } else if e.is_connect() {
        ProviderError::network(format!("connection failed: {}", e))
    } else {
        ProviderError::network(format!("request failed: {}", e))
    }
}

/// Maps a non-success Google API status to a provider error.
///
/// 403 is ambiguous on Drive: quota exhaustion and missing permission
/// share the status, so the body is inspected to tell them apart.
pub(crate) fn map_api_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            ProviderError::authentication("access token expired or invalid")
        }
        reqwest::StatusCode::FORBIDDEN => {
            if body.contains("Quota") || body.contains("quota") {
                ProviderError::quota_exceeded(format!("quota exhausted: {}", body))
            } else {
                ProviderError::permission_denied(format!("access denied: {}", body))
            }
        }
        reqwest::StatusCode::NOT_FOUND => {
            ProviderError::not_found(format!("resource not found: {}", body))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            ProviderError::rate_limited("rate limit exceeded")
        }
        s if s.is_server_error() => ProviderError::server(format!("API error ({}): {}", s, body)),
        s => ProviderError::bad_request(format!("API error ({}): {}", s, body)),
    }
}

/// Checks the status and parses a JSON body.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> ProviderResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(map_api_error(status, &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

/// Response from the files.list endpoint.
#[derive(Debug, Deserialize)]
struct FileListResponse {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// A file resource from the Drive API.
#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}
