//! Google-backed [`StorageProvider`] implementation.

use std::path::PathBuf;

use crate::error::ProviderResult;
use crate::storage::{BoxFuture, NodeKind, StorageProvider};

use super::config::GoogleConfig;
use super::drive::{DriveClient, FOLDER_MIME, SPREADSHEET_MIME};
use super::sheets::SheetsClient;
use super::tokens::CredentialHandle;

/// Google Drive + Sheets storage, scoped to one resolved credential.
///
/// Built fresh from a [`CredentialHandle`] for each operation, so the
/// access token inside is always the refresh-checked one.
#[derive(Debug)]
pub struct GoogleStorage {
    drive: DriveClient,
    sheets: SheetsClient,
}

impl GoogleStorage {
    /// Creates a storage instance for the handle's identity.
    pub fn new(config: &GoogleConfig, handle: &CredentialHandle) -> Self {
        Self {
            drive: DriveClient::new(
                &handle.access_token,
                &config.drive_base_url,
                &config.upload_base_url,
                config.timeout,
            ),
            sheets: SheetsClient::new(
                &handle.access_token,
                &config.sheets_base_url,
                config.timeout,
            ),
        }
    }
}

fn mime_for(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Folder => FOLDER_MIME,
        NodeKind::Spreadsheet => SPREADSHEET_MIME,
    }
}

impl StorageProvider for GoogleStorage {
    fn find_child(
        &self,
        parent: Option<String>,
        name: String,
        kind: NodeKind,
    ) -> BoxFuture<'_, ProviderResult<Option<String>>> {
        Box::pin(async move {
            self.drive
                .find_child(parent.as_deref(), &name, mime_for(kind))
                .await
        })
    }

    fn create_folder(
        &self,
        parent: Option<String>,
        name: String,
    ) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move { self.drive.create_folder(parent.as_deref(), &name).await })
    }

    fn create_spreadsheet(
        &self,
        parent: String,
        title: String,
        header: Vec<String>,
    ) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            let id = self.drive.create_spreadsheet(&parent, &title).await?;
            self.sheets.write_header(&id, &header).await?;
            Ok(id)
        })
    }

    fn append_row(
        &self,
        spreadsheet: String,
        row: Vec<String>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move { self.sheets.append_row(&spreadsheet, &row).await })
    }

    fn upload_file(
        &self,
        folder: String,
        name: String,
        mime_type: Option<String>,
        local_path: PathBuf,
    ) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            self.drive
                .upload_file(&folder, &name, mime_type.as_deref(), &local_path)
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::config::OAuthCredentials;
    use groupvault_core::{Identity, LEDGER_HEADER};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storage_for(server: &MockServer) -> GoogleStorage {
        let config = GoogleConfig::new(OAuthCredentials::new("id", "secret"))
            .with_base_url(&server.uri());
        let handle = CredentialHandle {
            identity: Identity(1),
            access_token: "token".to_string(),
        };
        GoogleStorage::new(&config, &handle)
    }

    #[tokio::test]
    async fn create_spreadsheet_writes_header_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/drive/v3/files"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "sheet-1" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v4/spreadsheets/sheet-1/values/A1:F1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let storage = storage_for(&server);
        let header: Vec<String> = LEDGER_HEADER.iter().map(|s| s.to_string()).collect();
        let id = storage
            .create_spreadsheet("root-1".to_string(), "Text Archive - G (1)".to_string(), header)
            .await
            .unwrap();
        assert_eq!(id, "sheet-1");
    }

    #[tokio::test]
    async fn find_child_maps_kind_to_mime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drive/v3/files"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })),
            )
            .mount(&server)
            .await;

        let storage = storage_for(&server);
        let found = storage
            .find_child(None, "Photos".to_string(), NodeKind::Spreadsheet)
            .await
            .unwrap();
        assert!(found.is_none());

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default();
        assert!(query.contains("spreadsheet"));
    }
}
