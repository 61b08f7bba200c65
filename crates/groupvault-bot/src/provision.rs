//! Idempotent Drive structure provisioning.
//!
//! Establishes a group's archive layout: one root folder, seven kind
//! folders inside it, and the ledger spreadsheet. Runs at link time and
//! lazily before every archive; calling it against an already-complete
//! structure touches nothing.

use tracing::info;

use groupvault_core::{ContentKind, GroupRecord, Identity, LEDGER_HEADER};
use groupvault_core::{root_folder_name, sheet_title};
use groupvault_providers::storage::{NodeKind, StorageProvider};
use groupvault_providers::ProviderResult;

/// Ensures the group's full Drive structure exists, filling missing
/// refs into `record` as they resolve.
///
/// For each node: the record's stored ref wins, then a lookup by name
/// at the provider, and only a miss creates. Drive has no atomic
/// get-or-create, so racing callers may both look up before either
/// creates; the query-then-create discipline keeps that window small
/// and a later call adopts whichever node the lookup returns.
///
/// Refs are written into `record` one by one, so a partial failure
/// keeps everything established so far and the next call resumes
/// instead of starting over. Callers persist the record afterwards,
/// on error paths too.
pub async fn ensure(
    provider: &dyn StorageProvider,
    app_name: &str,
    group: Identity,
    title: &str,
    record: &mut GroupRecord,
) -> ProviderResult<()> {
    let root = match &record.root_folder {
        Some(id) => id.clone(),
        None => {
            let name = root_folder_name(app_name, title, group);
            let id = match provider
                .find_child(None, name.clone(), NodeKind::Folder)
                .await?
            {
                Some(id) => id,
                None => provider.create_folder(None, name).await?,
            };
            record.root_folder = Some(id.clone());
            id
        }
    };

    // Fixed order keeps racing provisioners aligned node by node.
    for kind in ContentKind::ALL {
        if record.folder_for(kind).is_some() {
            continue;
        }
        let name = kind.folder_name().to_string();
        let id = match provider
            .find_child(Some(root.clone()), name.clone(), NodeKind::Folder)
            .await?
        {
            Some(id) => id,
            None => provider.create_folder(Some(root.clone()), name).await?,
        };
        record.folders.insert(kind, id);
    }

    if record.sheet.is_none() {
        let title = sheet_title(title, group);
        let id = match provider
            .find_child(Some(root.clone()), title.clone(), NodeKind::Spreadsheet)
            .await?
        {
            Some(id) => id,
            None => {
                let header = LEDGER_HEADER.iter().map(|s| s.to_string()).collect();
                provider.create_spreadsheet(root.clone(), title, header).await?
            }
        };
        record.sheet = Some(id);
        info!(%group, "archive structure provisioned");
    }

    Ok(())
}
