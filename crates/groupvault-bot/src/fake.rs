//! In-memory storage fake for provisioner and dispatcher tests.
//!
//! Mimics Drive's semantics: nodes live under parents, lookups are by
//! name + kind, duplicate names are allowed (creates never merge), and
//! everything is observable through counters.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use groupvault_providers::error::{ProviderError, ProviderResult};
use groupvault_providers::storage::{BoxFuture, NodeKind, StorageProvider};

#[derive(Debug, Clone)]
pub struct FakeNode {
    pub id: String,
    pub parent: Option<String>,
    pub name: String,
    pub kind: NodeKind,
}

#[derive(Debug, Default)]
struct FakeState {
    nodes: Vec<FakeNode>,
    rows: HashMap<String, Vec<Vec<String>>>,
    uploads: Vec<(String, String)>,
    finds: usize,
    creates: usize,
    appends: usize,
    next_id: usize,
    fail_uploads: bool,
}

/// A stateful in-memory [`StorageProvider`].
#[derive(Debug, Default)]
pub struct FakeStorage {
    state: Mutex<FakeState>,
}

impl FakeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent upload fail with a server error.
    pub fn fail_uploads(&self) {
        self.state.lock().unwrap().fail_uploads = true;
    }

    pub fn create_count(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn append_count(&self) -> usize {
        self.state.lock().unwrap().appends
    }

    pub fn upload_count(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    /// Folder ids files were uploaded into, in order.
    pub fn upload_folders(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .uploads
            .iter()
            .map(|(folder, _)| folder.clone())
            .collect()
    }

    pub fn rows(&self, spreadsheet: &str) -> Vec<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .rows
            .get(spreadsheet)
            .cloned()
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> Vec<FakeNode> {
        self.state.lock().unwrap().nodes.clone()
    }

    fn insert_node(
        state: &mut FakeState,
        parent: Option<String>,
        name: String,
        kind: NodeKind,
    ) -> String {
        state.next_id += 1;
        state.creates += 1;
        let id = format!("node-{}", state.next_id);
        state.nodes.push(FakeNode {
            id: id.clone(),
            parent,
            name,
            kind,
        });
        id
    }
}

impl StorageProvider for FakeStorage {
    fn find_child(
        &self,
        parent: Option<String>,
        name: String,
        kind: NodeKind,
    ) -> BoxFuture<'_, ProviderResult<Option<String>>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.finds += 1;
            Ok(state
                .nodes
                .iter()
                .find(|n| n.parent == parent && n.name == name && n.kind == kind)
                .map(|n| n.id.clone()))
        })
    }

    fn create_folder(
        &self,
        parent: Option<String>,
        name: String,
    ) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            Ok(Self::insert_node(&mut state, parent, name, NodeKind::Folder))
        })
    }

    fn create_spreadsheet(
        &self,
        parent: String,
        title: String,
        header: Vec<String>,
    ) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let id = Self::insert_node(&mut state, Some(parent), title, NodeKind::Spreadsheet);
            state.rows.insert(id.clone(), vec![header]);
            Ok(id)
        })
    }

    fn append_row(
        &self,
        spreadsheet: String,
        row: Vec<String>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.appends += 1;
            state.rows.entry(spreadsheet).or_default().push(row);
            Ok(())
        })
    }

    fn upload_file(
        &self,
        folder: String,
        name: String,
        _mime_type: Option<String>,
        _local_path: PathBuf,
    ) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if state.fail_uploads {
                return Err(ProviderError::server("injected upload failure"));
            }
            state.next_id += 1;
            let id = format!("file-{}", state.next_id);
            state.uploads.push((folder, name));
            Ok(id)
        })
    }
}
