//! Persisted group/user state.
//!
//! One JSON document holds every user record, group record and pending
//! action. It is read fully at startup and rewritten wholly on every
//! mutation; at the bot's scale (tens of groups) this is simpler and
//! safer than incremental updates. Missing or legacy fields are covered
//! by serde defaulting, so older documents load cleanly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use groupvault_core::{GroupRecord, Identity, PendingAction, UserRecord};

use crate::error::{BotError, BotResult};

/// Current schema version of the state document.
pub const STATE_VERSION: u32 = 1;

fn current_version() -> u32 {
    STATE_VERSION
}

/// The on-disk state document.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateDoc {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub users: BTreeMap<Identity, UserRecord>,
    #[serde(default)]
    pub groups: BTreeMap<Identity, GroupRecord>,
    #[serde(default)]
    pub pending: BTreeMap<Identity, PendingAction>,
}

impl Default for StateDoc {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            users: BTreeMap::new(),
            groups: BTreeMap::new(),
            pending: BTreeMap::new(),
        }
    }
}

/// File-backed state store.
///
/// Mutations happen through `*_mut` accessors followed by [`persist`].
/// The caller serializes access (the bot holds the store behind one
/// async mutex), so there is no internal locking.
///
/// [`persist`]: StateStore::persist
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    doc: StateDoc,
}

impl StateStore {
    /// Loads the state document, or starts empty.
    ///
    /// A missing file is the normal first run. A corrupt file is
    /// logged and replaced by the empty document on the next persist,
    /// matching the recover-by-reset behavior users expect from the
    /// bot after a bad shutdown.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "corrupt state document, starting empty");
                    StateDoc::default()
                }
            },
            Err(_) => StateDoc::default(),
        };
        Self { path, doc }
    }

    /// Returns the user record, if one exists.
    pub fn user(&self, id: Identity) -> Option<&UserRecord> {
        self.doc.users.get(&id)
    }

    /// Returns the user record, creating a default on first contact.
    pub fn user_mut(&mut self, id: Identity) -> &mut UserRecord {
        self.doc.users.entry(id).or_default()
    }

    /// Returns the group record, if one exists.
    pub fn group(&self, id: Identity) -> Option<&GroupRecord> {
        self.doc.groups.get(&id)
    }

    /// Returns the group record, creating a default on first contact.
    pub fn group_mut(&mut self, id: Identity) -> &mut GroupRecord {
        self.doc.groups.entry(id).or_default()
    }

    /// Returns the pending action for a user, if any.
    pub fn pending(&self, user: Identity) -> Option<&PendingAction> {
        self.doc.pending.get(&user)
    }

    /// Records a pending action, superseding any previous one.
    pub fn set_pending(&mut self, user: Identity, action: PendingAction) {
        self.doc.pending.insert(user, action);
    }

    /// Removes and returns the pending action for a user.
    pub fn take_pending(&mut self, user: Identity) -> Option<PendingAction> {
        self.doc.pending.remove(&user)
    }

    /// Atomically rewrites the state document.
    pub fn persist(&self) -> BotResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.doc)
            .map_err(|e| BotError::state(format!("failed to serialize state: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &self.path)?;
        debug!(path = %self.path.display(), "persisted state document");
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupvault_core::{ArchiveMode, ContentKind};

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json"));
        assert!(store.user(Identity(1)).is_none());
        assert!(store.group(Identity(-100)).is_none());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();

        let store = StateStore::load(&path);
        assert!(store.user(Identity(1)).is_none());
    }

    #[test]
    fn mutations_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut store = StateStore::load(&path);
        store.user_mut(Identity(7)).lang = "de".to_string();
        let group = store.group_mut(Identity(-100));
        group.linked_user = Some(Identity(7));
        group.mode = ArchiveMode::Auto;
        group
            .folders
            .insert(ContentKind::Photo, "photos-id".to_string());
        store.set_pending(Identity(7), PendingAction::new(Identity(-100)));
        store.persist().unwrap();

        let reloaded = StateStore::load(&path);
        assert_eq!(reloaded.user(Identity(7)).unwrap().lang, "de");
        let group = reloaded.group(Identity(-100)).unwrap();
        assert_eq!(group.linked_user, Some(Identity(7)));
        assert_eq!(group.mode, ArchiveMode::Auto);
        assert_eq!(
            group.folders.get(&ContentKind::Photo).map(String::as_str),
            Some("photos-id")
        );
        assert_eq!(
            reloaded.pending(Identity(7)).unwrap().chat,
            Identity(-100)
        );
    }

    #[test]
    fn legacy_document_fields_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(
            &path,
            r#"{ "users": { "7": {} }, "groups": { "-100": { "linked_user": 7 } } }"#,
        )
        .unwrap();

        let store = StateStore::load(&path);
        assert_eq!(store.user(Identity(7)).unwrap().lang, "en");
        let group = store.group(Identity(-100)).unwrap();
        assert!(group.enabled);
        assert_eq!(group.mode, ArchiveMode::Reply);
        assert_eq!(group.linked_user, Some(Identity(7)));
        assert!(!group.is_provisioned());
    }

    #[test]
    fn pending_is_taken_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = StateStore::load(dir.path().join("state.json"));
        store.set_pending(Identity(1), PendingAction::new(Identity(-5)));

        assert!(store.take_pending(Identity(1)).is_some());
        assert!(store.take_pending(Identity(1)).is_none());
    }
}
