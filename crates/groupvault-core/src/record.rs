//! Persisted per-user and per-group state records.
//!
//! These replace the loosely-typed nested dictionaries of earlier
//! incarnations with tagged records: serde defaulting covers missing
//! and legacy fields, so old state documents load cleanly.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::message::ContentKind;

/// How a group triggers archiving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveMode {
    /// Archive the message a trigger command or keyword replies to.
    #[default]
    Reply,
    /// Archive every incoming message unattended.
    Auto,
}

/// Settings for passive-auto archiving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSettings {
    pub enabled: bool,
    /// Notification interval in hours, clamped to 1..=24 on input.
    pub notify_interval_hours: u8,
}

impl Default for AutoSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            notify_interval_hours: 6,
        }
    }
}

/// Per-user state: language preference and credential reference.
///
/// Created on first interaction, mutated on language change or
/// successful authorization, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub lang: String,
    /// Path of the persisted OAuth token blob, once authorized.
    pub creds_file: Option<PathBuf>,
}

impl Default for UserRecord {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            creds_file: None,
        }
    }
}

/// Per-group state: archiving switches and provisioned Drive refs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupRecord {
    /// Master switch for archiving in this group.
    pub enabled: bool,
    pub mode: ArchiveMode,
    /// Whose credentials authorize storage operations for this group.
    pub linked_user: Option<Identity>,
    /// Drive id of the provisioned root folder.
    pub root_folder: Option<String>,
    /// Drive ids of the provisioned kind folders.
    pub folders: BTreeMap<ContentKind, String>,
    /// Drive id of the ledger spreadsheet.
    pub sheet: Option<String>,
    /// Trigger keywords for reply mode; empty means command-only.
    pub keywords: Vec<String>,
    pub auto: AutoSettings,
}

impl Default for GroupRecord {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ArchiveMode::default(),
            linked_user: None,
            root_folder: None,
            folders: BTreeMap::new(),
            sheet: None,
            keywords: Vec::new(),
            auto: AutoSettings::default(),
        }
    }
}

impl GroupRecord {
    /// Returns true once the provisioner has established the full
    /// structure: every kind folder and the ledger, together.
    pub fn is_provisioned(&self) -> bool {
        self.root_folder.is_some()
            && self.sheet.is_some()
            && ContentKind::ALL
                .iter()
                .all(|kind| self.folders.get(kind).is_some_and(|id| !id.is_empty()))
    }

    /// The provisioned folder ref for a kind, if established.
    pub fn folder_for(&self, kind: ContentKind) -> Option<&str> {
        self.folders.get(&kind).map(String::as_str)
    }

    /// Clears the linked identity and every provisioned ref.
    ///
    /// The record itself survives; the Drive-side structure is left
    /// untouched so a re-link can find it again by name.
    pub fn unlink(&mut self) {
        self.linked_user = None;
        self.root_folder = None;
        self.folders.clear();
        self.sheet = None;
    }

    /// Returns true if unattended archiving is active: auto mode
    /// selected and the auto switch on.
    ///
    /// The two flip together through commands, but a legacy state
    /// document may carry them split; both must hold.
    pub fn auto_archives(&self) -> bool {
        self.mode == ArchiveMode::Auto && self.auto.enabled
    }

    /// Returns true if `text` exactly matches a configured keyword,
    /// case-insensitively.
    pub fn matches_keyword(&self, text: &str) -> bool {
        let text = text.trim().to_lowercase();
        self.keywords.iter().any(|k| k.to_lowercase() == text)
    }
}

/// The free-text input a pending action is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwaitedInput {
    /// A notify interval in hours (1-24).
    Interval,
    /// A comma-separated keyword list.
    Keywords,
}

/// Per-user transient record linking a private conversation to the
/// group being configured.
///
/// `awaiting` is set when a flow needs one more piece of free-text
/// input; it is consumed by the next private text message from that
/// user or superseded by a new pending action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub chat: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting: Option<AwaitedInput>,
}

impl PendingAction {
    pub fn new(chat: Identity) -> Self {
        Self {
            chat,
            awaiting: None,
        }
    }

    pub fn awaiting(chat: Identity, input: AwaitedInput) -> Self {
        Self {
            chat,
            awaiting: Some(input),
        }
    }
}
