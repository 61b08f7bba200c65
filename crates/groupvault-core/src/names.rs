//! Drive-safe naming and ledger formatting helpers.

use chrono::{DateTime, Utc};

use crate::identity::Identity;

/// Characters Google Drive rejects or mangles in file and folder names.
const ILLEGAL: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Header row written once into a freshly created ledger spreadsheet.
pub const LEDGER_HEADER: [&str; 6] = [
    "Timestamp",
    "Group",
    "Sender",
    "Sender ID",
    "Message ID",
    "Text",
];

/// Cleans a file or folder name for the storage provider.
///
/// Strips characters illegal in Drive names and trims surrounding
/// whitespace. Never produces an empty name: falls back to `default`.
/// Already-clean names pass through unchanged.
pub fn sanitize_name(name: &str, default: &str) -> String {
    let cleaned: String = name.chars().filter(|c| !ILLEGAL.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        default.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Builds the root folder name for a group.
///
/// The id suffix keeps names unique even if two groups share a title,
/// and keeps existing structure reachable after a chat rename.
pub fn root_folder_name(app_name: &str, title: &str, group: Identity) -> String {
    let title = sanitize_name(title, &group.key());
    format!("{} - {} ({})", app_name, title, group)
}

/// Builds the ledger spreadsheet title for a group.
pub fn sheet_title(title: &str, group: Identity) -> String {
    let title = sanitize_name(title, &group.key());
    format!("Text Archive - {} ({})", title, group)
}

/// Formats a timestamp for a ledger row: UTC, ISO-8601, second precision.
pub fn ledger_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}
