//! Core types for the groupvault archival bridge.
//!
//! This crate holds the domain model shared by the Google providers and
//! the bot daemon:
//!
//! - [`Identity`] - opaque chat user/group identifier
//! - [`InboundMessage`] - provider-agnostic chat message with content
//!   classification
//! - [`GroupRecord`] / [`UserRecord`] / [`PendingAction`] - persisted
//!   state records
//! - [`sanitize_name`] - Drive-safe name cleaning
//!
//! No I/O happens here; everything is plain data and pure functions.

pub mod identity;
pub mod message;
pub mod names;
pub mod record;

pub use identity::Identity;
pub use message::{Attachment, ChatKind, ContentKind, InboundMessage, MessageContent, Sender};
pub use names::{
    LEDGER_HEADER, ledger_timestamp, root_folder_name, sanitize_name, sheet_title,
};
pub use record::{
    ArchiveMode, AutoSettings, AwaitedInput, GroupRecord, PendingAction, UserRecord,
};
