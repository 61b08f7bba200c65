//! Storage and identity provider layer.
//!
//! This crate provides the abstraction the archival core operates
//! against, plus its Google implementation:
//!
//! - [`StorageProvider`] - The storage operations the provisioner and
//!   dispatcher depend on (name lookup, folder and spreadsheet
//!   creation, row append, file upload)
//! - [`google`] - Device-flow OAuth, per-identity credential blobs,
//!   and the Drive/Sheets-backed provider
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Google Drive v3  │◄── folders, files, resumable uploads
//! │ Google Sheets v4 │◄── ledger header and row appends
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │  GoogleStorage   │◄────│ CredentialStore  │ refresh-on-resolve
//! └────────┬─────────┘     └────────┬─────────┘
//!          │                        │
//!          │ StorageProvider        │ DeviceFlowClient
//!          ▼                        ▼
//!   provisioner / dispatcher   /link device flow
//! ```

pub mod error;
pub mod google;
pub mod storage;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use storage::{BoxFuture, NodeKind, StorageProvider};
