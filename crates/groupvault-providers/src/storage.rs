//! StorageProvider trait definition.
//!
//! This module defines the [`StorageProvider`] trait, the abstraction
//! the provisioner and dispatcher operate against. The production
//! implementation talks to Google Drive and Sheets; tests substitute
//! an in-memory fake with a stateful backing store.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the provisioner can
/// hold a `&dyn StorageProvider`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The type of node a name lookup should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Folder,
    Spreadsheet,
}

/// The storage-side operations the archival core depends on.
///
/// # Implementation Notes
///
/// - `find_child` then a create call is the idempotence discipline:
///   the provider offers no atomic get-or-create, so repeated or
///   racing callers must look up by name before creating.
/// - `create_spreadsheet` writes the header row exactly once, at
///   creation time.
/// - All methods take owned arguments so implementations can move
///   them into request futures.
pub trait StorageProvider: Send + Sync {
    /// Looks up a direct child of `parent` (the account root when
    /// `None`) by name and node kind. Returns its id when present.
    fn find_child(
        &self,
        parent: Option<String>,
        name: String,
        kind: NodeKind,
    ) -> BoxFuture<'_, ProviderResult<Option<String>>>;

    /// Creates a folder under `parent` and returns its id.
    fn create_folder(
        &self,
        parent: Option<String>,
        name: String,
    ) -> BoxFuture<'_, ProviderResult<String>>;

    /// Creates a spreadsheet under `parent` with the given header row
    /// and returns its id.
    fn create_spreadsheet(
        &self,
        parent: String,
        title: String,
        header: Vec<String>,
    ) -> BoxFuture<'_, ProviderResult<String>>;

    /// Appends one row to the spreadsheet's value range.
    fn append_row(
        &self,
        spreadsheet: String,
        row: Vec<String>,
    ) -> BoxFuture<'_, ProviderResult<()>>;

    /// Uploads a local file into `folder`, tagged with the best-known
    /// MIME type, and returns the created file id.
    fn upload_file(
        &self,
        folder: String,
        name: String,
        mime_type: Option<String>,
        local_path: PathBuf,
    ) -> BoxFuture<'_, ProviderResult<String>>;
}
