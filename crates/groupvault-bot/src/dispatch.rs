//! Archive dispatch: classify a message and move its content to Drive.
//!
//! The dispatcher is the boundary where transfer errors stop
//! propagating: every failure is caught here, logged with context, and
//! reported as an [`ArchiveOutcome`] the command layer turns into a
//! reply (or swallows, in auto mode).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, warn};

use groupvault_core::{
    ArchiveMode, ContentKind, GroupRecord, Identity, InboundMessage, MessageContent,
    ledger_timestamp,
};
use groupvault_providers::storage::{BoxFuture, StorageProvider};

use crate::error::{BotError, BotResult};
use crate::provision;

/// Platform-side file download seam.
///
/// The production implementation resolves a Telegram file id and
/// streams the bytes to the destination path; tests substitute a stub.
pub trait FileFetcher: Send + Sync {
    fn fetch_to(&self, file_id: String, dest: PathBuf) -> BoxFuture<'_, BotResult<()>>;
}

/// What happened to one archive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// A text row was appended to the ledger.
    StoredText,
    /// A media file landed in its kind folder.
    StoredMedia(ContentKind),
    /// No identity is linked to the group.
    NotLinked,
    /// The linked credential was revoked; re-authorization needed.
    RelinkRequired,
    /// Archiving is switched off for the group.
    NotEnabled,
    /// Reply mode needs the command to be a reply to the message.
    ReplyRequired,
    /// Nothing archivable in the message.
    NoContent,
    /// The transfer failed; the string is safe to show the user.
    Failed(String),
}

/// Picks the message that will actually be archived.
///
/// Reply mode archives the replied-to message; auto mode archives the
/// message itself, except command text which is never content.
pub fn select_source<'m>(
    message: &'m InboundMessage,
    mode: ArchiveMode,
) -> Result<&'m InboundMessage, ArchiveOutcome> {
    match mode {
        ArchiveMode::Reply => message
            .reply_to
            .as_deref()
            .ok_or(ArchiveOutcome::ReplyRequired),
        ArchiveMode::Auto => {
            if message.is_command() {
                Err(ArchiveOutcome::NoContent)
            } else {
                Ok(message)
            }
        }
    }
}

/// Maps a credential-resolve failure to its archive outcome.
///
/// A revoked credential asks for re-authorization but never unlinks
/// the group; the stored binding survives until an explicit `/unlink`.
pub fn outcome_for_credentials(error: &groupvault_providers::ProviderError) -> ArchiveOutcome {
    use groupvault_providers::ProviderErrorCode;
    match error.code() {
        ProviderErrorCode::NotLinked => ArchiveOutcome::NotLinked,
        ProviderErrorCode::Revoked => ArchiveOutcome::RelinkRequired,
        _ => ArchiveOutcome::Failed(error.to_string()),
    }
}

/// One archive pass over a resolved credential.
pub struct Dispatcher<'a> {
    pub provider: &'a dyn StorageProvider,
    pub files: &'a dyn FileFetcher,
    pub scratch_dir: &'a Path,
    pub app_name: &'a str,
}

impl Dispatcher<'_> {
    /// Archives the source message into the group's structure.
    ///
    /// Never returns an error: transfer failures are logged and folded
    /// into [`ArchiveOutcome::Failed`]. The record may gain refs from
    /// inline provisioning even when the attempt fails; callers
    /// persist it either way.
    pub async fn archive(
        &self,
        source: &InboundMessage,
        group: Identity,
        record: &mut GroupRecord,
    ) -> ArchiveOutcome {
        match self.try_archive(source, group, record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%group, message_id = source.message_id, error = %e, "archive failed");
                ArchiveOutcome::Failed(e.to_string())
            }
        }
    }

    async fn try_archive(
        &self,
        source: &InboundMessage,
        group: Identity,
        record: &mut GroupRecord,
    ) -> BotResult<ArchiveOutcome> {
        let Some(content) = source.content() else {
            debug!(%group, message_id = source.message_id, "nothing archivable");
            return Ok(ArchiveOutcome::NoContent);
        };

        // Self-healing: a missing ref (fresh group, wiped state) gets
        // provisioned inline before the transfer.
        if !record.is_provisioned() {
            let title = source.display_title();
            provision::ensure(self.provider, self.app_name, group, &title, record).await?;
        }

        match content {
            MessageContent::Text(text) => {
                let sheet = record
                    .sheet
                    .clone()
                    .ok_or_else(|| BotError::state("provisioned group has no ledger ref"))?;
                let row = vec![
                    ledger_timestamp(Utc::now()),
                    source.display_title(),
                    source.sender_name().to_string(),
                    source.sender_id(),
                    source.message_id.to_string(),
                    text.to_string(),
                ];
                self.provider.append_row(sheet, row).await?;
                Ok(ArchiveOutcome::StoredText)
            }
            MessageContent::Media(attachment) => {
                let folder = record
                    .folder_for(attachment.kind)
                    .map(String::from)
                    .ok_or_else(|| {
                        BotError::state("provisioned group is missing a kind folder")
                    })?;
                let name = attachment.storage_name();

                let scratch = ScratchFile::create(self.scratch_dir, &name)?;
                self.files
                    .fetch_to(attachment.file_id.clone(), scratch.path().to_path_buf())
                    .await?;
                self.provider
                    .upload_file(
                        folder,
                        name,
                        attachment.mime_type.clone(),
                        scratch.path().to_path_buf(),
                    )
                    .await?;
                Ok(ArchiveOutcome::StoredMedia(attachment.kind))
            }
        }
    }
}

/// A scratch-file handle that removes the file when dropped.
///
/// Cleanup runs on success and failure alike; a removal error is
/// logged and swallowed so it can never mask the archive outcome.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn create(dir: &Path, name: &str) -> BotResult<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            path: dir.join(name),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeStorage;
    use groupvault_core::{Attachment, ChatKind, Sender};

    /// Writes fixed bytes to the destination, like a real download.
    struct StubFetcher;

    impl FileFetcher for StubFetcher {
        fn fetch_to(&self, _file_id: String, dest: PathBuf) -> BoxFuture<'_, BotResult<()>> {
            Box::pin(async move {
                fs::write(&dest, b"downloaded bytes")?;
                Ok(())
            })
        }
    }

    fn group_message(message_id: i64) -> InboundMessage {
        InboundMessage {
            chat: Identity(-100),
            chat_title: Some("My Group".to_string()),
            chat_kind: ChatKind::Group,
            message_id,
            sender: Some(Sender {
                id: Identity(7),
                display_name: "Alice".to_string(),
            }),
            text: None,
            caption: None,
            reply_to: None,
            attachment: None,
        }
    }

    fn text_message(message_id: i64, text: &str) -> InboundMessage {
        InboundMessage {
            text: Some(text.to_string()),
            ..group_message(message_id)
        }
    }

    fn photo_message(message_id: i64) -> InboundMessage {
        InboundMessage {
            attachment: Some(Attachment {
                kind: ContentKind::Photo,
                file_id: "remote-file".to_string(),
                unique_id: "uniq-1".to_string(),
                file_name: None,
                mime_type: Some("image/jpeg".to_string()),
            }),
            ..group_message(message_id)
        }
    }

    fn dispatcher<'a>(
        fake: &'a FakeStorage,
        fetcher: &'a StubFetcher,
        scratch: &'a Path,
    ) -> Dispatcher<'a> {
        Dispatcher {
            provider: fake,
            files: fetcher,
            scratch_dir: scratch,
            app_name: "GroupVault",
        }
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        match fs::read_dir(dir) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[test]
    fn reply_mode_requires_a_reply() {
        let msg = text_message(1, "/archive");
        assert_eq!(
            select_source(&msg, ArchiveMode::Reply).unwrap_err(),
            ArchiveOutcome::ReplyRequired
        );

        let with_reply = InboundMessage {
            reply_to: Some(Box::new(text_message(2, "remember this"))),
            ..text_message(1, "/archive")
        };
        let source = select_source(&with_reply, ArchiveMode::Reply).unwrap();
        assert_eq!(source.message_id, 2);
    }

    #[test]
    fn auto_mode_excludes_commands() {
        let command = text_message(1, "/mode");
        assert_eq!(
            select_source(&command, ArchiveMode::Auto).unwrap_err(),
            ArchiveOutcome::NoContent
        );

        let plain = text_message(2, "hello");
        assert_eq!(
            select_source(&plain, ArchiveMode::Auto).unwrap().message_id,
            2
        );
    }

    #[tokio::test]
    async fn text_archive_provisions_once_and_appends_once() {
        let fake = FakeStorage::new();
        let fetcher = StubFetcher;
        let scratch = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(&fake, &fetcher, scratch.path());
        let mut record = GroupRecord::default();

        let outcome = dispatcher
            .archive(&text_message(42, "hello world"), Identity(-100), &mut record)
            .await;

        assert_eq!(outcome, ArchiveOutcome::StoredText);
        assert_eq!(fake.create_count(), 9);
        assert_eq!(fake.append_count(), 1);
        assert!(record.is_provisioned());

        let rows = fake.rows(record.sheet.as_deref().unwrap());
        // Header plus the single archived row.
        assert_eq!(rows.len(), 2);
        let row = &rows[1];
        assert_eq!(row[1], "My Group");
        assert_eq!(row[2], "Alice");
        assert_eq!(row[3], "7");
        assert_eq!(row[4], "42");
        assert_eq!(row[5], "hello world");
    }

    #[tokio::test]
    async fn caption_beats_attachment_in_classification() {
        let fake = FakeStorage::new();
        let fetcher = StubFetcher;
        let scratch = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(&fake, &fetcher, scratch.path());
        let mut record = GroupRecord::default();

        let message = InboundMessage {
            caption: Some("holiday photo".to_string()),
            ..photo_message(3)
        };
        let outcome = dispatcher.archive(&message, Identity(-100), &mut record).await;

        assert_eq!(outcome, ArchiveOutcome::StoredText);
        assert_eq!(fake.append_count(), 1);
        assert_eq!(fake.upload_count(), 0);
    }

    #[tokio::test]
    async fn second_media_archive_reuses_structure() {
        let fake = FakeStorage::new();
        let fetcher = StubFetcher;
        let scratch = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(&fake, &fetcher, scratch.path());
        let mut record = GroupRecord::default();

        dispatcher
            .archive(&photo_message(1), Identity(-100), &mut record)
            .await;
        assert_eq!(fake.create_count(), 9);

        let outcome = dispatcher
            .archive(&photo_message(2), Identity(-100), &mut record)
            .await;

        assert_eq!(outcome, ArchiveOutcome::StoredMedia(ContentKind::Photo));
        assert_eq!(fake.create_count(), 9);
        assert_eq!(fake.upload_count(), 2);

        let photos = record.folder_for(ContentKind::Photo).unwrap();
        assert!(fake.upload_folders().iter().all(|f| *f == photos));
        assert!(scratch_is_empty(scratch.path()));
    }

    #[tokio::test]
    async fn scratch_is_cleaned_up_when_upload_fails() {
        let fake = FakeStorage::new();
        let fetcher = StubFetcher;
        let scratch = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(&fake, &fetcher, scratch.path());
        let mut record = GroupRecord::default();

        fake.fail_uploads();
        let outcome = dispatcher
            .archive(&photo_message(1), Identity(-100), &mut record)
            .await;

        assert!(matches!(outcome, ArchiveOutcome::Failed(_)));
        assert!(scratch_is_empty(scratch.path()));
    }

    #[test]
    fn revoked_credential_prompts_relink_without_unlinking() {
        use groupvault_providers::ProviderError;

        let mut record = GroupRecord::default();
        record.linked_user = Some(Identity(7));

        let outcome = outcome_for_credentials(&ProviderError::revoked("refresh rejected"));
        assert_eq!(outcome, ArchiveOutcome::RelinkRequired);
        // The binding is untouched; only /unlink clears it.
        assert_eq!(record.linked_user, Some(Identity(7)));

        assert_eq!(
            outcome_for_credentials(&ProviderError::not_linked("no credential blob")),
            ArchiveOutcome::NotLinked
        );
        assert!(matches!(
            outcome_for_credentials(&ProviderError::server("backend down")),
            ArchiveOutcome::Failed(_)
        ));
    }

    #[tokio::test]
    async fn empty_message_is_no_content() {
        let fake = FakeStorage::new();
        let fetcher = StubFetcher;
        let scratch = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(&fake, &fetcher, scratch.path());
        let mut record = GroupRecord::default();

        let outcome = dispatcher
            .archive(&group_message(5), Identity(-100), &mut record)
            .await;

        assert_eq!(outcome, ArchiveOutcome::NoContent);
        assert_eq!(fake.create_count(), 0);
    }
}
