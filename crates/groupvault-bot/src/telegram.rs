//! Telegram adapter: message conversion and file downloads.
//!
//! Converts teloxide wire messages into the provider-agnostic
//! [`InboundMessage`] the dispatcher consumes, and implements the
//! [`FileFetcher`] seam over the Bot API's getFile + download.

use std::path::PathBuf;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatKind as TgChatKind, FileId, Message, UserId};
use tracing::debug;

use groupvault_core::{Attachment, ChatKind, ContentKind, Identity, InboundMessage, Sender};
use groupvault_providers::storage::BoxFuture;

use crate::dispatch::FileFetcher;
use crate::error::{BotError, BotResult};

/// Converts a Telegram message into the dispatcher's message model.
pub fn to_inbound(msg: &Message) -> InboundMessage {
    let chat_kind = match msg.chat.kind {
        TgChatKind::Private(_) => ChatKind::Private,
        _ => ChatKind::Group,
    };

    InboundMessage {
        chat: Identity(msg.chat.id.0),
        chat_title: msg.chat.title().map(String::from),
        chat_kind,
        message_id: i64::from(msg.id.0),
        sender: msg.from.as_ref().map(|user| Sender {
            id: Identity(user.id.0 as i64),
            display_name: user.full_name(),
        }),
        text: msg.text().map(String::from),
        caption: msg.caption().map(String::from),
        reply_to: msg
            .reply_to_message()
            .map(|reply| Box::new(to_inbound(reply))),
        attachment: extract_attachment(msg),
    }
}

/// Extracts at most one attachment, in the fixed classification order.
fn extract_attachment(msg: &Message) -> Option<Attachment> {
    if let Some(photos) = msg.photo() {
        // Telegram provides multiple sizes; the last one is the largest.
        let largest = photos.last()?;
        return Some(Attachment {
            kind: ContentKind::Photo,
            file_id: largest.file.id.to_string(),
            unique_id: largest.file.unique_id.to_string(),
            file_name: None,
            mime_type: Some("image/jpeg".to_string()),
        });
    }

    if let Some(video) = msg.video() {
        return Some(Attachment {
            kind: ContentKind::Video,
            file_id: video.file.id.to_string(),
            unique_id: video.file.unique_id.to_string(),
            file_name: video.file_name.clone(),
            mime_type: video.mime_type.as_ref().map(|m| m.to_string()),
        });
    }

    if let Some(document) = msg.document() {
        return Some(Attachment {
            kind: ContentKind::Document,
            file_id: document.file.id.to_string(),
            unique_id: document.file.unique_id.to_string(),
            file_name: document.file_name.clone(),
            mime_type: document.mime_type.as_ref().map(|m| m.to_string()),
        });
    }

    if let Some(audio) = msg.audio() {
        return Some(Attachment {
            kind: ContentKind::Audio,
            file_id: audio.file.id.to_string(),
            unique_id: audio.file.unique_id.to_string(),
            file_name: audio.file_name.clone(),
            mime_type: audio.mime_type.as_ref().map(|m| m.to_string()),
        });
    }

    if let Some(voice) = msg.voice() {
        return Some(Attachment {
            kind: ContentKind::Voice,
            file_id: voice.file.id.to_string(),
            unique_id: voice.file.unique_id.to_string(),
            file_name: None,
            mime_type: voice.mime_type.as_ref().map(|m| m.to_string()),
        });
    }

    if let Some(sticker) = msg.sticker() {
        // Raster stickers are webp; animated ones are Lottie .tgs and
        // video ones .webm, so those carry an explicit file name.
        let (file_name, mime_type) = if sticker.is_animated() {
            (
                Some(format!("sticker_{}.tgs", sticker.file.unique_id)),
                Some("application/x-tgsticker".to_string()),
            )
        } else if sticker.is_video() {
            (
                Some(format!("sticker_{}.webm", sticker.file.unique_id)),
                Some("video/webm".to_string()),
            )
        } else {
            (None, Some("image/webp".to_string()))
        };
        return Some(Attachment {
            kind: ContentKind::Sticker,
            file_id: sticker.file.id.to_string(),
            unique_id: sticker.file.unique_id.to_string(),
            file_name,
            mime_type,
        });
    }

    None
}

/// Checks whether the user is an administrator or owner of the chat.
pub async fn is_admin(bot: &Bot, chat: Identity, user: Identity) -> BotResult<bool> {
    let member = bot
        .get_chat_member(ChatId(chat.0), UserId(user.0 as u64))
        .await
        .map_err(|e| BotError::chat(format!("failed to look up chat member: {}", e)))?;
    Ok(member.is_privileged())
}

/// [`FileFetcher`] over the Bot API.
#[derive(Debug, Clone)]
pub struct TelegramFiles {
    bot: Bot,
}

impl TelegramFiles {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

impl FileFetcher for TelegramFiles {
    fn fetch_to(&self, file_id: String, dest: PathBuf) -> BoxFuture<'_, BotResult<()>> {
        Box::pin(async move {
            let file = self
                .bot
                .get_file(FileId(file_id))
                .await
                .map_err(|e| BotError::chat(format!("failed to get file info: {}", e)))?;

            let mut out = tokio::fs::File::create(&dest).await?;
            self.bot
                .download_file(&file.path, &mut out)
                .await
                .map_err(|e| BotError::chat(format!("failed to download file: {}", e)))?;

            debug!(path = %dest.display(), "downloaded file from Telegram");
            Ok(())
        })
    }
}
