//! Provider-agnostic chat message model and content classification.
//!
//! The Telegram adapter converts platform messages into
//! [`InboundMessage`] so that the dispatcher and its tests never touch
//! wire types. Classification is mutually exclusive by priority:
//! text or caption always wins over an attachment, and a message
//! carries at most one attachment kind.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// The closed set of media categories the dispatcher recognizes.
///
/// `Other` exists as a provisioned catch-all folder but is never
/// produced by classification; unrecognized platform content maps to
/// no content at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Photo,
    Video,
    Document,
    Audio,
    Voice,
    Sticker,
    Other,
}

impl ContentKind {
    /// All kinds in the fixed provisioning order.
    pub const ALL: [ContentKind; 7] = [
        ContentKind::Photo,
        ContentKind::Video,
        ContentKind::Document,
        ContentKind::Audio,
        ContentKind::Voice,
        ContentKind::Sticker,
        ContentKind::Other,
    ];

    /// The Drive folder name provisioned for this kind.
    pub fn folder_name(&self) -> &'static str {
        match self {
            ContentKind::Photo => "Photos",
            ContentKind::Video => "Videos",
            ContentKind::Document => "Documents",
            ContentKind::Audio => "Audio",
            ContentKind::Voice => "Voice",
            ContentKind::Sticker => "Stickers",
            ContentKind::Other => "Other",
        }
    }

    /// The canonical file extension for downloads of this kind, used
    /// when the platform reports no file name.
    pub fn default_extension(&self) -> &'static str {
        match self {
            ContentKind::Photo => "jpg",
            ContentKind::Video => "mp4",
            ContentKind::Document => "bin",
            ContentKind::Audio => "mp3",
            ContentKind::Voice => "ogg",
            ContentKind::Sticker => "webp",
            ContentKind::Other => "bin",
        }
    }

    /// Short lowercase tag used as a scratch-file name prefix.
    pub fn tag(&self) -> &'static str {
        match self {
            ContentKind::Photo => "photo",
            ContentKind::Video => "video",
            ContentKind::Document => "doc",
            ContentKind::Audio => "audio",
            ContentKind::Voice => "voice",
            ContentKind::Sticker => "sticker",
            ContentKind::Other => "other",
        }
    }
}

/// What kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    /// One-on-one conversation with the bot.
    Private,
    /// Group or supergroup.
    Group,
}

/// The author of a message, as far as the platform reports one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: Identity,
    pub display_name: String,
}

/// A single media attachment carried by a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Which media category this is.
    pub kind: ContentKind,
    /// Platform handle used to fetch the file contents.
    pub file_id: String,
    /// Provider-assigned id that is stable across forwards; used for
    /// collision-resistant scratch and upload names.
    pub unique_id: String,
    /// Original file name, when the platform reports one.
    pub file_name: Option<String>,
    /// Best-known MIME type, when the platform reports one.
    pub mime_type: Option<String>,
}

impl Attachment {
    /// The name the file is stored under, both locally and in Drive.
    ///
    /// Documents and audio keep their reported file name when present;
    /// everything else gets `<tag>_<unique_id>.<ext>`.
    pub fn storage_name(&self) -> String {
        match &self.file_name {
            Some(name) if !name.trim().is_empty() => {
                crate::names::sanitize_name(name, self.kind.tag())
            }
            _ => format!(
                "{}_{}.{}",
                self.kind.tag(),
                self.unique_id,
                self.kind.default_extension()
            ),
        }
    }
}

/// A chat message normalized from the platform wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// The chat the message arrived in.
    pub chat: Identity,
    /// Chat title, absent for private chats.
    pub chat_title: Option<String>,
    pub chat_kind: ChatKind,
    /// Platform message id, unique within the chat.
    pub message_id: i64,
    pub sender: Option<Sender>,
    pub text: Option<String>,
    /// Caption attached to a media message.
    pub caption: Option<String>,
    /// The message this one replies to, when present.
    pub reply_to: Option<Box<InboundMessage>>,
    /// At most one media attachment; the adapter picks the first
    /// populated platform field in a fixed order.
    pub attachment: Option<Attachment>,
}

/// The archivable content of a message, after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageContent<'a> {
    /// Text or caption destined for a ledger row.
    Text(&'a str),
    /// A media attachment destined for a kind folder.
    Media(&'a Attachment),
}

impl InboundMessage {
    /// Classifies the message into exactly one archivable content.
    ///
    /// Priority: non-empty text or caption first, then the attachment.
    /// `None` means the message carries nothing the archive recognizes.
    pub fn content(&self) -> Option<MessageContent<'_>> {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            return Some(MessageContent::Text(text));
        }
        if let Some(caption) = self.caption.as_deref().filter(|c| !c.is_empty()) {
            return Some(MessageContent::Text(caption));
        }
        self.attachment.as_ref().map(MessageContent::Media)
    }

    /// Returns true if the text looks like a bot command.
    pub fn is_command(&self) -> bool {
        self.text.as_deref().is_some_and(|t| t.starts_with('/'))
    }

    /// The chat title, falling back to the chat id for untitled chats.
    pub fn display_title(&self) -> String {
        match self.chat_title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self.chat.key(),
        }
    }

    /// The sender's display name, or the literal "Unknown" when the
    /// platform reports no sender.
    pub fn sender_name(&self) -> &str {
        self.sender
            .as_ref()
            .map(|s| s.display_name.as_str())
            .unwrap_or("Unknown")
    }

    /// The sender id as a string, empty when there is no sender.
    pub fn sender_id(&self) -> String {
        self.sender
            .as_ref()
            .map(|s| s.id.key())
            .unwrap_or_default()
    }
}
