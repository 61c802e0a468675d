//! Telegram client using teloxide.

use std::path::Path;

use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, ParseMode};
use tracing::{info, warn};

use crate::bot::error::ChatError;
use crate::bot::message::{truncate_chars, Attachment, InboundMessage, MAX_MESSAGE_CHARS};
use crate::bot::ports::{AttachmentSource, ChatSink};

/// Telegram API client.
#[derive(Clone)]
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait::async_trait]
impl ChatSink for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
        let text = truncate_chars(text, MAX_MESSAGE_CHARS);
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send: {e}");
                warn!("{}", msg);
                ChatError::Request(msg)
            })
    }

    async fn send_audio(&self, chat_id: i64, audio: &Path) -> Result<(), ChatError> {
        info!("🔊 Sending audio to chat {} ({})", chat_id, audio.display());

        self.bot
            .send_audio(ChatId(chat_id), InputFile::file(audio.to_path_buf()))
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to send audio: {e}");
                warn!("{}", msg);
                ChatError::Request(msg)
            })
    }
}

#[async_trait::async_trait]
impl AttachmentSource for TelegramClient {
    async fn download(&self, attachment: &Attachment, dest: &Path) -> Result<(), ChatError> {
        let file = self
            .bot
            .get_file(FileId(attachment.file_id.clone()))
            .await
            .map_err(|e| ChatError::Download(format!("Failed to get file info: {e}")))?;

        let mut out = tokio::fs::File::create(dest).await?;
        self.bot
            .download_file(&file.path, &mut out)
            .await
            .map_err(|e| ChatError::Download(format!("Failed to download file: {e}")))?;

        info!("📥 Downloaded {} to {}", attachment.file_name, dest.display());
        Ok(())
    }
}

/// Build the platform-neutral view of a Telegram message.
///
/// Photos carry no file name, so they are presented as `photo_<id>.jpg`
/// (Telegram re-encodes photos as JPEG). Documents keep their own name.
pub fn to_inbound(msg: &Message) -> InboundMessage {
    let author = msg.from.as_ref();
    let text = msg.text().or_else(|| msg.caption()).unwrap_or("").trim().to_string();

    let mut attachments = Vec::new();
    if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
        attachments.push(Attachment {
            file_id: photo.file.id.0.clone(),
            unique_id: photo.file.unique_id.0.clone(),
            file_name: format!("photo_{}.jpg", photo.file.unique_id.0),
        });
    }
    if let Some(doc) = msg.document() {
        attachments.push(Attachment {
            file_id: doc.file.id.0.clone(),
            unique_id: doc.file.unique_id.0.clone(),
            file_name: doc.file_name.clone().unwrap_or_default(),
        });
    }

    InboundMessage {
        chat_id: msg.chat.id.0,
        author_id: author.map(|u| u.id.0 as i64).unwrap_or(0),
        author_is_bot: author.is_some_and(|u| u.is_bot),
        text,
        attachments,
    }
}
