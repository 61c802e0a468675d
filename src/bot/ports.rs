//! Seams between the dispatcher/scheduler and the outside world.
//!
//! Production implementations live next to each adapter; tests plug in
//! in-memory doubles.

use std::path::Path;

use tempfile::TempPath;

use crate::bot::error::{ChatError, OcrError, TtsError, WeatherError};
use crate::bot::message::Attachment;
use crate::bot::weather::WeatherReport;

/// Current conditions for a city.
#[async_trait::async_trait]
pub trait WeatherLookup: Send + Sync {
    async fn lookup(&self, city: &str) -> Result<WeatherReport, WeatherError>;
}

/// Extracts text from an image file on disk.
#[async_trait::async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &Path) -> Result<String, OcrError>;
}

/// Renders text to an audio file inside `dir`.
///
/// The returned path deletes the file when dropped.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, dir: &Path) -> Result<TempPath, TtsError>;
}

/// Outbound side of the chat platform.
#[async_trait::async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError>;

    async fn send_audio(&self, chat_id: i64, audio: &Path) -> Result<(), ChatError>;
}

/// Fetches a message attachment to a local file.
#[async_trait::async_trait]
pub trait AttachmentSource: Send + Sync {
    async fn download(&self, attachment: &Attachment, dest: &Path) -> Result<(), ChatError>;
}

/// Hook for messages carrying a video-platform link. No implementation ships
/// with the bot; the dispatcher only calls it when one is registered.
#[async_trait::async_trait]
pub trait LinkHandler: Send + Sync {
    async fn handle_link(&self, chat_id: i64, url: &str);
}
