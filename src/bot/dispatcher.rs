//! Per-message command rules.
//!
//! Each inbound message is handled on its own; nothing is remembered between
//! messages. Text commands are matched by prefix, first match wins. Image
//! attachments are checked independently of the text.

use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::bot::message::{image_extension, quote_block, Attachment, InboundMessage};
use crate::bot::ports::{
    AttachmentSource, ChatSink, LinkHandler, SpeechSynthesizer, TextRecognizer, WeatherLookup,
};
use crate::bot::weather::weather_reply;

pub const WEATHER_PREFIX: &str = ".tt";
pub const HELP_PREFIX: &str = ".help";
pub const WATER_PREFIX: &str = ".đ";

pub const WEATHER_USAGE: &str = "⚠️ Dùng: <code>.tt &lt;tên địa danh&gt;</code>";

pub const HELP_TEXT: &str = "📖 <b>Hướng dẫn sử dụng bot:</b>\n\
    1. <code>.tt &lt;tên địa danh&gt;</code> – Xem thời tiết.\n\
    2. Gửi ảnh có chữ – Bot đọc chữ và gửi lại bản ghi âm.\n\
    3. <code>.help</code> – Xem danh sách lệnh.";

/// Fixed reply to the water shortcut; not drawn from the broadcast rotation.
pub const WATER_REMINDER: &str = "💧 Nhớ uống nước đi nha, khát thì đừng nhớ bot nha!";

pub const OCR_NO_TEXT: &str = "😢 Không đọc được chữ trong ảnh này!";

/// Text command recognized from a message, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Weather for the trimmed remainder; empty when no city was given.
    Weather(String),
    Help,
    Water,
    /// Message mentions a video-platform link.
    VideoLink(String),
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(rest) = text.strip_prefix(WEATHER_PREFIX) {
            return Some(Self::Weather(rest.trim().to_string()));
        }
        if text.starts_with(HELP_PREFIX) {
            return Some(Self::Help);
        }
        if text.starts_with(WATER_PREFIX) {
            return Some(Self::Water);
        }
        video_link(text).map(Self::VideoLink)
    }
}

fn video_link(text: &str) -> Option<String> {
    static LINK: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"(?i)https?://(?:[\w-]+\.)*tiktok\.com/\S*").expect("static regex")
    });
    LINK.find(text).map(|m| m.as_str().to_string())
}

/// Adapters the dispatcher talks to.
pub struct Services {
    pub weather: Arc<dyn WeatherLookup>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub tts: Arc<dyn SpeechSynthesizer>,
    pub chat: Arc<dyn ChatSink>,
    pub files: Arc<dyn AttachmentSource>,
    pub link_handler: Option<Arc<dyn LinkHandler>>,
}

pub struct Dispatcher {
    services: Services,
    /// Downloaded images and synthesized audio live here until sent.
    scratch_dir: PathBuf,
}

impl Dispatcher {
    pub fn new(services: Services, scratch_dir: PathBuf) -> Self {
        Self { services, scratch_dir }
    }

    pub async fn handle(&self, msg: &InboundMessage) {
        if msg.author_is_bot {
            return;
        }

        if let Some(command) = Command::parse(&msg.text) {
            self.run_command(msg.chat_id, command).await;
        }

        if let Some(attachment) = msg.attachments.iter().find(|a| a.is_image()) {
            self.read_image_aloud(msg.chat_id, attachment).await;
        }
    }

    async fn run_command(&self, chat_id: i64, command: Command) {
        match command {
            Command::Weather(city) if city.is_empty() => self.reply(chat_id, WEATHER_USAGE).await,
            Command::Weather(city) => {
                let reply = weather_reply(self.services.weather.as_ref(), &city).await;
                self.reply(chat_id, &reply).await;
            }
            Command::Help => self.reply(chat_id, HELP_TEXT).await,
            Command::Water => self.reply(chat_id, WATER_REMINDER).await,
            Command::VideoLink(url) => match &self.services.link_handler {
                Some(handler) => handler.handle_link(chat_id, &url).await,
                None => debug!("No link handler registered, ignoring {}", url),
            },
        }
    }

    /// OCR the attachment, echo the text and send it back as speech.
    ///
    /// Both scratch files are `TempPath`s. They are closed explicitly so a
    /// failed delete is logged; any other exit removes them on drop.
    async fn read_image_aloud(&self, chat_id: i64, attachment: &Attachment) {
        info!("🖼 Image {} in chat {}", attachment.file_name, chat_id);

        let image = match self.scratch_file(attachment) {
            Ok(path) => path,
            Err(e) => {
                warn!("Failed to create scratch file: {}", e);
                return;
            }
        };

        if let Err(e) = self.services.files.download(attachment, &image).await {
            warn!("Failed to download {}: {}", attachment.file_name, e);
            discard(image);
            return;
        }

        let text = match self.services.ocr.recognize(&image).await {
            Ok(text) => text,
            Err(e) => {
                warn!("OCR failed for {}: {}", attachment.file_name, e);
                discard(image);
                self.reply(chat_id, OCR_NO_TEXT).await;
                return;
            }
        };
        discard(image);

        let audio = self.services.tts.synthesize(&text, &self.scratch_dir).await;

        self.reply(chat_id, &quote_block(&text)).await;

        match audio {
            Ok(audio) => {
                if let Err(e) = self.services.chat.send_audio(chat_id, &audio).await {
                    warn!("Failed to send audio to chat {}: {}", chat_id, e);
                }
                discard(audio);
            }
            Err(e) => warn!("Speech synthesis failed: {}", e),
        }
    }

    fn scratch_file(&self, attachment: &Attachment) -> std::io::Result<tempfile::TempPath> {
        std::fs::create_dir_all(&self.scratch_dir)?;
        let suffix = image_extension(&attachment.file_name)
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let prefix = format!("img-{}-", sanitize(&attachment.unique_id));
        Ok(tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.scratch_dir)?
            .into_temp_path())
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.services.chat.send_text(chat_id, text).await {
            warn!("Failed to reply in chat {}: {}", chat_id, e);
        }
    }
}

/// Keep only characters that are safe in a file name.
/// Delete a scratch file now, logging instead of failing if it cannot be removed.
fn discard(path: tempfile::TempPath) {
    let shown = path.display().to_string();
    if let Err(e) = path.close() {
        warn!("Failed to remove scratch file {}: {}", shown, e);
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(32)
        .collect()
}
