//! Text-to-speech through Google Translate's speech endpoint.
//!
//! The endpoint only accepts short inputs, so text is split into chunks,
//! each chunk is fetched as MP3, and the pieces are concatenated into one
//! file. MP3 frames are self-delimiting, so plain concatenation plays back.

use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, info};

use crate::bot::error::TtsError;
use crate::bot::ports::SpeechSynthesizer;

const TTS_API_URL: &str = "https://translate.google.com";

/// Longest chunk the endpoint reliably accepts.
const MAX_CHUNK_CHARS: usize = 100;

/// TTS client for the Google Translate speech endpoint.
pub struct TtsClient {
    base_url: String,
    lang: String,
    client: reqwest::Client,
}

impl TtsClient {
    /// Create a client speaking `lang` (e.g. "vi").
    pub fn new(lang: String) -> Self {
        Self::with_base_url(lang, TTS_API_URL.to_string())
    }

    pub fn with_base_url(lang: String, base_url: String) -> Self {
        Self {
            base_url,
            lang,
            client: reqwest::Client::new(),
        }
    }

    /// Generate MP3 audio for `text`.
    pub async fn speak(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let preview: String = text.chars().take(50).collect();
        info!("TTS: \"{}\"", preview);

        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(TtsError::EmptyText);
        }

        let total = chunks.len().to_string();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let response = self
                .client
                .get(format!("{}/translate_tts", self.base_url))
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", self.lang.as_str()),
                    ("q", chunk.as_str()),
                    ("total", total.as_str()),
                    ("idx", idx.to_string().as_str()),
                    ("textlen", chunk.chars().count().to_string().as_str()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(TtsError::Upstream { status: response.status().as_u16() });
            }

            let bytes = response.bytes().await?;
            debug!("Chunk {}/{}: {} bytes", idx + 1, chunks.len(), bytes.len());
            audio.extend_from_slice(&bytes);
        }

        info!("Generated {} bytes of speech", audio.len());
        Ok(audio)
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for TtsClient {
    async fn synthesize(&self, text: &str, dir: &Path) -> Result<TempPath, TtsError> {
        // Owning the path before any I/O means every failure below removes it.
        let path = tempfile::Builder::new()
            .prefix("tts-")
            .suffix(".mp3")
            .tempfile_in(dir)?
            .into_temp_path();

        let audio = self.speak(text).await?;
        tokio::fs::write(&path, &audio).await?;
        Ok(path)
    }
}

/// Split `text` into chunks of at most `max_chars` characters, breaking on
/// whitespace where possible. Words longer than `max_chars` are hard-split.
fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
