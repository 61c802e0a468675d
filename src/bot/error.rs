//! Typed failure reasons for each adapter.
//!
//! Fail-soft call sites turn these into fixed user-facing replies; the
//! reason itself only ever reaches the logs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("city not found: {0}")]
    NotFound(String),

    #[error("weather service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("malformed weather response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR service error: {0}")]
    Service(String),

    #[error("OCR service returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("no text recognized")]
    NoText,
}

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("nothing to synthesize")]
    EmptyText,

    #[error("speech request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("speech service returned {status}")]
    Upstream { status: u16 },

    #[error("failed to write audio: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Request(String),

    #[error("attachment download failed: {0}")]
    Download(String),

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}
