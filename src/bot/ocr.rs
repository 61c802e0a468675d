//! OCR.space client for reading text off images.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::bot::error::OcrError;
use crate::bot::ports::TextRecognizer;

const OCR_API_URL: &str = "https://api.ocr.space";

/// Vietnamese language hint.
const OCR_LANGUAGE: &str = "vie";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    is_errored_on_processing: bool,
    /// A string or an array of strings, depending on the failure.
    #[serde(default)]
    error_message: Option<serde_json::Value>,
    #[serde(default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: String,
}

pub struct OcrClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl OcrClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OCR_API_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Fail-soft variant: the recognized text, or `None` on any failure.
    pub async fn recognize_text(&self, image: &Path) -> Option<String> {
        match self.parse_image(image).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("OCR failed for {}: {}", image.display(), e);
                None
            }
        }
    }

    async fn parse_image(&self, image: &Path) -> Result<String, OcrError> {
        let data = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.png")
            .to_string();
        info!("🔎 OCR: {} ({} bytes)", file_name, data.len());

        let form = Form::new()
            .text("apikey", self.api_key.clone())
            .text("language", OCR_LANGUAGE)
            .part("file", Part::bytes(data).file_name(file_name));

        let response = self
            .client
            .post(format!("{}/parse/image", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("OCR response status: {status}");

        if !status.is_success() {
            return Err(OcrError::Upstream { status: status.as_u16(), body });
        }

        let parsed: ParseResponse = serde_json::from_str(&body)
            .map_err(|e| OcrError::Service(format!("unreadable response: {e}")))?;

        if parsed.is_errored_on_processing {
            return Err(OcrError::Service(error_text(parsed.error_message)));
        }

        let text = parsed
            .parsed_results
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|r| r.parsed_text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(OcrError::NoText);
        }

        info!("🔎 Recognized {} chars", text.chars().count());
        Ok(text)
    }
}

#[async_trait::async_trait]
impl TextRecognizer for OcrClient {
    async fn recognize(&self, image: &Path) -> Result<String, OcrError> {
        self.parse_image(image).await
    }
}

fn error_text(message: Option<serde_json::Value>) -> String {
    match message {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(items)) => {
            let parts: Vec<String> = items
                .into_iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect();
            if parts.is_empty() {
                "Unknown error".to_string()
            } else {
                parts.join("; ")
            }
        }
        Some(other) => other.to_string(),
        None => "Unknown error".to_string(),
    }
}
