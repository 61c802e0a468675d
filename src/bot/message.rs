//! Inbound message view and reply formatting helpers.
//!
//! Replies are sent as Telegram HTML, so anything a user typed (or an OCR
//! service read off an image) is escaped before it goes out.

use std::path::Path;

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Image extensions the OCR path accepts, compared case-insensitively.
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Platform handle used to download the file.
    pub file_id: String,
    /// Stable per-file identifier, used to keep scratch file names apart.
    pub unique_id: String,
    pub file_name: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        image_extension(&self.file_name).is_some()
    }
}

/// Read-only view of a platform message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub author_id: i64,
    pub author_is_bot: bool,
    /// Text or caption, already trimmed.
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Lowercased image extension of `file_name`, if it has a recognized one.
pub fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Escape a string for safe inclusion in Telegram HTML.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Truncate to at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Wrap recognized text in a quote block that fits in a single message.
pub fn quote_block(text: &str) -> String {
    const OPEN: &str = "<blockquote>";
    const CLOSE: &str = "</blockquote>";

    let escaped = html_escape(text.trim());
    let budget = MAX_MESSAGE_CHARS - OPEN.len() - CLOSE.len();
    if escaped.chars().count() <= budget {
        return format!("{OPEN}{escaped}{CLOSE}");
    }

    // Cut the raw text rather than the escaped one so no entity is split.
    let mut raw = truncate_chars(text.trim(), budget - 1);
    while html_escape(raw).chars().count() + 1 > budget {
        raw = truncate_chars(raw, raw.chars().count().saturating_sub(16));
    }
    format!("{OPEN}{}…{CLOSE}", html_escape(raw))
}
