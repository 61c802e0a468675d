//! Forwards log events to a chat.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::bot::message::{html_escape, truncate_chars};
use crate::bot::ports::ChatSink;

/// Per-message cap on the escaped text.
const MAX_LOG_CHARS: usize = 4000;

/// Buffered INFO lines that trigger an early flush.
const MAX_BUFFERED: usize = 50;

const FLUSH_EVERY: Duration = Duration::from_secs(5);

/// Events from the chat client itself are not forwarded, or a failing
/// send would log a warning that triggers another send.
const CHAT_CLIENT_TARGET: &str = "hydrobot::bot::telegram";

/// Log message with priority.
#[derive(Debug)]
enum LogMessage {
    /// WARN/ERROR, sent immediately.
    Urgent(String),
    /// INFO, batched.
    Info(String),
}

pub struct ChatLogLayer {
    tx: mpsc::UnboundedSender<LogMessage>,
}

impl ChatLogLayer {
    /// Spawns the forwarding task; must be called inside a tokio runtime.
    pub fn new(chat: Arc<dyn ChatSink>, chat_id: i64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<LogMessage>();
        tokio::spawn(forward(chat, chat_id, rx));
        Self { tx }
    }
}

async fn forward(chat: Arc<dyn ChatSink>, chat_id: i64, mut rx: mpsc::UnboundedReceiver<LogMessage>) {
    let mut info_buffer: Vec<String> = Vec::new();
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + FLUSH_EVERY, FLUSH_EVERY);

    loop {
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(LogMessage::Urgent(text)) => send_log(chat.as_ref(), chat_id, &text).await,
                    Some(LogMessage::Info(text)) => {
                        info_buffer.push(text);
                        if info_buffer.len() >= MAX_BUFFERED {
                            flush_buffer(chat.as_ref(), chat_id, &mut info_buffer).await;
                        }
                    }
                    None => {
                        flush_buffer(chat.as_ref(), chat_id, &mut info_buffer).await;
                        break;
                    }
                }
            }
            _ = interval.tick() => {
                flush_buffer(chat.as_ref(), chat_id, &mut info_buffer).await;
            }
        }
    }
}

/// Escape for HTML and cap the result, cutting the raw text so no entity is split.
fn escape_capped(text: &str) -> String {
    let escaped = html_escape(text);
    if escaped.chars().count() <= MAX_LOG_CHARS {
        return escaped;
    }
    let mut raw = truncate_chars(text, MAX_LOG_CHARS);
    while html_escape(raw).chars().count() > MAX_LOG_CHARS {
        raw = truncate_chars(raw, raw.chars().count().saturating_sub(16));
    }
    format!("{}...", html_escape(raw))
}

async fn send_log(chat: &dyn ChatSink, chat_id: i64, text: &str) {
    let text = escape_capped(text);
    // Going through tracing here would feed the layer its own failures.
    if let Err(e) = chat.send_text(chat_id, &text).await {
        eprintln!("Failed to forward log to chat: {e}");
    }
}

async fn flush_buffer(chat: &dyn ChatSink, chat_id: i64, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(chat, chat_id, &combined).await;
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let fields = std::mem::take(&mut self.message);
            self.message = format!("{:?}", value);
            if !fields.is_empty() {
                self.message.push_str(&format!(" ({})", fields));
            }
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message.push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

/// Render an event as a single chat line, or `None` if it is below INFO.
fn render(level: Level, visitor: MessageVisitor) -> Option<LogMessage> {
    match level {
        Level::ERROR => Some(LogMessage::Urgent(format!("❌ {}", visitor.message))),
        Level::WARN => Some(LogMessage::Urgent(format!("⚠️ {}", visitor.message))),
        Level::INFO => Some(LogMessage::Info(visitor.message)),
        _ => None,
    }
}

/// Only this crate's own events go to the chat.
fn forwarded_target(target: &str) -> bool {
    let ours = target == "hydrobot" || target.starts_with("hydrobot::");
    ours && !target.starts_with(CHAT_CLIENT_TARGET)
}

impl<S: Subscriber> Layer<S> for ChatLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();
        if level > Level::INFO || !forwarded_target(metadata.target()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if let Some(msg) = render(level, visitor)
            && self.tx.send(msg).is_err()
        {
            eprintln!("Log channel closed, message dropped");
        }
    }
}
