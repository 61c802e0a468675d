//! Bot module - command dispatch, external API adapters and the reminder broadcast.

pub mod dispatcher;
pub mod error;
pub mod message;
pub mod ocr;
pub mod ports;
pub mod reminders;
pub mod scheduler;
pub mod telegram;
pub mod tts;
pub mod weather;


pub use dispatcher::{Dispatcher, Services};
pub use message::{Attachment, InboundMessage};
pub use ocr::OcrClient;
pub use reminders::ReminderSelector;
pub use scheduler::{BroadcastSettings, Scheduler};
pub use telegram::TelegramClient;
pub use tts::TtsClient;
pub use weather::WeatherClient;
