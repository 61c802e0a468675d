pub mod bot;
pub mod config;
pub mod liveness;
pub mod telegram_log;
