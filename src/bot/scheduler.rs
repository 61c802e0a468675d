//! Hourly reminder broadcast.
//!
//! Best effort: at most one broadcast per tick, and ticks missed while the
//! process was down (or while a send was slow) are not replayed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Timelike, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::bot::ports::ChatSink;
use crate::bot::reminders::ReminderSelector;
use crate::config::Config;

/// Source of the current hour of day.
#[derive(Debug, Clone, Copy)]
pub enum LocalClock {
    /// Host local time.
    System,
    Zone(Tz),
}

impl LocalClock {
    pub fn hour(&self) -> u32 {
        match self {
            Self::System => Local::now().hour(),
            Self::Zone(tz) => Utc::now().with_timezone(tz).hour(),
        }
    }
}

/// Inclusive range of hours during which broadcasts go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl ReminderWindow {
    pub fn contains(&self, hour: u32) -> bool {
        (self.start_hour..=self.end_hour).contains(&hour)
    }
}

impl Default for ReminderWindow {
    fn default() -> Self {
        Self { start_hour: 7, end_hour: 18 }
    }
}

/// Where and when reminders are broadcast.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    pub chat_id: i64,
    /// Broad-audience tag appended to each reminder.
    pub mention: String,
    pub window: ReminderWindow,
    pub period: Duration,
    pub clock: LocalClock,
}

impl BroadcastSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chat_id: config.broadcast_chat_id,
            mention: config.broadcast_mention.clone(),
            window: ReminderWindow {
                start_hour: config.reminder_start_hour,
                end_hour: config.reminder_end_hour,
            },
            period: config.reminder_interval,
            clock: config.reminder_timezone.map_or(LocalClock::System, LocalClock::Zone),
        }
    }
}

pub struct Scheduler {
    selector: Mutex<ReminderSelector>,
    chat: Arc<dyn ChatSink>,
    settings: BroadcastSettings,
}

impl Scheduler {
    pub fn new(selector: ReminderSelector, chat: Arc<dyn ChatSink>, settings: BroadcastSettings) -> Self {
        Self {
            selector: Mutex::new(selector),
            chat,
            settings,
        }
    }

    /// Run one tick for the given hour of day. Returns whether a broadcast
    /// was attempted.
    pub async fn tick_at(&self, hour: u32) -> bool {
        if !self.settings.window.contains(hour) {
            debug!("Hour {} outside reminder window, skipping", hour);
            return false;
        }

        let reminder = self.selector.lock().await.pick().to_string();
        let text = format!("{} {}", reminder, self.settings.mention);

        match self.chat.send_text(self.settings.chat_id, &text).await {
            Ok(()) => info!("⏰ Broadcast reminder to chat {}", self.settings.chat_id),
            Err(e) => warn!("Failed to broadcast reminder: {}", e),
        }
        true
    }

    /// Tick forever. The first tick fires one period after start.
    pub async fn run(self) {
        let period = self.settings.period;
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Reminder scheduler started (every {}s, hours {}-{})",
            period.as_secs(),
            self.settings.window.start_hour,
            self.settings.window.end_hour
        );

        loop {
            interval.tick().await;
            let hour = self.settings.clock.hour();
            self.tick_at(hour).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::error::ChatError;
    use std::path::Path;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingChat {
        sent: StdMutex<Vec<(i64, String)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ChatSink for RecordingChat {
        async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), ChatError> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            if self.fail {
                return Err(ChatError::Request("chat not found".into()));
            }
            Ok(())
        }

        async fn send_audio(&self, _chat_id: i64, _audio: &Path) -> Result<(), ChatError> {
            Ok(())
        }
    }

    fn settings() -> BroadcastSettings {
        BroadcastSettings {
            chat_id: -1001,
            mention: "@everyone".into(),
            window: ReminderWindow::default(),
            period: Duration::from_secs(3600),
            clock: LocalClock::System,
        }
    }

    fn scheduler(chat: Arc<RecordingChat>) -> Scheduler {
        let selector = ReminderSelector::new(vec!["Uống nước!".into()]).unwrap();
        Scheduler::new(selector, chat, settings())
    }

    #[test]
    fn test_window_is_inclusive() {
        let window = ReminderWindow::default();
        assert!(!window.contains(6));
        assert!(window.contains(7));
        assert!(window.contains(12));
        assert!(window.contains(18));
        assert!(!window.contains(19));
        assert!(!window.contains(0));
    }

    #[tokio::test]
    async fn test_tick_outside_window_is_noop() {
        let chat = Arc::new(RecordingChat::default());
        let scheduler = scheduler(chat.clone());

        assert!(!scheduler.tick_at(6).await);
        assert!(!scheduler.tick_at(19).await);
        assert!(chat.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tick_inside_window_broadcasts() {
        let chat = Arc::new(RecordingChat::default());
        let scheduler = scheduler(chat.clone());

        assert!(scheduler.tick_at(7).await);
        assert!(scheduler.tick_at(18).await);

        let sent = chat.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], (-1001, "Uống nước! @everyone".to_string()));
    }

    #[tokio::test]
    async fn test_send_failure_does_not_stop_ticks() {
        let chat = Arc::new(RecordingChat {
            fail: true,
            ..Default::default()
        });
        let scheduler = scheduler(chat.clone());

        assert!(scheduler.tick_at(9).await);
        assert!(scheduler.tick_at(10).await);
        assert_eq!(chat.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_broadcasts_rotate_through_set() {
        let chat = Arc::new(RecordingChat::default());
        let scheduler = Scheduler::new(ReminderSelector::default(), chat.clone(), settings());

        for _ in 0..5 {
            scheduler.tick_at(8).await;
        }

        let sent = chat.sent.lock().unwrap();
        let distinct: std::collections::HashSet<_> = sent.iter().map(|(_, t)| t.clone()).collect();
        assert_eq!(distinct.len(), 5);
        assert!(sent.iter().all(|(_, t)| t.ends_with(" @everyone")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_one_period_before_first_tick() {
        let chat = Arc::new(RecordingChat::default());
        let mut settings = settings();
        settings.window = ReminderWindow { start_hour: 0, end_hour: 23 };
        let scheduler = Scheduler::new(ReminderSelector::default(), chat.clone(), settings);

        let handle = tokio::spawn(scheduler.run());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(chat.sent.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(chat.sent.lock().unwrap().len(), 1);
        handle.abort();
    }
}
