//! Repeat-avoiding random picker for the hourly broadcast.

use std::collections::HashSet;

use rand::Rng;

/// Built-in hydration and stretch reminders.
pub const DEFAULT_REMINDERS: [&str; 5] = [
    "💧 Nhớ uống nước đi nha, khát thì đừng nhớ bot nha!",
    "🤸 Đứng dậy vươn vai, cho máu lưu thông nào!",
    "🍵 Uống nước không chỉ là thói quen mà còn là phong cách sống!",
    "🚶 Dậy đi vòng vòng, bot đi chung nhé (nói cho vui thôi)!",
    "🫗 Đã đến giờ bot nhắc: Uống nước ngay!",
];

/// Picks reminders uniformly at random without repeating one until every
/// reminder of the set has been emitted, then starts a new cycle.
///
/// The set itself is never mutated. Only indices of already-emitted entries
/// are tracked, in memory, so a restart begins a fresh cycle.
#[derive(Debug)]
pub struct ReminderSelector {
    reminders: Vec<String>,
    used: HashSet<usize>,
    last: Option<usize>,
}

impl ReminderSelector {
    /// Returns `None` for an empty set.
    pub fn new(reminders: Vec<String>) -> Option<Self> {
        if reminders.is_empty() {
            return None;
        }
        Some(Self {
            reminders,
            used: HashSet::new(),
            last: None,
        })
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    /// Always false: an empty set is rejected by [`ReminderSelector::new`].
    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    pub fn pick(&mut self) -> &str {
        self.pick_with(&mut rand::thread_rng())
    }

    pub fn pick_with<R: Rng>(&mut self, rng: &mut R) -> &str {
        let mut remaining = self.remaining();
        if remaining.is_empty() {
            self.used.clear();
            // The previous pick stays eligible for this cycle, just not first.
            remaining = (0..self.reminders.len())
                .filter(|&i| self.reminders.len() == 1 || Some(i) != self.last)
                .collect();
        }

        let index = remaining[rng.gen_range(0..remaining.len())];
        self.used.insert(index);
        self.last = Some(index);
        &self.reminders[index]
    }

    fn remaining(&self) -> Vec<usize> {
        (0..self.reminders.len())
            .filter(|i| !self.used.contains(i))
            .collect()
    }
}

impl Default for ReminderSelector {
    fn default() -> Self {
        Self {
            reminders: DEFAULT_REMINDERS.iter().map(|s| s.to_string()).collect(),
            used: HashSet::new(),
            last: None,
        }
    }
}
