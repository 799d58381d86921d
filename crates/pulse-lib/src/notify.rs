//! Transient user notifications

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

/// At most this many notifications are visible at once
pub const MAX_VISIBLE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    /// `None` stays until evicted or dismissed
    pub duration: Option<Duration>,
    pub posted_at: Instant,
}

impl Notification {
    fn expired(&self, now: Instant) -> bool {
        self.duration
            .map(|d| now.saturating_duration_since(self.posted_at) >= d)
            .unwrap_or(false)
    }
}

/// Bounded queue of visible notifications; oldest is evicted first
#[derive(Debug)]
pub struct NotificationCenter {
    visible: VecDeque<Notification>,
    next_id: u64,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self {
            visible: VecDeque::with_capacity(MAX_VISIBLE),
            next_id: 1,
        }
    }

    /// Post a notification. A zero duration is sticky.
    pub fn push(
        &mut self,
        level: NotificationLevel,
        message: impl Into<String>,
        duration: Duration,
    ) -> u64 {
        self.push_at(level, message, duration, Instant::now())
    }

    pub fn push_at(
        &mut self,
        level: NotificationLevel,
        message: impl Into<String>,
        duration: Duration,
        now: Instant,
    ) -> u64 {
        while self.visible.len() >= MAX_VISIBLE {
            self.visible.pop_front();
        }

        let id = self.next_id;
        self.next_id += 1;
        self.visible.push_back(Notification {
            id,
            level,
            message: message.into(),
            duration: (!duration.is_zero()).then_some(duration),
            posted_at: now,
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.visible.retain(|n| n.id != id);
    }

    /// Drop expired notifications; returns true when any were removed
    pub fn prune(&mut self, now: Instant) -> bool {
        let before = self.visible.len();
        self.visible.retain(|n| !n.expired(now));
        before != self.visible.len()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.visible.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}
