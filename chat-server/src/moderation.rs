//! Complaint bans and per-session message rate limiting.
//!
//! Everything here is pure bookkeeping over a session's counters: callers pass
//! in the current instant, so windows are evaluated lazily when a message
//! arrives rather than by a background timer.

use std::{fmt, time::Duration};

use tokio::time::Instant;

/// Thresholds and windows applied to every session in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Complaints needed before a session is banned from chatting.
    pub complaint_threshold: u32,
    /// How long a ban lasts, measured from the moment it started.
    pub ban_window: Duration,
    /// Chat messages allowed per rate window before further ones are denied.
    pub message_limit: u32,
    pub rate_window: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            complaint_threshold: 3,
            ban_window: Duration::from_secs(240 * 60),
            message_limit: 20,
            rate_window: Duration::from_secs(60 * 60),
        }
    }
}

/// Outcome of running a chat message through the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(Denial),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Banned,
    RateLimited { window: Duration },
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::Banned => write!(f, "Your account was banned"),
            Denial::RateLimited { window } => {
                write!(f, "Message limit, wait {}", describe_window(*window))
            }
        }
    }
}

fn describe_window(window: Duration) -> String {
    let minutes = window.as_secs() / 60;
    match minutes {
        60 => "1 hour".to_string(),
        m if m > 0 && m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{m} minutes"),
    }
}

/// Moderation counters carried by each session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModerationState {
    complaint_count: u32,
    banned_at: Option<Instant>,
    message_count: u32,
    first_message_at: Option<Instant>,
}

impl ModerationState {
    pub fn complaint_count(&self) -> u32 {
        self.complaint_count
    }

    pub fn banned_at(&self) -> Option<Instant> {
        self.banned_at
    }

    pub fn message_count(&self) -> u32 {
        self.message_count
    }

    pub fn first_message_at(&self) -> Option<Instant> {
        self.first_message_at
    }

    /// Clears whichever windows have run out by `now`.
    pub fn refresh(&mut self, limits: &Limits, now: Instant) {
        if let Some(banned_at) = self.banned_at {
            if now.saturating_duration_since(banned_at) >= limits.ban_window {
                self.complaint_count = 0;
                self.banned_at = None;
            }
        }

        if let Some(first) = self.first_message_at {
            if now.saturating_duration_since(first) >= limits.rate_window {
                self.message_count = 0;
                self.first_message_at = None;
            }
        }
    }

    /// Decides whether a chat message may be broadcast.
    ///
    /// Does not count the message; call [`ModerationState::record_message`]
    /// once it has actually been sent.
    pub fn admit(&mut self, limits: &Limits, now: Instant) -> Verdict {
        self.refresh(limits, now);

        if self.complaint_count >= limits.complaint_threshold {
            return Verdict::Deny(Denial::Banned);
        }

        if self.message_count > limits.message_limit {
            return Verdict::Deny(Denial::RateLimited {
                window: limits.rate_window,
            });
        }

        Verdict::Allow
    }

    pub fn record_message(&mut self, now: Instant) {
        if self.first_message_at.is_none() {
            self.first_message_at = Some(now);
        }
        self.message_count += 1;
    }

    /// Counts one complaint. Returns `true` when this complaint starts a ban.
    pub fn register_complaint(&mut self, limits: &Limits, now: Instant) -> bool {
        self.refresh(limits, now);
        self.complaint_count = self.complaint_count.saturating_add(1);

        if self.complaint_count == limits.complaint_threshold {
            self.banned_at = Some(now);
            return true;
        }
        false
    }
}
