use std::time::Duration;

use crate::{cli::ServerArgs, moderation::Limits};

/// Settings shared by every session in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub limits: Limits,
    /// Longest delay `/delay` accepts, in minutes.
    pub max_delay_minutes: u64,
    /// Lines buffered per client before further ones are dropped.
    pub outbox_capacity: usize,
    /// Longest line a client may send, line ending included.
    pub max_line_bytes: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            max_delay_minutes: 24 * 60,
            outbox_capacity: 256,
            max_line_bytes: 8192,
        }
    }
}

impl From<&ServerArgs> for ChatConfig {
    fn from(args: &ServerArgs) -> Self {
        Self {
            limits: Limits {
                complaint_threshold: args.complaint_threshold,
                ban_window: minutes(args.ban_minutes),
                message_limit: args.message_limit,
                rate_window: minutes(args.rate_window_minutes),
            },
            max_delay_minutes: args.max_delay_minutes,
            outbox_capacity: args.outbox_capacity.max(1),
            max_line_bytes: usize::try_from(args.max_line_bytes).unwrap_or(usize::MAX),
        }
    }
}

pub(crate) fn minutes(count: u64) -> Duration {
    Duration::from_secs(count.saturating_mul(60))
}
