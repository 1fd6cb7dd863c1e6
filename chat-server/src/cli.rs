use std::net::SocketAddr;

use clap::Parser;

/// Upper bound for `--max-delay-minutes`.
pub const MAX_DELAY_CEILING_MINUTES: u64 = 365 * 24 * 60;

/// Line-based chat server with nicknames, private and delayed messages,
/// complaint bans and rate limiting.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Socket address the server should bind to. Use port 0 for an ephemeral port.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub listen: SocketAddr,

    /// Complaints after which a user can no longer chat.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub complaint_threshold: u32,

    /// Minutes a complaint ban lasts.
    #[arg(long, default_value_t = 240)]
    pub ban_minutes: u64,

    /// Chat messages allowed per rate window.
    #[arg(long, default_value_t = 20)]
    pub message_limit: u32,

    /// Length of the rate window in minutes.
    #[arg(long, default_value_t = 60)]
    pub rate_window_minutes: u64,

    /// Longest delay accepted by /delay, in minutes. At most one year.
    #[arg(
        long,
        default_value_t = 1440,
        value_parser = clap::value_parser!(u64).range(..=MAX_DELAY_CEILING_MINUTES)
    )]
    pub max_delay_minutes: u64,

    /// Longest line a client may send, in bytes including the line ending.
    #[arg(
        long,
        default_value_t = 8192,
        value_parser = clap::value_parser!(u64).range(2..=1024 * 1024)
    )]
    pub max_line_bytes: u64,

    /// Lines buffered per client before new ones are dropped.
    #[arg(long, default_value_t = 256)]
    pub outbox_capacity: usize,
}
