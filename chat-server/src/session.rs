use std::{fmt, net::SocketAddr};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::moderation::ModerationState;

/// Opaque handle identifying one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sending side of a connection's writer task. Each queued string is written
/// as one line.
pub type Outbox = mpsc::Sender<String>;

/// Server-side state for one connected client.
#[derive(Debug)]
pub struct ClientSession {
    id: SessionId,
    peer: SocketAddr,
    pub nickname: String,
    pub moderation: ModerationState,
    outbox: Outbox,
}

impl ClientSession {
    pub fn new(id: SessionId, peer: SocketAddr, outbox: Outbox) -> Self {
        Self {
            id,
            peer,
            nickname: default_nickname(peer),
            moderation: ModerationState::default(),
            outbox,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Queues a rendered line for this client without waiting.
    ///
    /// Returns `false` when the line was dropped because the outbox is full or
    /// the writer has already gone away.
    pub fn send(&self, line: impl Into<String>) -> bool {
        match self.outbox.try_send(line.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    session = %self.id,
                    nickname = %self.nickname,
                    "outbox full, dropping message"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(
                    session = %self.id,
                    nickname = %self.nickname,
                    "writer closed, dropping message"
                );
                false
            }
        }
    }
}

fn default_nickname(peer: SocketAddr) -> String {
    peer.to_string()
}
