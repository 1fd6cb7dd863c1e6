//! The live session map and fan-out over it.
//!
//! Every session, including its nickname and moderation counters, lives
//! behind a single mutex. Nothing here awaits while holding the lock, so all
//! operations are synchronous and delivery goes through each session's
//! non-blocking outbox.

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::debug;

use crate::{
    message::ServerMessage,
    session::{ClientSession, Outbox, SessionId},
};

pub struct Registry {
    sessions: Mutex<HashMap<SessionId, ClientSession>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, ClientSession>> {
        // Sessions stay consistent even if a holder panicked mid-update.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a session for a freshly accepted connection.
    pub fn register(&self, peer: SocketAddr, outbox: Outbox) -> SessionId {
        let id = SessionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, ClientSession::new(id, peer, outbox));
        id
    }

    /// Removes a session. Returns `None` if it was already gone.
    pub fn remove(&self, id: SessionId) -> Option<ClientSession> {
        self.lock().remove(&id)
    }

    /// Removes every session at once.
    pub fn drain(&self) -> Vec<ClientSession> {
        self.lock().drain().map(|(_, session)| session).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn nickname(&self, id: SessionId) -> Option<String> {
        self.lock().get(&id).map(|session| session.nickname.clone())
    }

    pub fn nicknames(&self) -> Vec<String> {
        self.lock()
            .values()
            .map(|session| session.nickname.clone())
            .collect()
    }

    /// Runs `f` against one session while the registry is locked.
    pub fn with_session<T>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut ClientSession) -> T,
    ) -> Option<T> {
        self.lock().get_mut(&id).map(f)
    }

    /// Runs `f` against every session named `nickname`, returning how many
    /// matched.
    pub fn with_nickname(&self, nickname: &str, mut f: impl FnMut(&mut ClientSession)) -> usize {
        let mut sessions = self.lock();
        let mut matched = 0;
        for session in sessions.values_mut().filter(|s| s.nickname == nickname) {
            f(session);
            matched += 1;
        }
        matched
    }

    /// Queues `message` for one session. Returns `false` if the session is
    /// unknown or the line was dropped.
    pub fn send_to(&self, id: SessionId, message: &ServerMessage) -> bool {
        match self.lock().get(&id) {
            Some(session) => session.send(message.to_string()),
            None => {
                debug!(session = %id, "message for unknown session dropped");
                false
            }
        }
    }

    /// Delivers `message` to every session named `nickname`, returning how
    /// many sessions matched.
    pub fn send_to_nickname(&self, nickname: &str, message: &ServerMessage) -> usize {
        let rendered = message.to_string();
        self.with_nickname(nickname, |session| {
            session.send(rendered.clone());
        })
    }

    /// Delivers `message` to every registered session not listed in
    /// `exclude`.
    ///
    /// Delivery is best effort: a full or closed outbox only affects that
    /// recipient. Returns how many sessions the message was queued for.
    pub fn broadcast(&self, message: &ServerMessage, exclude: &[SessionId]) -> usize {
        let rendered = message.to_string();
        let sessions = self.lock();
        let mut delivered = 0;
        for session in sessions.values() {
            if exclude.contains(&session.id()) {
                continue;
            }
            if session.send(rendered.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
