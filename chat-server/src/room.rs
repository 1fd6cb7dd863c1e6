//! The single shared chat room: accepts connections, runs each client's read
//! loop and tears sessions down through one disconnect path.

use std::{net::SocketAddr, sync::Arc};

use tokio::{
    io::{self, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    select,
    sync::{mpsc, watch},
};
use tracing::{debug, info, warn};

use crate::{
    config::ChatConfig,
    dispatch::dispatch,
    message::{Incoming, QUIT, ServerMessage, read_line, write_line},
    registry::Registry,
    scheduler::DelayScheduler,
    session::SessionId,
};

pub struct Room {
    registry: Arc<Registry>,
    scheduler: DelayScheduler,
    config: ChatConfig,
    shutdown: watch::Sender<bool>,
}

impl Room {
    pub fn new(config: ChatConfig) -> Arc<Self> {
        let registry = Arc::new(Registry::new());
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            scheduler: DelayScheduler::new(Arc::clone(&registry)),
            registry,
            config,
            shutdown,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn scheduler(&self) -> &DelayScheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn nicknames(&self) -> Vec<String> {
        self.registry.nicknames()
    }

    /// Registers a new connection and starts serving it.
    ///
    /// The client gets the welcome banner, then its lines are read and
    /// dispatched on a task of their own. Whenever that task ends, for any
    /// reason, [`Room::disconnect`] runs for the session. Returns `None` if the
    /// room has already shut down; the stream is dropped in that case.
    pub fn accept<S>(self: &Arc<Self>, stream: S, peer: SocketAddr) -> Option<SessionId>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            debug!(?peer, "connection refused during shutdown");
            return None;
        }

        let (reader, writer) = io::split(stream);
        let (outbox, inbox) = mpsc::channel(self.config.outbox_capacity.max(1));
        tokio::spawn(write_outgoing(writer, inbox, peer));

        // Queued before registration so no broadcast can overtake the banner.
        if outbox.try_send(ServerMessage::Welcome.to_string()).is_err() {
            debug!(?peer, "welcome banner dropped");
        }
        let id = self.registry.register(peer, outbox);
        info!(?peer, session = %id, "new connection");

        let room = Arc::clone(self);
        tokio::spawn(async move {
            let _disconnect = DisconnectOnDrop {
                room: Arc::clone(&room),
                id,
            };
            room.read_loop(id, BufReader::new(reader), shutdown).await;
        });

        Some(id)
    }

    async fn read_loop<R>(&self, id: SessionId, mut reader: R, mut shutdown: watch::Receiver<bool>)
    where
        R: io::AsyncBufRead + Unpin,
    {
        loop {
            let line = select! {
                line = read_line(&mut reader, self.config.max_line_bytes) => line,
                _ = shutdown.changed() => {
                    debug!(session = %id, "read loop stopped by shutdown");
                    break;
                }
            };

            match line {
                Ok(Some(Incoming::Line(line))) if line == QUIT => {
                    debug!(session = %id, "client quit");
                    break;
                }
                Ok(Some(Incoming::Line(line))) => {
                    debug!(session = %id, %line, "incoming line");
                    dispatch(self, id, &line);
                }
                Ok(Some(Incoming::TooLong)) => {
                    let max = self.config.max_line_bytes;
                    warn!(session = %id, max, "line too long, dropping");
                    self.registry.send_to(id, &ServerMessage::LineTooLong { max });
                }
                Ok(None) => {
                    debug!(session = %id, "client closed the connection");
                    break;
                }
                Err(err) => {
                    warn!(session = %id, error = ?err, "failed to read from client");
                    break;
                }
            }
        }
    }

    /// Removes a session, tells everyone else it left and closes its
    /// connection after a final `quit` line. Calling it again is a no-op.
    pub fn disconnect(&self, id: SessionId) {
        let Some(session) = self.registry.remove(id) else {
            return;
        };

        self.registry.broadcast(
            &ServerMessage::Left {
                nickname: session.nickname.clone(),
            },
            &[id],
        );
        session.send(ServerMessage::Quit.to_string());
        info!(
            session = %id,
            peer = ?session.peer(),
            nickname = %session.nickname,
            "client disconnected"
        );
        // Dropping the session closes its outbox; the writer then shuts the
        // transport down once the queued lines are flushed.
    }

    /// Sends `quit` to every client, empties the room and stops all read
    /// loops. New connections are refused afterwards.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        let sessions = self.registry.drain();
        info!(sessions = sessions.len(), "room shutting down");
        for session in sessions {
            session.send(ServerMessage::Quit.to_string());
        }
    }
}

struct DisconnectOnDrop {
    room: Arc<Room>,
    id: SessionId,
}

impl Drop for DisconnectOnDrop {
    fn drop(&mut self) {
        self.room.disconnect(self.id);
    }
}

async fn write_outgoing<W>(mut writer: W, mut inbox: mpsc::Receiver<String>, peer: SocketAddr)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = inbox.recv().await {
        if let Err(err) = write_line(&mut writer, &line).await {
            debug!(?peer, ?err, "failed to deliver message to client");
            return;
        }
    }

    if let Err(err) = writer.shutdown().await {
        debug!(?peer, ?err, "failed to close client connection cleanly");
    }
}
