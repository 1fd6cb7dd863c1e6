use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::Result;
use tokio::{
    net::{TcpListener, TcpStream},
    select,
};
use tracing::{info, warn};

use crate::{config::ChatConfig, room::Room};

/// Accepts TCP connections and hands each one to the room.
pub struct Server {
    listener: TcpListener,
    room: Arc<Room>,
}

impl Server {
    pub fn new(listener: TcpListener, config: ChatConfig) -> Self {
        Self {
            listener,
            room: Room::new(config),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn room(&self) -> Arc<Room> {
        Arc::clone(&self.room)
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, room } = self;
        tokio::pin!(shutdown);

        loop {
            select! {
                _ = &mut shutdown => {
                    room.shutdown();
                    break;
                }
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &room);
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_accept_result(result: std::io::Result<(TcpStream, SocketAddr)>, room: &Arc<Room>) {
    match result {
        Ok((stream, peer)) => {
            if room.accept(stream, peer).is_none() {
                info!(?peer, "connection dropped, room is shutting down");
            }
        }
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}
