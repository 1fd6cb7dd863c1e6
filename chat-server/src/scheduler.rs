//! Delayed broadcasts.
//!
//! Each scheduled message gets its own task that sleeps until its fire time
//! and then broadcasts to whoever is in the room at that moment. Tasks hold
//! only the rendered text, never the session that asked for it.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::{message::ServerMessage, registry::Registry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledMessage {
    pub fire_at: Instant,
    pub message: ServerMessage,
}

pub struct DelayScheduler {
    registry: Arc<Registry>,
    pending: Arc<AtomicUsize>,
}

impl DelayScheduler {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Broadcasts `message` once `delay` has elapsed.
    ///
    /// Returns the fire time, or `None` without scheduling anything when
    /// `delay` reaches past what the clock can represent.
    pub fn schedule(&self, delay: Duration, message: ServerMessage) -> Option<Instant> {
        let fire_at = Instant::now().checked_add(delay)?;
        self.schedule_at(ScheduledMessage { fire_at, message });
        Some(fire_at)
    }

    pub fn schedule_at(&self, scheduled: ScheduledMessage) {
        let registry = Arc::clone(&self.registry);
        let pending = Arc::clone(&self.pending);
        pending.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(async move {
            let ScheduledMessage { fire_at, message } = scheduled;
            sleep_until(fire_at).await;
            let delivered = registry.broadcast(&message, &[]);
            pending.fetch_sub(1, Ordering::SeqCst);
            debug!(delivered, "delayed message fired");
        });
    }

    /// Number of scheduled messages that have not fired yet.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use tokio::sync::mpsc;

    use super::*;

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn message() -> ServerMessage {
        ServerMessage::Chat {
            nickname: "alice".into(),
            text: "later".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_to_sessions_present_at_fire_time() {
        let registry = Arc::new(Registry::new());
        let scheduler = DelayScheduler::new(Arc::clone(&registry));

        let (early_tx, mut early_rx) = mpsc::channel(4);
        let early = registry.register(peer(1000), early_tx);

        scheduler.schedule(Duration::from_secs(5 * 60), message());
        assert_eq!(scheduler.pending(), 1);

        // The original audience leaves and someone new arrives before firing.
        registry.remove(early);
        let (late_tx, mut late_rx) = mpsc::channel(4);
        registry.register(peer(1001), late_tx);

        tokio::time::sleep(Duration::from_secs(4 * 60)).await;
        assert!(late_rx.try_recv().is_err());
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(late_rx.recv().await.as_deref(), Some("alice: later"));
        assert_eq!(scheduler.pending(), 0);
        assert!(early_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn firing_into_an_empty_room_is_harmless() {
        let registry = Arc::new(Registry::new());
        let scheduler = DelayScheduler::new(Arc::clone(&registry));

        scheduler.schedule(Duration::ZERO, message());
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(scheduler.pending(), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_delay_is_not_scheduled() {
        let registry = Arc::new(Registry::new());
        let scheduler = DelayScheduler::new(Arc::clone(&registry));

        assert!(scheduler.schedule(Duration::MAX, message()).is_none());
        assert_eq!(scheduler.pending(), 0);

        let fire_at = scheduler
            .schedule(Duration::from_secs(60), message())
            .expect("one minute fits");
        assert_eq!(fire_at, Instant::now() + Duration::from_secs(60));
        assert_eq!(scheduler.pending(), 1);
    }
}
