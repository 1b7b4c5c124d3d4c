//! Heartbeat loop keeping connections alive and evicting dead ones.

use std::sync::Arc;
use std::time::Duration;

use crate::common::time::Clock;
use crate::domain::{ChatEvent, Timestamp};

use super::fanout::Broadcaster;
use super::registry::RoomRegistry;

/// Default probe cadence
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Singleton background task that pings every open connection on a fixed
/// interval and evicts the ones whose send fails.
///
/// Started once at process startup via [`HeartbeatLoop::run`]; a failing
/// connection never terminates the loop or the current sweep, and the
/// cadence stays periodic regardless of failures in the previous cycle.
pub struct HeartbeatLoop {
    registry: Arc<RoomRegistry>,
    broadcaster: Arc<Broadcaster>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl HeartbeatLoop {
    /// Create a heartbeat loop with the default 30-second interval
    pub fn new(
        registry: Arc<RoomRegistry>,
        broadcaster: Arc<Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            clock,
            interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    /// Override the probe interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the loop forever.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        // the first tick of a tokio interval completes immediately
        ticker.tick().await;
        tracing::info!("Heartbeat loop started (interval: {:?})", self.interval);
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Perform one sweep: ping every connection in every room.
    ///
    /// Successful probes refresh the connection's last-activity timestamp;
    /// failed ones are torn down through the same path as a normal
    /// disconnect.
    pub async fn tick(&self) {
        let connections = self.registry.all_connections().await;
        let payload = serde_json::to_string(&ChatEvent::Ping).unwrap();
        let now = Timestamp::new(self.clock.now_millis());

        let mut broken = Vec::new();
        for handle in connections {
            match handle.send(&payload) {
                Ok(()) => {
                    self.registry
                        .touch(handle.room_id(), handle.id(), now)
                        .await;
                }
                Err(e) => {
                    tracing::warn!(
                        "Heartbeat failed for '{}' in room '{}': {}",
                        handle.username(),
                        handle.room_id(),
                        e
                    );
                    broken.push(handle);
                }
            }
        }

        for handle in broken {
            self.broadcaster.teardown(handle).await;
        }
    }
}
