//! Background vehicle polling
//!
//! Reads the vehicle through its caches on a fixed interval and reports each
//! reading over a tokio channel. Optionally publishes a global cache reset
//! every few polls, the way a configuration reload would.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::reset::ResetRegistry;
use crate::vehicle::{ApiError, Vehicle, VehicleSnapshot};

/// Messages sent from the polling task
#[derive(Debug, Clone)]
pub enum PollMessage {
    /// A snapshot was read
    Snapshot {
        poll: u32,
        snapshot: VehicleSnapshot,
    },
    /// Reading the vehicle failed
    Error { poll: u32, error: ApiError },
    /// A global reset was published after the given poll
    ResetPublished { poll: u32, subscribers: usize },
    /// All polls are done
    Completed,
}

/// Polling schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between polls; the first poll is immediate
    pub interval: Duration,
    /// Number of polls
    pub polls: u32,
    /// Publish a reset after every n-th poll; 0 never resets
    pub reset_every: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            polls: 5,
            reset_every: 0,
        }
    }
}

impl From<&Config> for PollConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            polls: config.polls,
            reset_every: config.reset_every,
        }
    }
}

/// Handle for controlling the polling task
pub struct PollHandle {
    /// Channel for receiving poll messages
    pub receiver: mpsc::Receiver<PollMessage>,
    shutdown_tx: mpsc::Sender<()>,
}

impl PollHandle {
    /// Spawns the polling task
    ///
    /// # Arguments
    /// * `vehicle` - Vehicle to read
    /// * `resets` - Registry to publish resets on
    /// * `config` - Polling schedule
    ///
    /// # Returns
    /// A PollHandle that receives readings via the `receiver` channel
    pub fn spawn(vehicle: Arc<Vehicle>, resets: Arc<ResetRegistry>, config: PollConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.interval);

            for poll in 1..=config.polls {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = shutdown_rx.recv() => {
                        debug!(poll, "poller shut down");
                        return;
                    }
                }

                // Cache reads may block on the upstream getter
                let reader = Arc::clone(&vehicle);
                let message = match tokio::task::spawn_blocking(move || reader.snapshot()).await {
                    Ok(Ok(snapshot)) => PollMessage::Snapshot { poll, snapshot },
                    Ok(Err(error)) => PollMessage::Error { poll, error },
                    Err(e) => {
                        warn!(poll, error = %e, "vehicle read task failed");
                        return;
                    }
                };
                if msg_tx.send(message).await.is_err() {
                    return;
                }

                if config.reset_every > 0 && poll % config.reset_every == 0 {
                    let subscribers = resets.publish_reset();
                    info!(poll, subscribers, "published global cache reset");
                    if msg_tx
                        .send(PollMessage::ResetPublished { poll, subscribers })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }

            let _ = msg_tx.send(PollMessage::Completed).await;
        });

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Waits for the next message; `None` once the task has exited
    pub async fn recv(&mut self) -> Option<PollMessage> {
        self.receiver.recv().await
    }

    /// Stops the polling task before its next poll
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::config::SimulationConfig;
    use crate::vehicle::SimulatedApi;
    use tokio::time::timeout;

    fn create_test_poller(
        ttl: chrono::Duration,
        config: PollConfig,
        simulation: SimulationConfig,
    ) -> (PollHandle, Arc<SimulatedApi>) {
        let api = Arc::new(SimulatedApi::new(simulation));
        let resets = Arc::new(ResetRegistry::new());
        let vehicle = Arc::new(Vehicle::new(
            api.clone(),
            ttl,
            &resets,
            Arc::new(MockClock::new()),
        ));
        (PollHandle::spawn(vehicle, resets, config), api)
    }

    async fn collect(handle: &mut PollHandle) -> Vec<PollMessage> {
        let mut messages = Vec::new();
        while let Ok(Some(message)) = timeout(Duration::from_secs(5), handle.recv()).await {
            let done = matches!(message, PollMessage::Completed);
            messages.push(message);
            if done {
                break;
            }
        }
        messages
    }

    #[test]
    fn test_poll_config_default() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.polls, 5);
        assert_eq!(config.reset_every, 0);
    }

    #[test]
    fn test_poll_config_from_config() {
        let config = Config {
            poll_interval_ms: 250,
            polls: 2,
            reset_every: 1,
            ..Default::default()
        };
        let poll = PollConfig::from(&config);
        assert_eq!(poll.interval, Duration::from_millis(250));
        assert_eq!(poll.polls, 2);
        assert_eq!(poll.reset_every, 1);
    }

    #[tokio::test]
    async fn test_polls_within_ttl_hit_the_cache() {
        let config = PollConfig {
            interval: Duration::from_millis(5),
            polls: 3,
            reset_every: 0,
        };
        let (mut handle, api) =
            create_test_poller(chrono::Duration::hours(1), config, SimulationConfig::default());

        let messages = collect(&mut handle).await;

        let snapshots = messages
            .iter()
            .filter(|m| matches!(m, PollMessage::Snapshot { .. }))
            .count();
        assert_eq!(snapshots, 3);
        assert!(matches!(messages.last(), Some(PollMessage::Completed)));
        assert_eq!(api.charger_calls(), 1);
        assert_eq!(api.climater_calls(), 1);
    }

    #[tokio::test]
    async fn test_reset_every_poll_forces_refresh() {
        let config = PollConfig {
            interval: Duration::from_millis(5),
            polls: 3,
            reset_every: 1,
        };
        let (mut handle, api) =
            create_test_poller(chrono::Duration::hours(1), config, SimulationConfig::default());

        let messages = collect(&mut handle).await;

        let resets: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                PollMessage::ResetPublished { subscribers, .. } => Some(*subscribers),
                _ => None,
            })
            .collect();
        assert_eq!(resets, vec![2, 2, 2]);
        assert_eq!(api.charger_calls(), 3);
    }

    #[tokio::test]
    async fn test_errors_are_reported() {
        let config = PollConfig {
            interval: Duration::from_millis(5),
            polls: 1,
            reset_every: 0,
        };
        let simulation = SimulationConfig {
            fail_every: 1,
            ..Default::default()
        };
        let (mut handle, _api) = create_test_poller(chrono::Duration::hours(1), config, simulation);

        let messages = collect(&mut handle).await;

        assert!(matches!(
            messages.first(),
            Some(PollMessage::Error { poll: 1, error: ApiError::Request(_) })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_stops_polling() {
        let config = PollConfig {
            interval: Duration::from_secs(60),
            polls: 100,
            reset_every: 0,
        };
        let (mut handle, _api) =
            create_test_poller(chrono::Duration::hours(1), config, SimulationConfig::default());

        let first = timeout(Duration::from_secs(5), handle.recv())
            .await
            .expect("first poll should arrive");
        assert!(matches!(first, Some(PollMessage::Snapshot { poll: 1, .. })));

        handle.shutdown().await;

        let next = timeout(Duration::from_secs(5), handle.recv())
            .await
            .expect("task should exit");
        assert!(next.is_none());
    }
}
