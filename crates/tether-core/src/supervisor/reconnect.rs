//! Reconnect supervisor task

use crate::config::ReconnectConfig;
use crate::connection::{ConnectionManager, ConnectionStatus};
use crate::recovery::BackoffStrategy;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Supervisor lifecycle events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A reconnect attempt will run after `delay`
    Scheduled { attempt: u32, delay: Duration },
    /// A reconnect attempt is running
    Attempting { attempt: u32 },
    /// The connection is back after `attempts` supervised attempts
    Recovered { attempts: u32 },
    /// The ceiling was reached with the connection still errored
    Exhausted { attempts: u32 },
    /// The supervisor task is exiting
    ShuttingDown,
}

/// Reconnects a [`ConnectionManager`] that has fallen into `error`
pub struct ReconnectSupervisor {
    manager: ConnectionManager,
    max_attempts: u32,
    strategy: Box<dyn BackoffStrategy>,
    attempts: Arc<AtomicU32>,
    reset: Arc<Notify>,
    events: broadcast::Sender<SupervisorEvent>,
    cancel: CancellationToken,
}

impl ReconnectSupervisor {
    pub fn new(manager: ConnectionManager, config: &ReconnectConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            manager,
            max_attempts: config.max_attempts,
            strategy: config.strategy(),
            attempts: Arc::new(AtomicU32::new(0)),
            reset: Arc::new(Notify::new()),
            events,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe before spawning to observe the very first event
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.events.subscribe()
    }

    /// Start supervising on the current Tokio runtime
    pub fn spawn(self) -> SupervisorHandle {
        let attempts = self.attempts.clone();
        let reset = self.reset.clone();
        let events = self.events.clone();
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());

        SupervisorHandle {
            attempts,
            reset,
            events,
            cancel,
            task: Some(task),
        }
    }

    async fn run(self) {
        let Self {
            manager,
            max_attempts,
            strategy,
            attempts,
            reset,
            events,
            cancel,
        } = self;
        let mut status_rx = manager.subscribe_status();
        info!(server = %manager.server_name(), max_attempts, "Reconnect supervisor started");

        loop {
            let status = *status_rx.borrow_and_update();
            match status {
                ConnectionStatus::Connected => {
                    let previous = attempts.swap(0, Ordering::SeqCst);
                    if previous > 0 {
                        info!(attempts = previous, "Connection recovered");
                        let _ = events.send(SupervisorEvent::Recovered { attempts: previous });
                    }
                }
                ConnectionStatus::Error if attempts.load(Ordering::SeqCst) < max_attempts => {
                    let done = attempts.load(Ordering::SeqCst);
                    let delay = strategy.delay_for_attempt(done);
                    info!(
                        attempt = done + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Reconnect scheduled"
                    );
                    let _ = events.send(SupervisorEvent::Scheduled {
                        attempt: done + 1,
                        delay,
                    });

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        left = left_error(&mut status_rx) => {
                            if !left {
                                break;
                            }
                            debug!("Status left error, pending reconnect abandoned");
                            continue;
                        }
                        _ = sleep(delay) => {}
                    }

                    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let _ = events.send(SupervisorEvent::Attempting { attempt });
                    match manager.retry_connection().await {
                        Ok(true) => {}
                        Ok(false) => debug!(attempt, "Reconnect skipped, status already changed"),
                        Err(error) => {
                            warn!(attempt, max_attempts, error = %error, "Reconnect attempt failed");
                            if attempt >= max_attempts && manager.status() == ConnectionStatus::Error {
                                warn!(attempts = attempt, "Reconnect attempts exhausted, giving up");
                                let _ = events.send(SupervisorEvent::Exhausted { attempts: attempt });
                            }
                        }
                    }
                    // Re-evaluate the status the attempt left behind
                    continue;
                }
                _ => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = reset.notified() => debug!("Reconnect attempts reset"),
            }
        }

        let _ = events.send(SupervisorEvent::ShuttingDown);
        info!("Reconnect supervisor stopped");
    }
}

/// Wait until the status is something other than `error`
///
/// Returns `false` if the manager went away.
async fn left_error(status_rx: &mut watch::Receiver<ConnectionStatus>) -> bool {
    loop {
        if status_rx.changed().await.is_err() {
            return false;
        }
        if *status_rx.borrow_and_update() != ConnectionStatus::Error {
            return true;
        }
    }
}

/// Handle to a running [`ReconnectSupervisor`]
///
/// Dropping the handle stops the supervisor without waiting for it.
pub struct SupervisorHandle {
    attempts: Arc<AtomicU32>,
    reset: Arc<Notify>,
    events: broadcast::Sender<SupervisorEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SupervisorHandle {
    /// Supervised attempts since the last recovery or reset
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Clear the attempt counter, re-arming an exhausted supervisor
    pub fn reset(&self) {
        self.attempts.store(0, Ordering::SeqCst);
        self.reset.notify_one();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Signal the supervisor to stop without waiting for it
    ///
    /// An attempt already in flight runs to completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the supervisor and wait for its task to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                warn!(error = %error, "Reconnect supervisor task failed");
            }
        }
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("attempts", &self.attempts())
            .field("running", &self.is_running())
            .finish()
    }
}
