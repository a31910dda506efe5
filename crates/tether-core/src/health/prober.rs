//! Health prober task

use crate::api::{HealthReport, RemoteApi};
use crate::error::{RemoteError, RemoteResult};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Receiver of probe results
pub trait ProbeSink: Send + Sync + 'static {
    /// Handle one probe result from the prober with `generation`
    ///
    /// Returns `false` to stop the prober.
    fn on_probe(&self, generation: u64, result: RemoteResult<HealthReport>) -> bool;
}

/// Handle to a running prober
///
/// Dropping the handle stops the prober.
#[derive(Debug)]
pub struct ProberHandle {
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ProberHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the prober; no result is delivered to the sink afterwards
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ProberHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawn a prober that probes every `period`, first after one full period
///
/// Each probe is bounded by `probe_timeout`. The prober holds the sink
/// weakly and exits once the sink is gone.
pub fn spawn_prober<S: ProbeSink>(
    sink: Weak<S>,
    api: Arc<dyn RemoteApi>,
    generation: u64,
    period: Duration,
    probe_timeout: Duration,
) -> ProberHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        debug!(generation, period_ms = period.as_millis() as u64, "Health prober started");

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                outcome = timeout(probe_timeout, api.get_health()) => match outcome {
                    Ok(result) => result,
                    Err(_) => Err(RemoteError::timeout(format!(
                        "health probe exceeded {}ms",
                        probe_timeout.as_millis()
                    ))),
                },
            };

            if token.is_cancelled() {
                break;
            }
            let Some(sink) = sink.upgrade() else {
                break;
            };
            trace!(generation, ok = result.is_ok(), "Health probe completed");
            if !sink.on_probe(generation, result) {
                break;
            }
        }

        debug!(generation, "Health prober stopped");
    });

    ProberHandle {
        generation,
        cancel,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HealthStatus, MockRemoteApi};
    use chrono::Utc;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<(u64, bool)>>,
        keep_going: std::sync::atomic::AtomicBool,
    }

    impl ProbeSink for RecordingSink {
        fn on_probe(&self, generation: u64, result: RemoteResult<HealthReport>) -> bool {
            self.seen.lock().push((generation, result.is_ok()));
            self.keep_going.load(Ordering::SeqCst)
        }
    }

    fn healthy_api(calls: Arc<AtomicU32>) -> Arc<dyn RemoteApi> {
        let mut api = MockRemoteApi::new();
        api.expect_get_health().returning(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(HealthReport::new(HealthStatus::Healthy, Utc::now()))
        });
        Arc::new(api)
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_once_per_period() {
        let sink = Arc::new(RecordingSink::default());
        sink.keep_going.store(true, Ordering::SeqCst);
        let calls = Arc::new(AtomicU32::new(0));

        let handle = spawn_prober(
            Arc::downgrade(&sink),
            healthy_api(calls.clone()),
            7,
            Duration::from_secs(30),
            Duration::from_secs(5),
        );

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(62)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(sink.seen.lock().iter().all(|(generation, ok)| *generation == 7 && *ok));

        handle.stop();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_can_stop_prober() {
        let sink = Arc::new(RecordingSink::default());
        let calls = Arc::new(AtomicU32::new(0));

        let handle = spawn_prober(
            Arc::downgrade(&sink),
            healthy_api(calls.clone()),
            1,
            Duration::from_secs(10),
            Duration::from_secs(5),
        );

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exits_when_sink_dropped() {
        let sink = Arc::new(RecordingSink::default());
        sink.keep_going.store(true, Ordering::SeqCst);
        let calls = Arc::new(AtomicU32::new(0));

        let handle = spawn_prober(
            Arc::downgrade(&sink),
            healthy_api(calls.clone()),
            3,
            Duration::from_secs(10),
            Duration::from_secs(5),
        );
        drop(sink);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(handle.is_finished());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
