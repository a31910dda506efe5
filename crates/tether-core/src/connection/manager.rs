//! Connection state machine
//!
//! [`ConnectionManager`] owns the authoritative [`ConnectionStatus`] and
//! everything derived from it. All status changes go through a single
//! transition function under one synchronous lock, which also appends to
//! the event history and publishes to subscribers, so observers see
//! transitions in the order they happened.
//!
//! Mutating operations (`connect`, `retry_connection`, the final step of
//! `disconnect`, `refresh_token`) are serialized by an async operation
//! lock. `disconnect` cancels the session token *before* waiting for that
//! lock, so it aborts whatever is in flight instead of queueing behind it.
//!
//! Cached auth status is re-normalized on every read and on every healthy
//! probe, so a token that expires while connected is never reported valid.

use super::history::EventHistory;
use super::types::{ConnectionEvent, ConnectionSnapshot, ConnectionStatus, ServerDescriptor};
use crate::api::{AuthStatus, HealthReport, RemoteApi, ToolDescriptor};
use crate::auth::TokenTracker;
use crate::clock::{Clock, SystemClock};
use crate::config::{AuthConfig, HealthConfig, TetherConfig};
use crate::error::{ErrorKind, RemoteError, RemoteResult};
use crate::health::{ProbeSink, ProberHandle, spawn_prober};
use crate::recovery::{CircuitBreaker, CircuitBreakerStats, CircuitState, RetryPolicy};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Buffered events per broadcast subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Handle to a managed connection
///
/// Cheap to clone; all clones share one state machine. Dropping the last
/// handle cancels in-flight requests and stops the prober.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

pub(super) struct Inner {
    me: Weak<Inner>,
    api: Arc<dyn RemoteApi>,
    tracker: TokenTracker,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    health_config: HealthConfig,
    auth_config: AuthConfig,
    state: Mutex<State>,
    op_lock: tokio::sync::Mutex<()>,
    eager_refresh: AtomicBool,
    /// Set when the issuer refuses a refresh; cleared by a successful
    /// refresh or a new connection
    refresh_rejected: AtomicBool,
    status_tx: watch::Sender<ConnectionStatus>,
    health_tx: watch::Sender<Option<Arc<HealthReport>>>,
    auth_tx: watch::Sender<Option<AuthStatus>>,
    events_tx: broadcast::Sender<ConnectionEvent>,
}

struct State {
    descriptor: ServerDescriptor,
    health: Option<Arc<HealthReport>>,
    auth: Option<AuthStatus>,
    tools: Vec<ToolDescriptor>,
    history: EventHistory,
    prober: Option<ProberHandle>,
    generation: u64,
    session: CancellationToken,
}

/// Everything fetched by a successful connect
struct Handshake {
    health: HealthReport,
    tools: Vec<ToolDescriptor>,
    auth: AuthStatus,
}

impl ConnectionManager {
    /// Create a manager for the server described by `config`
    pub fn new(config: &TetherConfig, api: Arc<dyn RemoteApi>) -> Self {
        Self::with_clock(config, api, Arc::new(SystemClock))
    }

    /// Create a manager that reads wall-clock time from `clock`
    pub fn with_clock(config: &TetherConfig, api: Arc<dyn RemoteApi>, clock: Arc<dyn Clock>) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        let (health_tx, _) = watch::channel(None);
        let (auth_tx, _) = watch::channel(None);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let inner = Arc::new_cyclic(|me| Inner {
            me: me.clone(),
            tracker: TokenTracker::new(api.clone(), clock.clone()),
            api,
            clock,
            retry: RetryPolicy::with_config(config.retry.clone()),
            breaker: CircuitBreaker::with_config(&config.server.name, config.circuit_breaker.clone()),
            health_config: config.health.clone(),
            auth_config: config.auth.clone(),
            state: Mutex::new(State {
                descriptor: ServerDescriptor::new(&config.server.name, &config.server.url),
                health: None,
                auth: None,
                tools: Vec::new(),
                history: EventHistory::new(config.history.capacity),
                prober: None,
                generation: 0,
                session: CancellationToken::new(),
            }),
            op_lock: tokio::sync::Mutex::new(()),
            eager_refresh: AtomicBool::new(false),
            refresh_rejected: AtomicBool::new(false),
            status_tx,
            health_tx,
            auth_tx,
            events_tx,
        });

        Self { inner }
    }

    /// Establish the connection
    ///
    /// A no-op while `connecting` or `connected`. Otherwise runs the
    /// handshake (reachability, health, tool discovery, auth status), each
    /// step under the retry policy. On success the status becomes
    /// `connected` and health probing starts; on failure the status becomes
    /// `error` and the error is returned.
    pub async fn connect(&self) -> RemoteResult<()> {
        if matches!(
            self.status(),
            ConnectionStatus::Connecting | ConnectionStatus::Connected
        ) {
            debug!(server = %self.server_name(), "Connect ignored, already connecting or connected");
            return Ok(());
        }
        let _op = self.inner.op_lock.lock().await;
        self.inner.connect_locked(false).await.map(|_| ())
    }

    /// Reconnect from the `error` state
    ///
    /// Proceeds only if the status is still `error` once the operation lock
    /// is held, so a scheduled reconnect never overrides an explicit
    /// disconnect. Returns `Ok(true)` when a reconnect succeeded and
    /// `Ok(false)` when it was skipped.
    pub async fn retry_connection(&self) -> RemoteResult<bool> {
        let _op = self.inner.op_lock.lock().await;
        self.inner.connect_locked(true).await
    }

    /// Tear the connection down
    ///
    /// Cancels in-flight requests, stops probing, clears health, auth, and
    /// tools, and transitions to `disconnected`. Never fails.
    pub async fn disconnect(&self) {
        self.inner.cancel_session();
        let _op = self.inner.op_lock.lock().await;
        self.inner.teardown("Disconnected");
    }

    /// Disconnect, then connect again
    pub async fn refresh_connection(&self) -> RemoteResult<()> {
        info!(server = %self.server_name(), "Refreshing connection");
        self.disconnect().await;
        self.connect().await
    }

    /// Refresh the OAuth token and re-read its status
    ///
    /// Does not change the connection status. On failure the previous auth
    /// status is left untouched. An explicit call always reaches the
    /// issuer, even after an earlier refusal stopped eager refreshes.
    pub async fn refresh_token(&self) -> RemoteResult<AuthStatus> {
        let _op = self.inner.op_lock.lock().await;
        self.inner.refresh_locked().await
    }

    pub fn status(&self) -> ConnectionStatus {
        self.inner.state.lock().descriptor.status
    }

    pub fn server_name(&self) -> String {
        self.inner.state.lock().descriptor.name.clone()
    }

    pub fn descriptor(&self) -> ServerDescriptor {
        self.inner.state.lock().descriptor.clone()
    }

    /// Latest accepted health report
    pub fn health(&self) -> Option<Arc<HealthReport>> {
        self.inner.state.lock().health.clone()
    }

    /// Latest auth status, normalized against the current time
    pub fn auth_status(&self) -> Option<AuthStatus> {
        let now = self.inner.clock.now();
        self.inner.state.lock().auth.clone().map(|auth| auth.normalized(now))
    }

    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.inner.state.lock().tools.clone()
    }

    /// Recorded transitions, oldest first
    pub fn history(&self) -> Vec<ConnectionEvent> {
        self.inner.state.lock().history.to_vec()
    }

    /// Whether the health prober is running
    pub fn is_probing(&self) -> bool {
        self.inner.state.lock().prober.is_some()
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        let now = self.inner.clock.now();
        let state = self.inner.state.lock();
        ConnectionSnapshot {
            descriptor: state.descriptor.clone(),
            health: state.health.clone(),
            auth: state.auth.clone().map(|auth| auth.normalized(now)),
            tools: state.tools.clone(),
            history: state.history.to_vec(),
            probing: state.prober.is_some(),
        }
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<Option<Arc<HealthReport>>> {
        self.inner.health_tx.subscribe()
    }

    pub fn subscribe_auth(&self) -> watch::Receiver<Option<AuthStatus>> {
        self.inner.auth_tx.subscribe()
    }

    /// Every transition appended to the history from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events_tx.subscribe()
    }

    /// State of the circuit guarding record operations
    pub fn circuit_state(&self) -> CircuitState {
        self.inner.breaker.state()
    }

    pub fn circuit_stats(&self) -> CircuitBreakerStats {
        self.inner.breaker.stats()
    }

    /// Run a remote call under the circuit breaker and retry policy,
    /// requiring `connected`
    ///
    /// The breaker sees one outcome per call, after retries are spent.
    pub(super) async fn passthrough<'a, T, F, Fut>(
        &'a self,
        operation: &str,
        mut call: F,
    ) -> RemoteResult<T>
    where
        F: FnMut(&'a dyn RemoteApi) -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let cancel = self.inner.require_connected(operation)?;
        let api: &'a dyn RemoteApi = &*self.inner.api;
        self.inner
            .breaker
            .call(self.inner.retry.execute(operation, || call(api), &cancel))
            .await
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConnectionManager")
            .field("server", &state.descriptor.name)
            .field("status", &state.descriptor.status)
            .field("probing", &state.prober.is_some())
            .finish()
    }
}

impl Inner {
    /// Apply a status change; a same-status transition records nothing
    fn transition(&self, state: &mut State, to: ConnectionStatus, message: Option<String>) {
        let from = state.descriptor.status;
        if from == to {
            debug!(server = %state.descriptor.name, status = %to, "Status unchanged");
            return;
        }

        state.descriptor.status = to;
        let event = ConnectionEvent {
            timestamp: self.clock.now(),
            from,
            status: to,
            message,
        };
        info!(
            server = %state.descriptor.name,
            from = %from,
            to = %to,
            message = event.message.as_deref().unwrap_or(""),
            "Connection status changed"
        );
        state.history.push(event.clone());
        self.status_tx.send_replace(to);
        // No subscribers is fine
        let _ = self.events_tx.send(event);
    }

    fn session_token(&self) -> CancellationToken {
        self.state.lock().session.clone()
    }

    /// Cancel everything issued under the current session and start a new one
    fn cancel_session(&self) {
        let mut state = self.state.lock();
        state.session.cancel();
        state.session = CancellationToken::new();
    }

    fn require_connected(&self, operation: &str) -> RemoteResult<CancellationToken> {
        let state = self.state.lock();
        if state.descriptor.status != ConnectionStatus::Connected {
            return Err(RemoteError::connection(format!(
                "{operation} requires a connected server (status: {})",
                state.descriptor.status
            )));
        }
        Ok(state.session.clone())
    }

    /// Caller must hold the operation lock
    async fn connect_locked(&self, only_from_error: bool) -> RemoteResult<bool> {
        let (cancel, url) = {
            let mut state = self.state.lock();
            let status = state.descriptor.status;
            if only_from_error && status != ConnectionStatus::Error {
                debug!(server = %state.descriptor.name, status = %status, "Reconnect skipped");
                return Ok(false);
            }
            if matches!(status, ConnectionStatus::Connecting | ConnectionStatus::Connected) {
                debug!(server = %state.descriptor.name, status = %status, "Connect ignored");
                return Ok(false);
            }
            state.descriptor.last_error = None;
            self.transition(&mut state, ConnectionStatus::Connecting, None);
            (state.session.clone(), state.descriptor.url.clone())
        };

        let mut attempt = ConnectAttempt { inner: self, armed: true };
        let outcome = self.handshake(&url, &cancel).await;
        attempt.armed = false;

        let mut state = self.state.lock();
        match outcome {
            Ok(handshake) if !cancel.is_cancelled() => {
                let now = self.clock.now();
                let health = Arc::new(handshake.health);
                state.descriptor.capabilities =
                    handshake.tools.iter().map(|tool| tool.name.clone()).collect();
                state.descriptor.last_ping = Some(now);
                state.tools = handshake.tools;
                state.health = Some(health.clone());
                state.auth = Some(handshake.auth.clone());
                self.health_tx.send_replace(Some(health));
                self.auth_tx.send_replace(Some(handshake.auth));
                self.refresh_rejected.store(false, Ordering::Release);
                self.breaker.reset();

                let message = format!("Connected to {}", state.descriptor.name);
                self.transition(&mut state, ConnectionStatus::Connected, Some(message));
                self.start_prober(&mut state);
                Ok(true)
            }
            Ok(_) | Err(RemoteError::Cancelled) => {
                self.transition(
                    &mut state,
                    ConnectionStatus::Disconnected,
                    Some("Connection attempt cancelled".to_string()),
                );
                Err(RemoteError::Cancelled)
            }
            Err(error) => {
                warn!(server = %state.descriptor.name, error = %error, "Connection failed");
                let message = error.to_string();
                state.descriptor.last_error = Some(message.clone());
                self.transition(&mut state, ConnectionStatus::Error, Some(message));
                Err(error)
            }
        }
    }

    async fn handshake(&self, url: &str, cancel: &CancellationToken) -> RemoteResult<Handshake> {
        let api: &dyn RemoteApi = &*self.api;
        let tracker = &self.tracker;
        let accept_degraded = self.health_config.accept_degraded;

        self.retry
            .execute(
                "reachability",
                || async move {
                    if api.reachable(url).await? {
                        Ok(())
                    } else {
                        Err(RemoteError::connection(format!("{url} is unreachable")))
                    }
                },
                cancel,
            )
            .await?;

        let health = self
            .retry
            .execute(
                "health",
                || async move {
                    let report = api.get_health().await?;
                    if report.status.is_acceptable(accept_degraded) {
                        Ok(report)
                    } else {
                        Err(RemoteError::server(503, report.summary()))
                    }
                },
                cancel,
            )
            .await?;

        let tools = self
            .retry
            .execute("tool discovery", || api.get_tools(), cancel)
            .await?;

        let auth = self
            .retry
            .execute("auth status", || tracker.get_status(), cancel)
            .await?;

        Ok(Handshake {
            health,
            tools,
            auth,
        })
    }

    /// Start probing unless a prober is already running
    fn start_prober(&self, state: &mut State) {
        if state.prober.is_some() {
            debug!(server = %state.descriptor.name, "Prober already running");
            return;
        }
        state.generation += 1;
        let handle = spawn_prober(
            self.me.clone(),
            self.api.clone(),
            state.generation,
            self.health_config.interval,
            self.retry.config().attempt_timeout,
        );
        state.prober = Some(handle);
    }

    fn stop_prober(state: &mut State) {
        if let Some(prober) = state.prober.take() {
            prober.stop();
        }
    }

    /// Leave `connected` for `error`, stopping the prober first
    fn fail_connected(&self, state: &mut State, message: String) {
        Self::stop_prober(state);
        warn!(server = %state.descriptor.name, reason = %message, "Connection lost");
        state.descriptor.last_error = Some(message.clone());
        self.transition(state, ConnectionStatus::Error, Some(message));
    }

    fn teardown(&self, message: &str) {
        let mut state = self.state.lock();
        Self::stop_prober(&mut state);
        state.health = None;
        state.auth = None;
        state.tools.clear();
        state.descriptor.capabilities.clear();
        state.descriptor.last_error = None;
        self.health_tx.send_if_modified(|health| health.take().is_some());
        self.auth_tx.send_if_modified(|auth| auth.take().is_some());
        self.transition(&mut state, ConnectionStatus::Disconnected, Some(message.to_string()));
    }

    /// Refresh, then re-read the auth status; caller must hold the
    /// operation lock
    async fn refresh_locked(&self) -> RemoteResult<AuthStatus> {
        let cancel = self.session_token();
        let tracker = &self.tracker;

        let refreshed = self
            .retry
            .execute("token refresh", || tracker.refresh(), &cancel)
            .await;
        if let Err(error) = refreshed {
            if error.kind() == ErrorKind::Auth {
                self.refresh_rejected.store(true, Ordering::Release);
            }
            return Err(error);
        }
        self.refresh_rejected.store(false, Ordering::Release);

        let status = self
            .retry
            .execute("auth status", || tracker.get_status(), &cancel)
            .await?;

        let mut state = self.state.lock();
        state.auth = Some(status.clone());
        self.auth_tx.send_replace(Some(status.clone()));
        info!(
            server = %state.descriptor.name,
            expires_at = ?status.expires_at,
            "OAuth token refreshed"
        );
        Ok(status)
    }

    /// Refresh the token in the background unless a refresh is running
    fn spawn_eager_refresh(&self) {
        if self.eager_refresh.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(inner) = self.me.upgrade() else {
            self.eager_refresh.store(false, Ordering::Release);
            return;
        };

        tokio::spawn(async move {
            let manager = ConnectionManager { inner };
            info!(server = %manager.server_name(), "OAuth token nearing expiry, refreshing");
            if let Err(error) = manager.refresh_token().await {
                warn!(error = %error, "Background token refresh failed");
            }
            manager.inner.eager_refresh.store(false, Ordering::Release);
        });
    }
}

impl ProbeSink for Inner {
    fn on_probe(&self, generation: u64, result: RemoteResult<HealthReport>) -> bool {
        let mut state = self.state.lock();
        let current = state.prober.as_ref().map(ProberHandle::generation);
        if current != Some(generation) || state.descriptor.status != ConnectionStatus::Connected {
            debug!(generation, current = ?current, "Discarding stale probe result");
            return false;
        }

        match result {
            Ok(report) if report.status.is_acceptable(self.health_config.accept_degraded) => {
                let now = self.clock.now();
                let report = Arc::new(report);
                state.descriptor.last_ping = Some(now);
                state.health = Some(report.clone());
                self.health_tx.send_replace(Some(report));

                let expired = state
                    .auth
                    .as_ref()
                    .filter(|auth| auth.token_valid && auth.is_expired_at(now))
                    .map(|auth| auth.clone().normalized(now));
                if let Some(expired) = expired {
                    warn!(
                        server = %state.descriptor.name,
                        expires_at = ?expired.expires_at,
                        "OAuth token expired"
                    );
                    state.auth = Some(expired.clone());
                    self.auth_tx.send_replace(Some(expired));
                }

                let refresh_due = self.auth_config.auto_refresh
                    && !self.refresh_rejected.load(Ordering::Acquire)
                    && state.auth.as_ref().is_some_and(|auth| {
                        self.tracker.needs_refresh(auth, self.auth_config.refresh_window)
                    });
                drop(state);

                if refresh_due {
                    self.spawn_eager_refresh();
                }
                true
            }
            Ok(report) => {
                let message = format!("Health check failed: {}", report.summary());
                let report = Arc::new(report);
                state.health = Some(report.clone());
                self.health_tx.send_replace(Some(report));
                self.fail_connected(&mut state, message);
                false
            }
            Err(RemoteError::Cancelled) => false,
            Err(error) => {
                self.fail_connected(&mut state, format!("Health check failed: {error}"));
                false
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.session.cancel();
        Self::stop_prober(state);
    }
}

/// Fails `connecting` over to `error` if a connect future is dropped
/// mid-handshake, leaving it to the reconnect supervisor
struct ConnectAttempt<'a> {
    inner: &'a Inner,
    armed: bool,
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.inner.state.lock();
        if state.descriptor.status == ConnectionStatus::Connecting {
            let message = "Connection attempt abandoned".to_string();
            warn!(server = %state.descriptor.name, "{message}");
            state.descriptor.last_error = Some(message.clone());
            self.inner.transition(&mut state, ConnectionStatus::Error, Some(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HealthStatus, MockRemoteApi};
    use crate::error::ErrorKind;
    use crate::recovery::RetryConfig;
    use chrono::Utc;
    use std::time::Duration;

    fn config() -> TetherConfig {
        let mut config = TetherConfig::for_server("crm", "http://crm.test:3001");
        config.retry = RetryConfig::default()
            .with_base_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(40));
        config
    }

    fn healthy_mock() -> MockRemoteApi {
        let mut api = MockRemoteApi::new();
        api.expect_reachable().returning(|_| Ok(true));
        api.expect_get_health()
            .returning(|| Ok(HealthReport::new(HealthStatus::Healthy, Utc::now())));
        api.expect_get_tools()
            .returning(|| Ok(vec![ToolDescriptor::new("search_records")]));
        api.expect_get_oauth_status().returning(|| {
            Ok(AuthStatus {
                authenticated: true,
                token_valid: true,
                ..Default::default()
            })
        });
        api
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_populates_state() {
        let manager = ConnectionManager::new(&config(), Arc::new(healthy_mock()));

        manager.connect().await.unwrap();

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.status(), ConnectionStatus::Connected);
        assert!(snapshot.probing);
        assert!(snapshot.descriptor.capabilities.contains("search_records"));
        assert!(snapshot.descriptor.last_ping.is_some());
        assert!(snapshot.auth.is_some_and(|auth| auth.authenticated));
        assert_eq!(
            snapshot
                .history
                .iter()
                .map(|e| e.status)
                .collect::<Vec<_>>(),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_while_connected_is_noop() {
        let manager = ConnectionManager::new(&config(), Arc::new(healthy_mock()));
        manager.connect().await.unwrap();
        manager.connect().await.unwrap();

        assert_eq!(manager.history().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_auth_failure_is_not_retried() {
        let mut api = MockRemoteApi::new();
        api.expect_reachable().times(1).returning(|_| Ok(true));
        api.expect_get_health()
            .times(1)
            .returning(|| Ok(HealthReport::new(HealthStatus::Healthy, Utc::now())));
        api.expect_get_tools().times(1).returning(|| Ok(Vec::new()));
        api.expect_get_oauth_status()
            .times(1)
            .returning(|| Err(RemoteError::auth("client credentials revoked")));

        let manager = ConnectionManager::new(&config(), Arc::new(api));
        let err = manager.connect().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Auth);
        assert_eq!(manager.status(), ConnectionStatus::Error);
        assert!(!manager.is_probing());
        assert_eq!(
            manager.descriptor().last_error.as_deref(),
            Some("Auth error: client credentials revoked")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_handshake_fails_connect() {
        let mut api = MockRemoteApi::new();
        api.expect_reachable().returning(|_| Ok(true));
        api.expect_get_health()
            .times(4)
            .returning(|| Ok(HealthReport::new(HealthStatus::Unhealthy, Utc::now())));

        let manager = ConnectionManager::new(&config(), Arc::new(api));
        let err = manager.connect().await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(manager.status(), ConnectionStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_state() {
        let manager = ConnectionManager::new(&config(), Arc::new(healthy_mock()));
        manager.connect().await.unwrap();

        manager.disconnect().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.status(), ConnectionStatus::Disconnected);
        assert!(!snapshot.probing);
        assert!(snapshot.health.is_none());
        assert!(snapshot.auth.is_none());
        assert!(snapshot.tools.is_empty());
        assert!(snapshot.descriptor.capabilities.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_connection_skips_unless_errored() {
        let manager = ConnectionManager::new(&config(), Arc::new(healthy_mock()));

        assert_eq!(manager.retry_connection().await, Ok(false));
        assert_eq!(manager.status(), ConnectionStatus::Disconnected);
        assert!(manager.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_passthrough_requires_connection() {
        let manager = ConnectionManager::new(&config(), Arc::new(healthy_mock()));

        let err = manager
            .search_records(crate::api::SearchParams::new("Leads"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
