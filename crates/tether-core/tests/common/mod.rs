//! Shared fixtures for integration tests
//!
//! [`FakeRemote`] is a scripted in-memory [`RemoteApi`]: each operation
//! pops queued results first and falls back to a fixed default, counts its
//! calls, and can be slowed down to simulate hung requests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tether_core::api::{
    CreateRecordParams, RecordResult, SearchParams, SearchResult, TokenRefreshOutcome,
    UpdateRecordParams,
};
use tether_core::{
    AuthStatus, HealthReport, HealthStatus, RemoteApi, RemoteError, RemoteResult, RetryConfig,
    TetherConfig, ToolDescriptor,
};

pub const REACHABLE: &str = "reachable";
pub const HEALTH: &str = "get_health";
pub const TOOLS: &str = "get_tools";
pub const OAUTH: &str = "get_oauth_status";
pub const REFRESH: &str = "refresh_token";
pub const SEARCH: &str = "search_records";
pub const CREATE: &str = "create_record";
pub const UPDATE: &str = "update_record";
pub const DELETE: &str = "delete_record";

/// Fixed wall-clock origin for tests
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Config with short retry delays so scenarios finish in few virtual seconds
pub fn test_config() -> TetherConfig {
    let mut config = TetherConfig::for_server("crm", "http://crm.test:3001");
    config.retry = RetryConfig::default()
        .with_max_retries(3)
        .with_base_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(1));
    config.health.interval = Duration::from_secs(30);
    config
}

pub fn healthy() -> HealthReport {
    HealthReport::new(HealthStatus::Healthy, epoch()).with_subsystem("crm", true)
}

pub fn unhealthy() -> HealthReport {
    HealthReport::new(HealthStatus::Unhealthy, epoch()).with_subsystem("crm", false)
}

pub fn authenticated(expires_at: Option<DateTime<Utc>>) -> AuthStatus {
    AuthStatus {
        authenticated: true,
        token_valid: true,
        expires_at,
        ..Default::default()
    }
}

pub fn refused() -> RemoteError {
    RemoteError::connection("connection refused")
}

struct Script<T> {
    queue: VecDeque<RemoteResult<T>>,
    fallback: RemoteResult<T>,
}

impl<T: Clone> Script<T> {
    fn new(fallback: RemoteResult<T>) -> Self {
        Self {
            queue: VecDeque::new(),
            fallback,
        }
    }

    fn next(&mut self) -> RemoteResult<T> {
        self.queue
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

struct Scripts {
    reachable: Script<bool>,
    health: Script<HealthReport>,
    tools: Script<Vec<ToolDescriptor>>,
    oauth: Script<AuthStatus>,
    refresh: Script<TokenRefreshOutcome>,
    search: Script<SearchResult>,
    record: Script<RecordResult>,
    calls: HashMap<&'static str, u32>,
    delays: HashMap<&'static str, Duration>,
    requests: Vec<String>,
}

/// Scripted [`RemoteApi`] double
pub struct FakeRemote {
    scripts: Mutex<Scripts>,
}

impl FakeRemote {
    /// A server that answers every call successfully
    pub fn healthy() -> Self {
        Self {
            scripts: Mutex::new(Scripts {
                reachable: Script::new(Ok(true)),
                health: Script::new(Ok(healthy())),
                tools: Script::new(Ok(vec![
                    ToolDescriptor::new("search_records"),
                    ToolDescriptor::new("create_record"),
                ])),
                oauth: Script::new(Ok(authenticated(None))),
                refresh: Script::new(Ok(TokenRefreshOutcome::succeeded())),
                search: Script::new(Ok(SearchResult {
                    success: true,
                    data: Some(vec![serde_json::json!({"id": "1"})]),
                    total_count: Some(1),
                    ..Default::default()
                })),
                record: Script::new(Ok(RecordResult {
                    success: true,
                    ..Default::default()
                })),
                calls: HashMap::new(),
                delays: HashMap::new(),
                requests: Vec::new(),
            }),
        }
    }

    pub fn push_reachable(&self, result: RemoteResult<bool>) {
        self.scripts.lock().reachable.queue.push_back(result);
    }

    pub fn set_reachable(&self, result: RemoteResult<bool>) {
        self.scripts.lock().reachable.fallback = result;
    }

    pub fn push_health(&self, result: RemoteResult<HealthReport>) {
        self.scripts.lock().health.queue.push_back(result);
    }

    pub fn set_health(&self, result: RemoteResult<HealthReport>) {
        self.scripts.lock().health.fallback = result;
    }

    pub fn set_oauth(&self, result: RemoteResult<AuthStatus>) {
        self.scripts.lock().oauth.fallback = result;
    }

    pub fn set_refresh(&self, result: RemoteResult<TokenRefreshOutcome>) {
        self.scripts.lock().refresh.fallback = result;
    }

    pub fn push_search(&self, result: RemoteResult<SearchResult>) {
        self.scripts.lock().search.queue.push_back(result);
    }

    pub fn set_search(&self, result: RemoteResult<SearchResult>) {
        self.scripts.lock().search.fallback = result;
    }

    /// Make every call to `operation` take `delay` before answering
    pub fn delay(&self, operation: &'static str, delay: Duration) {
        self.scripts.lock().delays.insert(operation, delay);
    }

    pub fn clear_delay(&self, operation: &'static str) {
        self.scripts.lock().delays.remove(operation);
    }

    pub fn calls(&self, operation: &str) -> u32 {
        self.scripts.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// Record operations received, as `operation module[/id]`
    pub fn requests(&self) -> Vec<String> {
        self.scripts.lock().requests.clone()
    }

    fn begin(&self, operation: &'static str) -> Option<Duration> {
        let mut scripts = self.scripts.lock();
        *scripts.calls.entry(operation).or_default() += 1;
        scripts.delays.get(operation).copied()
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteApi for FakeRemote {
    async fn reachable(&self, _url: &str) -> RemoteResult<bool> {
        let delay = self.begin(REACHABLE);
        Self::pause(delay).await;
        self.scripts.lock().reachable.next()
    }

    async fn get_health(&self) -> RemoteResult<HealthReport> {
        let delay = self.begin(HEALTH);
        Self::pause(delay).await;
        self.scripts.lock().health.next()
    }

    async fn get_tools(&self) -> RemoteResult<Vec<ToolDescriptor>> {
        let delay = self.begin(TOOLS);
        Self::pause(delay).await;
        self.scripts.lock().tools.next()
    }

    async fn get_oauth_status(&self) -> RemoteResult<AuthStatus> {
        let delay = self.begin(OAUTH);
        Self::pause(delay).await;
        self.scripts.lock().oauth.next()
    }

    async fn refresh_token(&self) -> RemoteResult<TokenRefreshOutcome> {
        let delay = self.begin(REFRESH);
        Self::pause(delay).await;
        self.scripts.lock().refresh.next()
    }

    async fn search_records(&self, params: SearchParams) -> RemoteResult<SearchResult> {
        let delay = self.begin(SEARCH);
        Self::pause(delay).await;
        let mut scripts = self.scripts.lock();
        scripts.requests.push(format!("{SEARCH} {}", params.module));
        scripts.search.next()
    }

    async fn create_record(&self, params: CreateRecordParams) -> RemoteResult<RecordResult> {
        let delay = self.begin(CREATE);
        Self::pause(delay).await;
        let mut scripts = self.scripts.lock();
        scripts.requests.push(format!("{CREATE} {}", params.module));
        scripts.record.next()
    }

    async fn update_record(&self, params: UpdateRecordParams) -> RemoteResult<RecordResult> {
        let delay = self.begin(UPDATE);
        Self::pause(delay).await;
        let mut scripts = self.scripts.lock();
        scripts
            .requests
            .push(format!("{UPDATE} {}/{}", params.module, params.id));
        scripts.record.next()
    }

    async fn delete_record(&self, module: &str, id: &str) -> RemoteResult<RecordResult> {
        let delay = self.begin(DELETE);
        Self::pause(delay).await;
        let mut scripts = self.scripts.lock();
        scripts.requests.push(format!("{DELETE} {module}/{id}"));
        scripts.record.next()
    }
}
