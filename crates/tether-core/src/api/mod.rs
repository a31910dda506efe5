//! Remote API boundary
//!
//! [`RemoteApi`] is everything the connection manager needs from the remote
//! integration server. [`HttpRemoteApi`] is the bundled HTTP/JSON
//! implementation; tests substitute their own.

pub mod http;
pub mod types;

pub use http::HttpRemoteApi;
pub use types::{
    AuthStatus, CreateRecordParams, HealthReport, HealthStatus, RecordResult, SearchParams,
    SearchResult, TokenRefreshOutcome, ToolDescriptor, UpdateRecordParams,
};

use crate::error::RemoteResult;
use async_trait::async_trait;

/// Client for the remote integration server
///
/// Implementations perform a single request per call. Retry, timeouts
/// across attempts, and cancellation are layered on by the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Whether the endpoint answers at all
    async fn reachable(&self, url: &str) -> RemoteResult<bool>;

    /// Fetch the server's health document
    async fn get_health(&self) -> RemoteResult<HealthReport>;

    /// List the tools the server exposes
    async fn get_tools(&self) -> RemoteResult<Vec<ToolDescriptor>>;

    /// Fetch the delegated credential status
    async fn get_oauth_status(&self) -> RemoteResult<AuthStatus>;

    /// Ask the server to refresh its delegated credential
    async fn refresh_token(&self) -> RemoteResult<TokenRefreshOutcome>;

    async fn search_records(&self, params: SearchParams) -> RemoteResult<SearchResult>;

    async fn create_record(&self, params: CreateRecordParams) -> RemoteResult<RecordResult>;

    async fn update_record(&self, params: UpdateRecordParams) -> RemoteResult<RecordResult>;

    async fn delete_record(&self, module: &str, id: &str) -> RemoteResult<RecordResult>;
}
