//! Token status tracker

use crate::api::{AuthStatus, RemoteApi};
use crate::clock::Clock;
use crate::error::{RemoteError, RemoteResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches and refreshes the remote server's OAuth credential
///
/// Every status it returns is normalized against its clock, so an expired
/// token is never reported valid.
#[derive(Clone)]
pub struct TokenTracker {
    api: Arc<dyn RemoteApi>,
    clock: Arc<dyn Clock>,
}

impl TokenTracker {
    pub fn new(api: Arc<dyn RemoteApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }

    /// Fetch the current credential status
    pub async fn get_status(&self) -> RemoteResult<AuthStatus> {
        let status = self.api.get_oauth_status().await?;
        let now = self.clock.now();
        if status.token_valid && status.is_expired_at(now) {
            debug!(expires_at = ?status.expires_at, "Server reported an expired token as valid");
        }
        Ok(status.normalized(now))
    }

    /// Ask the server to refresh its credential
    ///
    /// Transport failures keep their retryable classification. A refusal
    /// reported by the server is an [`RemoteError::Auth`] and is fatal.
    pub async fn refresh(&self) -> RemoteResult<()> {
        let outcome = self.api.refresh_token().await?;
        if outcome.success {
            return Ok(());
        }

        let reason = outcome
            .error
            .unwrap_or_else(|| "token refresh rejected by issuer".to_string());
        warn!(reason = %reason, "Token refresh rejected");
        Err(RemoteError::auth(reason))
    }

    /// Whether `status` expires within `window` of now
    pub fn needs_refresh(&self, status: &AuthStatus, window: Duration) -> bool {
        status.needs_refresh(self.clock.now(), window)
    }
}

impl std::fmt::Debug for TokenTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenTracker")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockRemoteApi, TokenRefreshOutcome};
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;
    use chrono::{TimeZone, Utc};

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2025, 9, 27, 12, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_get_status_normalizes_expiry() {
        let clock = clock();
        let expired_at = clock.now() - chrono::Duration::minutes(5);

        let mut api = MockRemoteApi::new();
        api.expect_get_oauth_status().times(1).returning(move || {
            Ok(AuthStatus {
                authenticated: true,
                token_valid: true,
                expires_at: Some(expired_at),
                ..Default::default()
            })
        });

        let tracker = TokenTracker::new(Arc::new(api), Arc::new(clock));
        let status = tracker.get_status().await.unwrap();

        assert!(status.authenticated);
        assert!(!status.token_valid);
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let mut api = MockRemoteApi::new();
        api.expect_refresh_token()
            .times(1)
            .returning(|| Ok(TokenRefreshOutcome::succeeded()));

        let tracker = TokenTracker::new(Arc::new(api), Arc::new(clock()));
        assert!(tracker.refresh().await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejection_is_fatal_auth_error() {
        let mut api = MockRemoteApi::new();
        api.expect_refresh_token()
            .times(1)
            .returning(|| Ok(TokenRefreshOutcome::rejected("invalid_grant")));

        let tracker = TokenTracker::new(Arc::new(api), Arc::new(clock()));
        let err = tracker.refresh().await.unwrap_err();

        assert_eq!(err, RemoteError::auth("invalid_grant"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_refresh_network_error_stays_retryable() {
        let mut api = MockRemoteApi::new();
        api.expect_refresh_token()
            .times(1)
            .returning(|| Err(RemoteError::connection("connection reset")));

        let tracker = TokenTracker::new(Arc::new(api), Arc::new(clock()));
        let err = tracker.refresh().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_needs_refresh_uses_clock() {
        let clock = clock();
        let tracker = TokenTracker::new(Arc::new(MockRemoteApi::new()), Arc::new(clock.clone()));
        let status = AuthStatus {
            authenticated: true,
            token_valid: true,
            expires_at: Some(clock.now() + chrono::Duration::minutes(10)),
            ..Default::default()
        };

        assert!(!tracker.needs_refresh(&status, Duration::from_secs(60)));
        clock.advance(Duration::from_secs(9 * 60 + 30));
        assert!(tracker.needs_refresh(&status, Duration::from_secs(60)));
    }
}
