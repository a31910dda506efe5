//! Payload types exchanged with the remote integration server

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

/// Aggregate health of the remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Map a free-form status label onto the three aggregate states
    ///
    /// `healthy` and `ok` are healthy, `degraded` is degraded, anything
    /// else (including an empty label) is unhealthy.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "healthy" | "ok" => Self::Healthy,
            "degraded" => Self::Degraded,
            _ => Self::Unhealthy,
        }
    }

    /// Whether a connection may stay up with this status
    pub fn is_acceptable(self, accept_degraded: bool) -> bool {
        match self {
            Self::Healthy => true,
            Self::Degraded => accept_degraded,
            Self::Unhealthy => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one health probe
///
/// Immutable once produced; the connection manager swaps whole reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Aggregate status
    pub status: HealthStatus,
    /// Per-subsystem health
    #[serde(default)]
    pub subsystems: BTreeMap<String, bool>,
    /// Free-form counters and metadata reported by the server
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
    /// When the probe was taken
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn new(status: HealthStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            status,
            subsystems: BTreeMap::new(),
            details: BTreeMap::new(),
            timestamp,
        }
    }

    /// Record the health of one subsystem
    pub fn with_subsystem(mut self, name: impl Into<String>, healthy: bool) -> Self {
        self.subsystems.insert(name.into(), healthy);
        self
    }

    /// Attach a detail entry
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Names of subsystems reporting unhealthy
    pub fn failing_subsystems(&self) -> Vec<&str> {
        self.subsystems
            .iter()
            .filter(|(_, healthy)| !**healthy)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// One-line description suitable for an error message
    pub fn summary(&self) -> String {
        let failing = self.failing_subsystems();
        if failing.is_empty() {
            format!("server reported {}", self.status)
        } else {
            format!("server reported {} (failing: {})", self.status, failing.join(", "))
        }
    }
}

/// OAuth credential status as seen by the remote server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(alias = "token_valid")]
    pub token_valid: bool,
    #[serde(alias = "expires_at", alias = "expiry")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scopes; accepts a list or a space-delimited string
    #[serde(alias = "scope", deserialize_with = "deserialize_scopes")]
    pub scopes: BTreeSet<String>,
    pub error: Option<String>,
    /// Server is running with elevated/bypass credentials
    #[serde(alias = "elevated")]
    pub bypass: bool,
}

impl AuthStatus {
    /// Status reported when no credential is present
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Whether the expiry has passed at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    /// Token validity with expiry taking precedence over the reported flag
    pub fn is_token_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.token_valid && !self.is_expired_at(now)
    }

    /// Whether an authenticated token expires within `window` of `now`
    pub fn needs_refresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        if !self.authenticated {
            return false;
        }
        let Some(expiry) = self.expires_at else {
            return false;
        };
        let window = ChronoDuration::from_std(window).unwrap_or(ChronoDuration::zero());
        match now.checked_add_signed(window) {
            Some(horizon) => expiry <= horizon,
            None => true,
        }
    }

    /// Copy of this status with `token_valid` cleared if expired at `now`
    pub fn normalized(mut self, now: DateTime<Utc>) -> Self {
        if self.is_expired_at(now) {
            self.token_valid = false;
        }
        self
    }
}

fn deserialize_scopes<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scopes {
        List(Vec<String>),
        Delimited(String),
        Missing(()),
    }

    Ok(match Scopes::deserialize(deserializer)? {
        Scopes::List(list) => list.into_iter().collect(),
        Scopes::Delimited(s) => s
            .split(|c: char| c == ' ' || c == ',')
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        Scopes::Missing(()) => BTreeSet::new(),
    })
}

/// A tool advertised by the remote server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        alias = "inputSchema",
        alias = "parameters",
        skip_serializing_if = "Option::is_none"
    )]
    pub input_schema: Option<Value>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Answer to a token refresh request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenRefreshOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenRefreshOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// CRM search request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParams {
    /// CRM module, e.g. `Leads` or `Contacts`
    pub module: String,
    /// Server-side criteria expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
    /// Free-text search word
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl SearchParams {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn with_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.criteria = Some(criteria.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }
}

/// CRM search response envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
    #[serde(alias = "total_count", skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(alias = "has_more", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Record creation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateRecordParams {
    pub module: String,
    pub data: serde_json::Map<String, Value>,
}

impl CreateRecordParams {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Record update request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecordParams {
    pub module: String,
    pub id: String,
    pub data: serde_json::Map<String, Value>,
}

impl UpdateRecordParams {
    pub fn new(module: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            id: id.into(),
            data: serde_json::Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Create/update/delete response envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 27, hour, min, 0).unwrap()
    }

    #[test]
    fn test_health_status_labels() {
        assert_eq!(HealthStatus::from_label("healthy"), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_label("OK"), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_label("degraded"), HealthStatus::Degraded);
        assert_eq!(HealthStatus::from_label("down"), HealthStatus::Unhealthy);
        assert_eq!(HealthStatus::from_label(""), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_health_status_acceptance() {
        assert!(HealthStatus::Healthy.is_acceptable(false));
        assert!(!HealthStatus::Degraded.is_acceptable(false));
        assert!(HealthStatus::Degraded.is_acceptable(true));
        assert!(!HealthStatus::Unhealthy.is_acceptable(true));
    }

    #[test]
    fn test_health_report_summary() {
        let report = HealthReport::new(HealthStatus::Degraded, at(13, 0))
            .with_subsystem("key_vault", true)
            .with_subsystem("zoho_credentials", false);

        assert_eq!(report.failing_subsystems(), vec!["zoho_credentials"]);
        assert_eq!(
            report.summary(),
            "server reported degraded (failing: zoho_credentials)"
        );
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let status = AuthStatus {
            authenticated: true,
            token_valid: true,
            expires_at: Some(at(12, 0)),
            ..Default::default()
        };

        assert!(status.is_token_valid_at(at(11, 59)));
        assert!(!status.is_token_valid_at(at(12, 0)));
        assert!(!status.clone().normalized(at(12, 30)).token_valid);
        assert!(status.normalized(at(11, 0)).token_valid);
    }

    #[test]
    fn test_needs_refresh_window() {
        let status = AuthStatus {
            authenticated: true,
            token_valid: true,
            expires_at: Some(at(12, 0)),
            ..Default::default()
        };
        let window = Duration::from_secs(60);

        assert!(!status.needs_refresh(at(11, 58), window));
        assert!(status.needs_refresh(at(11, 59), window));
        assert!(status.needs_refresh(at(12, 5), window));

        let no_expiry = AuthStatus {
            expires_at: None,
            ..status.clone()
        };
        assert!(!no_expiry.needs_refresh(at(12, 5), window));

        let signed_out = AuthStatus {
            authenticated: false,
            ..status
        };
        assert!(!signed_out.needs_refresh(at(12, 5), window));
    }

    #[test]
    fn test_auth_status_wire_format() {
        let status: AuthStatus = serde_json::from_str(
            r#"{
                "authenticated": true,
                "tokenValid": true,
                "expiresAt": "2025-09-27T12:00:00Z",
                "scope": "ZohoCRM.modules.ALL ZohoCRM.settings.READ"
            }"#,
        )
        .unwrap();

        assert!(status.authenticated);
        assert_eq!(status.expires_at, Some(at(12, 0)));
        assert_eq!(status.scopes.len(), 2);
        assert!(status.scopes.contains("ZohoCRM.modules.ALL"));
        assert!(!status.bypass);

        let snake: AuthStatus = serde_json::from_str(
            r#"{"authenticated": false, "token_valid": false, "scopes": ["a"], "elevated": true}"#,
        )
        .unwrap();
        assert!(snake.bypass);
        assert_eq!(snake.scopes.len(), 1);
    }

    #[test]
    fn test_search_result_envelope() {
        let result: SearchResult = serde_json::from_str(
            r#"{"success": true, "data": [{"id": "1"}], "total_count": 41, "hasMore": true}"#,
        )
        .unwrap();

        assert!(result.success);
        assert_eq!(result.data.as_ref().map(Vec::len), Some(1));
        assert_eq!(result.total_count, Some(41));
        assert_eq!(result.has_more, Some(true));
    }
}
