//! HTTP/JSON client for the remote integration server

use super::RemoteApi;
use super::types::{
    AuthStatus, CreateRecordParams, HealthReport, HealthStatus, RecordResult, SearchParams,
    SearchResult, TokenRefreshOutcome, ToolDescriptor, UpdateRecordParams,
};
use crate::clock::{Clock, SystemClock};
use crate::config::{HttpConfig, ServerConfig};
use crate::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fields of the health document that are not copied into the detail bag
const HEALTH_RESERVED_FIELDS: [&str; 4] = ["status", "timestamp", "services", "subsystems"];

/// Longest error body echoed back in an error message
const MAX_ERROR_BODY: usize = 256;

/// HTTP implementation of [`RemoteApi`]
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    client: Client,
    base: Url,
    clock: Arc<dyn Clock>,
}

impl HttpRemoteApi {
    /// Build a client for `server` with transport settings from `http`
    pub fn new(server: &ServerConfig, http: &HttpConfig) -> RemoteResult<Self> {
        let base = Url::parse(&server.url).map_err(|e| {
            RemoteError::invalid_request(format!("Invalid server URL '{}': {}", server.url, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &http.api_token {
            let mut value = HeaderValue::try_from(format!("Bearer {token}"))
                .map_err(|_| RemoteError::invalid_request("API token is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        for (key, value) in &http.headers {
            match (HeaderName::try_from(key), HeaderValue::try_from(value)) {
                (Ok(name), Ok(val)) => {
                    headers.insert(name, val);
                }
                _ => warn!(header = %key, "Skipping invalid HTTP header"),
            }
        }

        let client = Client::builder()
            .timeout(http.request_timeout)
            .connect_timeout(http.connect_timeout)
            .user_agent(concat!("tether/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                RemoteError::invalid_request(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base,
            clock: Arc::new(SystemClock),
        })
    }

    /// Use `clock` to stamp health reports that carry no timestamp
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL with `segments` appended, each percent-encoded
    fn endpoint(&self, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::invalid_request(format!("'{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> RemoteResult<T> {
        let response = request.send().await?;
        let status = response.status();
        debug!(operation, status = status.as_u16(), "Remote response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), operation, &body));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RemoteError::protocol(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn reachable(&self, url: &str) -> RemoteResult<bool> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "Reachability probe");
        Ok(!status.is_server_error())
    }

    async fn get_health(&self) -> RemoteResult<HealthReport> {
        let url = self.endpoint(&["health"])?;
        let body: Value = self.send_json(self.client.get(url), "health").await?;
        decode_health(body, self.clock.now())
    }

    async fn get_tools(&self) -> RemoteResult<Vec<ToolDescriptor>> {
        let url = self.endpoint(&["tools"])?;
        let body: Value = self.send_json(self.client.get(url), "tools").await?;
        decode_tools(body)
    }

    async fn get_oauth_status(&self) -> RemoteResult<AuthStatus> {
        let url = self.endpoint(&["oauth", "status"])?;
        self.send_json(self.client.get(url), "oauth status").await
    }

    async fn refresh_token(&self) -> RemoteResult<TokenRefreshOutcome> {
        let url = self.endpoint(&["oauth", "refresh"])?;
        self.send_json(self.client.post(url), "oauth refresh").await
    }

    async fn search_records(&self, params: SearchParams) -> RemoteResult<SearchResult> {
        require("module", &params.module)?;
        let url = self.endpoint(&["crm", "search"])?;
        self.send_json(self.client.post(url).json(&params), "search records")
            .await
    }

    async fn create_record(&self, params: CreateRecordParams) -> RemoteResult<RecordResult> {
        require("module", &params.module)?;
        let url = self.endpoint(&["crm", &params.module])?;
        self.send_json(self.client.post(url).json(&params.data), "create record")
            .await
    }

    async fn update_record(&self, params: UpdateRecordParams) -> RemoteResult<RecordResult> {
        require("module", &params.module)?;
        require("record id", &params.id)?;
        let url = self.endpoint(&["crm", &params.module, &params.id])?;
        self.send_json(self.client.put(url).json(&params.data), "update record")
            .await
    }

    async fn delete_record(&self, module: &str, id: &str) -> RemoteResult<RecordResult> {
        require("module", module)?;
        require("record id", id)?;
        let url = self.endpoint(&["crm", module, id])?;
        self.send_json(self.client.delete(url), "delete record").await
    }
}

fn require(field: &str, value: &str) -> RemoteResult<()> {
    if value.trim().is_empty() {
        return Err(RemoteError::invalid_request(format!("{field} is required")));
    }
    Ok(())
}

/// Map a non-success HTTP status onto the error taxonomy
pub fn status_error(status: u16, operation: &str, body: &str) -> RemoteError {
    let detail = error_detail(body);
    let message = if detail.is_empty() {
        format!("{operation} failed with HTTP {status}")
    } else {
        format!("{operation} failed with HTTP {status}: {detail}")
    };

    match status {
        401 | 403 => RemoteError::auth(message),
        400..=499 => RemoteError::invalid_request(message),
        _ => RemoteError::server(status, message),
    }
}

/// Pull a human-readable message out of an error body
fn error_detail(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(Value::String(text)) = map.get(key) {
                return text.clone();
            }
        }
    }
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Decode the server's health document
///
/// `services` entries may be booleans, objects with a `status` label, or
/// objects of booleans (healthy when every flag is true).
pub fn decode_health(body: Value, now: DateTime<Utc>) -> RemoteResult<HealthReport> {
    let Value::Object(mut map) = body else {
        return Err(RemoteError::protocol("health: expected a JSON object"));
    };

    let status = map
        .get("status")
        .and_then(Value::as_str)
        .map(HealthStatus::from_label)
        .unwrap_or(HealthStatus::Unhealthy);

    let timestamp = map
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(now);

    let mut report = HealthReport::new(status, timestamp);

    for key in ["services", "subsystems"] {
        if let Some(Value::Object(services)) = map.get(key) {
            for (name, entry) in services {
                report.subsystems.insert(name.clone(), subsystem_healthy(entry));
            }
        }
    }

    for key in HEALTH_RESERVED_FIELDS {
        map.remove(key);
    }
    report.details.extend(map);

    Ok(report)
}

fn subsystem_healthy(entry: &Value) -> bool {
    match entry {
        Value::Bool(flag) => *flag,
        Value::String(label) => HealthStatus::from_label(label) == HealthStatus::Healthy,
        Value::Object(fields) => match fields.get("status") {
            Some(Value::String(label)) => {
                HealthStatus::from_label(label) == HealthStatus::Healthy
            }
            Some(Value::Bool(flag)) => *flag,
            _ => fields.values().all(|v| v.as_bool() == Some(true)),
        },
        _ => false,
    }
}

/// Accept RFC 3339, or a naive ISO timestamp interpreted as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Decode a tool listing: either a bare array or `{"tools": [...]}`
pub fn decode_tools(body: Value) -> RemoteResult<Vec<ToolDescriptor>> {
    let list = match body {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map
            .remove("tools")
            .ok_or_else(|| RemoteError::protocol("tools: missing 'tools' field"))?,
        _ => return Err(RemoteError::protocol("tools: expected an array or object")),
    };
    serde_json::from_value(list).map_err(|e| RemoteError::protocol(format!("tools: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 27, 13, 47, 20).unwrap()
    }

    #[test]
    fn test_decode_health_document() {
        let body = json!({
            "status": "degraded",
            "timestamp": "2025-09-27T13:40:00.123456",
            "services": {
                "key_vault": {"status": "unhealthy", "vault_url": "https://vault"},
                "zoho_credentials": {"client_id": true, "client_secret": true, "refresh_token": false},
                "cache": true
            },
            "version": "2.0.0",
            "server": "zoho-crm"
        });

        let report = decode_health(body, now()).unwrap();

        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.subsystems.get("key_vault"), Some(&false));
        assert_eq!(report.subsystems.get("zoho_credentials"), Some(&false));
        assert_eq!(report.subsystems.get("cache"), Some(&true));
        assert_eq!(report.details.get("version"), Some(&json!("2.0.0")));
        assert!(!report.details.contains_key("services"));
        assert_eq!(
            report.timestamp,
            Utc.with_ymd_and_hms(2025, 9, 27, 13, 40, 0).unwrap()
                + chrono::Duration::microseconds(123_456)
        );
    }

    #[test]
    fn test_decode_health_defaults() {
        let report = decode_health(json!({"status": "ok"}), now()).unwrap();
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.timestamp, now());
        assert!(report.subsystems.is_empty());

        let missing = decode_health(json!({}), now()).unwrap();
        assert_eq!(missing.status, HealthStatus::Unhealthy);

        let err = decode_health(json!(["healthy"]), now()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_decode_tools_shapes() {
        let bare = decode_tools(json!([{"name": "search_records"}])).unwrap();
        assert_eq!(bare, vec![ToolDescriptor::new("search_records")]);

        let wrapped = decode_tools(json!({
            "tools": [{"name": "create_record", "description": "Create", "inputSchema": {"type": "object"}}]
        }))
        .unwrap();
        assert_eq!(wrapped[0].description.as_deref(), Some("Create"));
        assert!(wrapped[0].input_schema.is_some());

        assert_eq!(
            decode_tools(json!({"items": []})).unwrap_err().kind(),
            ErrorKind::Protocol
        );
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(
            status_error(503, "health", "").kind(),
            ErrorKind::Server
        );
        assert!(status_error(502, "health", "").is_retryable());
        assert_eq!(
            status_error(401, "oauth refresh", r#"{"error": "invalid_grant"}"#),
            RemoteError::auth("oauth refresh failed with HTTP 401: invalid_grant")
        );
        assert_eq!(
            status_error(404, "tools", "not here").kind(),
            ErrorKind::InvalidRequest
        );
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let server = ServerConfig {
            name: "crm".into(),
            url: "http://localhost:8001/api/".into(),
        };
        let api = HttpRemoteApi::new(&server, &HttpConfig::default()).unwrap();

        let url = api.endpoint(&["crm", "Leads", "a b"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8001/api/crm/Leads/a%20b");
    }

    #[test]
    fn test_invalid_server_url() {
        let server = ServerConfig {
            name: "crm".into(),
            url: "not a url".into(),
        };
        let err = HttpRemoteApi::new(&server, &HttpConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
