//! Connection state types

use crate::api::{AuthStatus, HealthReport, ToolDescriptor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Authoritative status of the logical connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and live status of the remote server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub name: String,
    pub url: String,
    pub status: ConnectionStatus,
    /// Last successful probe or connect
    pub last_ping: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Names of the tools discovered on connect
    pub capabilities: BTreeSet<String>,
}

impl ServerDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            status: ConnectionStatus::Disconnected,
            last_ping: None,
            last_error: None,
            capabilities: BTreeSet::new(),
        }
    }
}

/// A recorded status transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub timestamp: DateTime<Utc>,
    pub from: ConnectionStatus,
    pub status: ConnectionStatus,
    pub message: Option<String>,
}

/// Consistent copy of everything the manager knows, taken under one lock
#[derive(Debug, Clone)]
pub struct ConnectionSnapshot {
    pub descriptor: ServerDescriptor,
    pub health: Option<Arc<HealthReport>>,
    pub auth: Option<AuthStatus>,
    pub tools: Vec<ToolDescriptor>,
    pub history: Vec<ConnectionEvent>,
    pub probing: bool,
}

impl ConnectionSnapshot {
    pub fn status(&self) -> ConnectionStatus {
        self.descriptor.status
    }
}
