//! From trait implementations for error conversions

use super::remote::RemoteError;
use super::types::TetherError;

impl From<std::io::Error> for TetherError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::timeout(error.to_string());
        }
        if error.is_connect() {
            return Self::connection(error.to_string());
        }
        if error.is_decode() {
            return Self::protocol(error.to_string());
        }
        if let Some(status) = error.status() {
            return Self::server(status.as_u16(), error.to_string());
        }
        if error.is_builder() {
            return Self::invalid_request(error.to_string());
        }
        // Body/request failures mid-flight look like dropped connections
        Self::connection(error.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(error: serde_json::Error) -> Self {
        Self::protocol(error.to_string())
    }
}
