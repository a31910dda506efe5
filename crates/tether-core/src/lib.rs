//! Tether Core Library
//!
//! Keeps a logical connection to a remote MCP integration server alive,
//! truthful, and observable: connection state transitions, periodic health
//! probing, OAuth token tracking, bounded retry with error classification,
//! and supervised auto-reconnect.
//!
//! # Example
//! ```no_run
//! use tether_core::{ConfigLoader, ConnectionService, logging};
//!
//! # async fn run() -> tether_core::TetherResult<()> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("tether.toml")
//!     .with_env()
//!     .load()?;
//! logging::init(&config.logging)?;
//!
//! let service = ConnectionService::start(config).await?;
//! let mut status = service.manager().subscribe_status();
//! while status.changed().await.is_ok() {
//!     println!("status: {}", *status.borrow());
//! }
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod connection;
pub mod error;
pub mod health;
pub mod logging;
pub mod recovery;
pub mod service;
pub mod supervisor;

// Re-export commonly used types
pub use api::{AuthStatus, HealthReport, HealthStatus, HttpRemoteApi, RemoteApi, ToolDescriptor};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigLoader, TetherConfig};
pub use connection::{
    ConnectionEvent, ConnectionManager, ConnectionSnapshot, ConnectionStatus, ServerDescriptor,
};
pub use error::{ErrorKind, RemoteError, RemoteResult, TetherError, TetherResult};
pub use recovery::{CircuitState, RetryConfig, RetryPolicy};
pub use service::ConnectionService;
pub use supervisor::{ReconnectSupervisor, SupervisorEvent, SupervisorHandle};
