//! Connection lifecycle
//!
//! [`ConnectionService`] ties a [`ConnectionManager`] to its
//! [`ReconnectSupervisor`]: `start` connects and begins supervision,
//! `shutdown` stops supervision and disconnects.

use crate::api::{HttpRemoteApi, RemoteApi};
use crate::clock::{Clock, SystemClock};
use crate::config::TetherConfig;
use crate::connection::ConnectionManager;
use crate::error::TetherResult;
use crate::supervisor::{ReconnectSupervisor, SupervisorHandle};
use std::sync::Arc;
use tracing::{info, warn};

/// A supervised connection to one remote server
#[derive(Debug)]
pub struct ConnectionService {
    manager: ConnectionManager,
    supervisor: Option<SupervisorHandle>,
}

impl ConnectionService {
    /// Connect over HTTP using `config`
    ///
    /// Only configuration errors fail `start`. A failed initial connect
    /// leaves the manager in `error` for the supervisor to recover.
    pub async fn start(config: TetherConfig) -> TetherResult<Self> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let api = HttpRemoteApi::new(&config.server, &config.http)?.with_clock(clock.clone());
        Ok(Self::start_with(&config, Arc::new(api), clock).await)
    }

    /// Start with a caller-supplied API client and clock
    pub async fn start_with(
        config: &TetherConfig,
        api: Arc<dyn RemoteApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let manager = ConnectionManager::with_clock(config, api, clock);

        match manager.connect().await {
            Ok(()) => info!(server = %config.server.name, "Initial connection established"),
            Err(error) => warn!(server = %config.server.name, error = %error, "Initial connection failed"),
        }

        let supervisor = config
            .reconnect
            .enabled
            .then(|| ReconnectSupervisor::new(manager.clone(), &config.reconnect).spawn());

        Self {
            manager,
            supervisor,
        }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// `None` when auto-reconnect is disabled
    pub fn supervisor(&self) -> Option<&SupervisorHandle> {
        self.supervisor.as_ref()
    }

    /// Stop supervision, then disconnect
    pub async fn shutdown(self) {
        info!(server = %self.manager.server_name(), "Shutting down connection service");
        if let Some(supervisor) = &self.supervisor {
            supervisor.cancel();
        }
        // Aborts any reconnect the supervisor has in flight
        self.manager.disconnect().await;
        if let Some(supervisor) = self.supervisor {
            supervisor.shutdown().await;
        }
    }
}
