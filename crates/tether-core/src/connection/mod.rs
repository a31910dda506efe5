//! Connection state machine, event history, and record passthroughs

mod history;
mod manager;
mod records;
mod types;

pub use history::EventHistory;
pub use manager::ConnectionManager;
pub use types::{ConnectionEvent, ConnectionSnapshot, ConnectionStatus, ServerDescriptor};
