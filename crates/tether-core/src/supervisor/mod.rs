//! Auto-reconnect supervision
//!
//! The supervisor watches a [`ConnectionManager`](crate::connection::ConnectionManager)
//! and, while its status is `error`, schedules reconnect attempts up to a
//! configured ceiling. At most one attempt is pending at a time, a pending
//! attempt is abandoned when the status leaves `error`, and the attempt
//! counter resets when the connection comes back.

mod reconnect;

pub use reconnect::{ReconnectSupervisor, SupervisorEvent, SupervisorHandle};
