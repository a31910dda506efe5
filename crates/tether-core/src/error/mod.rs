//! Error types for Tether
//!
//! Two layers:
//! - [`RemoteError`]: a tagged error for every call that crosses the remote
//!   server boundary. Its [`ErrorKind`] drives the retry classifier.
//! - [`TetherError`]: crate-level errors (configuration, logging setup, I/O)
//!   that wrap a [`RemoteError`] when one escapes.

mod conversions;
mod remote;
mod types;

pub use remote::{ErrorKind, RemoteError, RemoteResult};
pub use types::{TetherError, TetherResult};
