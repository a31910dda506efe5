//! OAuth token tracking
//!
//! The delegated credential lives on the remote server; this module only
//! observes its status and asks the server to refresh it.

mod tracker;

pub use tracker::TokenTracker;
