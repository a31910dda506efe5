//! Periodic health probing
//!
//! The prober is a Tokio task that fetches a [`HealthReport`] on a timer and
//! hands each result to a [`ProbeSink`]. It owns no connection state: the
//! sink decides whether a report keeps the connection up and tells the
//! prober whether to continue.
//!
//! [`HealthReport`]: crate::api::HealthReport

mod prober;

pub use prober::{ProbeSink, ProberHandle, spawn_prober};
