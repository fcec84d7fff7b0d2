//! Observability for provider steps.
//!
//! With the `tracing` feature each step runs inside an `acr_auth.flow` span carrying `flow` and
//! `stage` fields, and identity refreshes and completed exchanges emit events. With the
//! `metrics` feature every step increments `acr_auth_flow_total{flow, outcome}` and
//! [`GlobalMetricsSink`] records `acr_auth_exchange_duration_seconds{registry}`. Without either
//! feature everything here compiles to no-ops.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;
