//! The decision pipeline: per-connection metrics, risk scoring, weighted
//! ranking with reason selection, and the final summary composition.
//!
//! Everything here is synchronous and side-effect free over its inputs;
//! each call builds fresh results from the connection list it is given.

pub mod metrics;
pub mod ranking;
pub mod risk;
pub mod summary;
pub mod types;

pub use summary::compose_summary;
