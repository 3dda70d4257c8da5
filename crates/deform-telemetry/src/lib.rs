//! # deform-telemetry
//!
//! Event bus for solver diagnostics. The solver emits structured events
//! (precomputation, per-step timings, strategy switches) that are consumed
//! by pluggable sinks.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, SimulationEvent};
pub use sinks::{EventSink, TracingSink, VecSink};
