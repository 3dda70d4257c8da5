//! Pluggable event sinks.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::Level;

use crate::events::SimulationEvent;

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SimulationEvent);

    /// Called when the owner shuts down. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Collects events into a shared `Vec` for testing and inspection.
///
/// The sink is usually boxed into a bus; keep a clone (or a
/// [`VecSink::shared`] handle) to read what it collected.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<SimulationEvent>>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected events.
    pub fn shared(&self) -> Arc<Mutex<Vec<SimulationEvent>>> {
        Arc::clone(&self.events)
    }

    /// Snapshot of the events collected so far.
    pub fn events(&self) -> Vec<SimulationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// Logs events through `tracing` at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        let (step, kind) = (event.step, &event.kind);
        if self.level == Level::ERROR {
            tracing::error!(step, event = ?kind, "simulation_event");
        } else if self.level == Level::WARN {
            tracing::warn!(step, event = ?kind, "simulation_event");
        } else if self.level == Level::INFO {
            tracing::info!(step, event = ?kind, "simulation_event");
        } else if self.level == Level::DEBUG {
            tracing::debug!(step, event = ?kind, "simulation_event");
        } else {
            tracing::trace!(step, event = ?kind, "simulation_event");
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
