//! # Trigger Orchestration
//!
//! The inbound-command pipeline ([`TriggerOrchestrator`]) and the service
//! that runs it concurrently ([`TelemetryRelay`]).
//!
//! External collaborators (directory, positioning, carrier, companion link)
//! are trait objects so that production bindings and the simulation
//! collaborators in [`crate::simulation`] plug in the same way.

pub mod relay;
pub mod trigger_orchestrator;
pub mod types;

pub use relay::TelemetryRelay;
pub use trigger_orchestrator::{Collaborators, OrchestratorSettings, TriggerOrchestrator};
pub use types::{CarrierChannel, GateRejection, PositioningProvider, TriggerOutcome};
