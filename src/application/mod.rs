//! Application layer - Use cases and port interfaces
//!
//! Contains the core business operations and trait definitions
//! for external system interactions.

pub mod orchestrator;
pub mod ports;

pub use orchestrator::{
    CoreError, Orchestrator, OrchestratorConfig, RecordingOutcome, SubmitError,
};
