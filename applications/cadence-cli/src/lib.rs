//! Cadence CLI - simulated listening sessions
//!
//! Drives the `cadence-session` engine against an in-process simulated media
//! resource, for trying out queue, loop and skip-quota behaviour without a
//! real player.

pub mod config;
pub mod error;
pub mod simulated;
pub mod simulation;

pub use config::{CliConfig, SimulationSettings};
pub use error::{CliError, Result};
pub use simulated::SimulatedResource;
pub use simulation::{SimulationOptions, SimulationReport};
