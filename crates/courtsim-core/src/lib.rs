//! CourtSim Core - Court Facility Simulation Engine
//!
//! A deterministic simulation of a pickleball facility: bookings wear courts
//! down, worn courts queue cleaning jobs, and a fleet of battery-powered
//! robots drives out along the aisles to sweep them.
//!
//! # Architecture
//!
//! - **Components**: Plain data (courts, bookings, jobs, robots)
//! - **Systems**: The court lifecycle store, the job queue and the robot fleet.
//!   Robots are entities in a `hecs` world.
//! - **Engine**: Owns everything, runs lifecycle → robots → assignment
//!
//! All randomness comes from one seeded RNG, so the same config and inputs
//! always produce the same run.
//!
//! # Example
//!
//! ```rust,no_run
//! use courtsim_core::prelude::*;
//!
//! let mut engine = SimulationEngine::new(SimConfig::default()).unwrap();
//! engine.generate_schedule();
//!
//! // Run simulation: one real second per frame at 60x
//! engine.set_time_scale(60.0);
//! loop {
//!     engine.advance(1.0 / 60.0);
//!     for event in engine.drain_events() {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod clock;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod generation;
pub mod persistence;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{FacilityConfig, SimConfig};
    pub use crate::engine::SimulationEngine;
    pub use crate::error::SimError;
    pub use crate::events::SimEvent;
    pub use crate::systems::FacilityStats;
}
