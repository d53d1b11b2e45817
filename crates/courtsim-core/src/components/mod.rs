//! Component definitions for the simulation.
//!
//! Components are pure data structs. They have no behavior beyond small
//! helpers - state transitions live in systems.

mod court;
mod job;
mod robot;

pub use court::*;
pub use job::*;
pub use robot::*;
