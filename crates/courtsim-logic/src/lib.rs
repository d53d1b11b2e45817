//! Pure facility geometry for CourtSim.
//!
//! This crate contains everything about the facility that is independent of
//! simulation state: where courts are, how robots route between them, and how
//! a robot advances along a waypoint list. Functions take plain data and return
//! results, so they are unit-testable without an engine or an RNG.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`constants`] | Court dimensions and default tuning values |
//! | [`layout`] | Court grid, world coordinates, court ids, aisles |
//! | [`movement`] | Allocation-free waypoint following |
//! | [`pathfinding`] | Aisle routing and lawnmower cleaning sweeps with a route cache |

pub mod constants;
pub mod layout;
pub mod movement;
pub mod pathfinding;

pub use layout::{court_id, parse_court_id, FacilityLayout, LayoutError, Point};
pub use movement::PathFollower;
pub use pathfinding::{path_length, CleaningPattern, CleaningRoute, Pathfinder};
