//! Save/Load functionality for persisting simulation state
//!
//! The same `SaveData` snapshot can be written as JSON (serde_json, readable
//! and diffable) or as bincode (compact binary). Robot routes are runtime
//! state and are not saved; on load every robot is parked idle at the dock.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::components::{Booking, Court, Robot};
use crate::config::FacilityConfig;
use crate::error::SimError;
use crate::systems::JobQueue;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Virtual minutes since day zero
    pub time_minutes: f64,
    pub time_scale: f32,
    /// Layout the courts were built from
    pub facility: FacilityConfig,
    pub courts: Vec<Court>,
    pub bookings: Vec<Booking>,
    pub next_booking_id: u64,
    pub jobs: JobQueue,
    /// Public robot state, battery and counters
    pub robots: Vec<Robot>,
}

fn check_version(data: SaveData) -> Result<SaveData, SaveError> {
    if data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }
    Ok(data)
}

/// Write a snapshot as pretty-printed JSON
pub fn save_json<W: Write>(writer: W, data: &SaveData) -> Result<(), SaveError> {
    serde_json::to_writer_pretty(writer, data)?;
    Ok(())
}

/// Read a JSON snapshot
pub fn load_json<R: Read>(reader: R) -> Result<SaveData, SaveError> {
    check_version(serde_json::from_reader(reader)?)
}

/// Write a snapshot with bincode
pub fn save_binary<W: Write>(writer: W, data: &SaveData) -> Result<(), SaveError> {
    bincode::serialize_into(writer, data)?;
    Ok(())
}

/// Read a bincode snapshot
pub fn load_binary<R: Read>(reader: R) -> Result<SaveData, SaveError> {
    check_version(bincode::deserialize_from(reader)?)
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    /// The snapshot decoded but does not describe a consistent simulation
    Sim(SimError),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(e: serde_json::Error) -> Self {
        SaveError::Json(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl From<SimError> for SaveError {
    fn from(e: SimError) -> Self {
        SaveError::Sim(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Json(e) => write!(f, "JSON error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveError::Sim(e) => write!(f, "Invalid saved state: {}", e),
        }
    }
}

impl std::error::Error for SaveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SaveError::Io(e) => Some(e),
            SaveError::Json(e) => Some(e),
            SaveError::Bincode(e) => Some(e),
            SaveError::Sim(e) => Some(e),
            SaveError::VersionMismatch { .. } => None,
        }
    }
}
