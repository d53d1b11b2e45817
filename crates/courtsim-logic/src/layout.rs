//! Facility layout: court grid geometry, court ids and aisles.
//!
//! Courts are left-aligned: column `c` of every row starts at the same x.
//! Rows run along +x and are stacked along +z. Each row has an aisle in front
//! of it (lower z) and the last row has a closing aisle behind it, so there
//! are `rows + 1` row aisles. Column aisles run along z in the gaps between
//! courts, plus one on the far left and one past the longest row.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::constants::{COURT_LENGTH, COURT_WIDTH, MAX_SPACING};

/// A floor position in world space (meters). `y` is up and never used here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub z: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, z: 0.0 };

    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn approx_eq(&self, other: &Point, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.z - other.z).abs() <= epsilon
    }
}

/// Format the id of the court at (row, col).
pub fn court_id(row: u32, col: u32) -> String {
    format!("{}-{}", row, col)
}

/// Parse a court id back into (row, col).
///
/// Only canonical ids are accepted (`"1-2"`, not `"01-2"` or `" 1-2"`), so
/// `parse_court_id(&court_id(r, c)) == Some((r, c))` and the reverse holds too.
pub fn parse_court_id(id: &str) -> Option<(u32, u32)> {
    let (row, col) = id.split_once('-')?;
    let row: u32 = row.parse().ok()?;
    let col: u32 = col.parse().ok()?;
    if court_id(row, col) == id {
        Some((row, col))
    } else {
        None
    }
}

/// Invalid facility shape, rejected when the layout is built.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    NoRows,
    EmptyRow { row: u32 },
    InvalidSpacing(f32),
    SpacingTooLarge { spacing: f32, max: f32 },
    InvalidDock(Point),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::NoRows => write!(f, "facility must have at least one row"),
            LayoutError::EmptyRow { row } => write!(f, "row {} has no courts", row),
            LayoutError::InvalidSpacing(s) => write!(f, "invalid court spacing: {}", s),
            LayoutError::SpacingTooLarge { spacing, max } => {
                write!(f, "court spacing {} exceeds {} m", spacing, max)
            }
            LayoutError::InvalidDock(p) => {
                write!(f, "invalid dock position: ({}, {})", p.x, p.z)
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// Static description of the court grid and the robot dock.
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityLayout {
    columns_per_row: Vec<u32>,
    spacing: f32,
    court_width: f32,
    court_length: f32,
    dock_position: Point,
}

impl FacilityLayout {
    /// Build a layout with regulation court dimensions.
    pub fn new(
        columns_per_row: Vec<u32>,
        spacing: f32,
        dock_position: Point,
    ) -> Result<Self, LayoutError> {
        if columns_per_row.is_empty() {
            return Err(LayoutError::NoRows);
        }
        if let Some(row) = columns_per_row.iter().position(|&c| c == 0) {
            return Err(LayoutError::EmptyRow { row: row as u32 });
        }
        if !spacing.is_finite() || spacing < 0.0 {
            return Err(LayoutError::InvalidSpacing(spacing));
        }
        if spacing > MAX_SPACING {
            return Err(LayoutError::SpacingTooLarge {
                spacing,
                max: MAX_SPACING,
            });
        }
        if !dock_position.x.is_finite() || !dock_position.z.is_finite() {
            return Err(LayoutError::InvalidDock(dock_position));
        }
        Ok(Self {
            columns_per_row,
            spacing,
            court_width: COURT_WIDTH,
            court_length: COURT_LENGTH,
            dock_position,
        })
    }

    /// Uniform grid: `rows` rows of `columns` courts each.
    pub fn grid(
        rows: u32,
        columns: u32,
        spacing: f32,
        dock_position: Point,
    ) -> Result<Self, LayoutError> {
        Self::new(vec![columns; rows as usize], spacing, dock_position)
    }

    pub fn rows(&self) -> u32 {
        self.columns_per_row.len() as u32
    }

    pub fn columns_per_row(&self) -> &[u32] {
        &self.columns_per_row
    }

    /// Number of courts in `row`, `None` if the row does not exist.
    pub fn columns(&self, row: u32) -> Option<u32> {
        self.columns_per_row.get(row as usize).copied()
    }

    pub fn max_columns(&self) -> u32 {
        self.columns_per_row.iter().copied().max().unwrap_or(0)
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn court_width(&self) -> f32 {
        self.court_width
    }

    pub fn court_length(&self) -> f32 {
        self.court_length
    }

    pub fn dock_position(&self) -> Point {
        self.dock_position
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        self.columns(row).map(|cols| col < cols).unwrap_or(false)
    }

    pub fn court_count(&self) -> usize {
        self.columns_per_row.iter().map(|&c| c as usize).sum()
    }

    /// All (row, col) pairs in row-major order.
    pub fn courts(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.columns_per_row
            .iter()
            .enumerate()
            .flat_map(|(row, &cols)| (0..cols).map(move |col| (row as u32, col)))
    }

    /// Minimum (x, z) corner of the court rectangle.
    pub fn court_origin(&self, row: u32, col: u32) -> Point {
        Point::new(
            col as f32 * (self.court_width + self.spacing),
            row as f32 * (self.court_length + self.spacing),
        )
    }

    pub fn court_center(&self, row: u32, col: u32) -> Point {
        let origin = self.court_origin(row, col);
        Point::new(
            origin.x + self.court_width / 2.0,
            origin.z + self.court_length / 2.0,
        )
    }

    /// Where a robot waits before entering the court: mid-width, on the row
    /// aisle in front of the court.
    pub fn court_entrance(&self, row: u32, col: u32) -> Point {
        Point::new(self.court_center(row, col).x, self.row_aisle_z(row))
    }

    /// Centerline z of row aisle `index` (`0..=rows`). Aisle `r` is in front of row `r`.
    pub fn row_aisle_z(&self, index: u32) -> f32 {
        index as f32 * (self.court_length + self.spacing) - self.spacing / 2.0
    }

    /// Centerline x of column aisle `index` (`0..=max_columns`). Aisle `c` is left of column `c`.
    pub fn column_aisle_x(&self, index: u32) -> f32 {
        index as f32 * (self.court_width + self.spacing) - self.spacing / 2.0
    }

    pub fn nearest_row_aisle(&self, z: f32) -> u32 {
        let pitch = self.court_length + self.spacing;
        let index = ((z + self.spacing / 2.0) / pitch).round();
        index.clamp(0.0, self.rows() as f32) as u32
    }

    pub fn nearest_column_aisle(&self, x: f32) -> u32 {
        let pitch = self.court_width + self.spacing;
        let index = ((x + self.spacing / 2.0) / pitch).round();
        index.clamp(0.0, self.max_columns() as f32) as u32
    }

    /// Hash of every layout parameter. Two layouts with the same signature
    /// produce identical routes.
    pub fn signature(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.columns_per_row.hash(&mut hasher);
        self.spacing.to_bits().hash(&mut hasher);
        self.court_width.to_bits().hash(&mut hasher);
        self.court_length.to_bits().hash(&mut hasher);
        self.dock_position.x.to_bits().hash(&mut hasher);
        self.dock_position.z.to_bits().hash(&mut hasher);
        hasher.finish()
    }
}
