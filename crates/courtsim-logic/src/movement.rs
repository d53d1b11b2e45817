//! Waypoint following without allocation.
//!
//! A `PathFollower` is a persistent per-robot record (position, facing and an
//! index into a waypoint slice). `advance` spends a distance budget along the
//! remaining waypoints:
//! 1. Head for `path[cursor]`
//! 2. If it is within the budget, snap onto it, spend the distance, bump the cursor
//! 3. Repeat with what is left of the budget
//! 4. Otherwise move partway toward it and stop
//!
//! The waypoint slice is never sliced, shifted or copied; the cursor is the
//! only thing that moves through it.

use crate::layout::Point;

/// Facing angle (radians) for travel from `from` toward `to`, `atan2(dx, dz)`.
pub fn facing(from: Point, to: Point) -> f32 {
    (to.x - from.x).atan2(to.z - from.z)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathFollower {
    pub position: Point,
    pub rotation: f32,
    /// Index of the next waypoint to reach.
    pub cursor: usize,
}

impl PathFollower {
    pub fn new(position: Point) -> Self {
        Self {
            position,
            rotation: 0.0,
            cursor: 0,
        }
    }

    /// Start over on a new path without touching position or facing.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// True once every waypoint of `path` has been reached. An empty path is
    /// already finished.
    pub fn is_done(&self, path: &[Point]) -> bool {
        self.cursor >= path.len()
    }

    pub fn remaining<'a>(&self, path: &'a [Point]) -> &'a [Point] {
        path.get(self.cursor..).unwrap_or(&[])
    }

    /// Move along `path` by at most `budget` meters. Returns the distance
    /// actually covered, which is less than `budget` only when the path ran out.
    pub fn advance(&mut self, path: &[Point], budget: f32) -> f32 {
        if !(budget > 0.0) {
            return 0.0;
        }

        let mut left = budget;
        let mut moved = 0.0;

        while let Some(&target) = path.get(self.cursor) {
            let dx = target.x - self.position.x;
            let dz = target.z - self.position.z;
            let dist = (dx * dx + dz * dz).sqrt();

            if dist > 0.0 {
                self.rotation = dx.atan2(dz);
            }

            if dist <= left {
                self.position = target;
                self.cursor += 1;
                moved += dist;
                left -= dist;
            } else {
                let t = left / dist;
                self.position.x += dx * t;
                self.position.z += dz * t;
                moved += left;
                break;
            }
        }

        moved
    }
}
