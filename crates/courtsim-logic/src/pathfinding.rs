//! Aisle routing and lawnmower cleaning sweeps.
//!
//! The facility is a regular grid with no dynamic obstacles, so routes are
//! built directly from the aisle structure instead of searching a graph:
//! step onto the nearest row aisle, switch rows along a column aisle if
//! needed, then follow the target row aisle to the destination. Each query is
//! O(1) and yields at most five waypoints.
//!
//! Cleaning sweeps depend only on court dimensions and the cleaning pattern,
//! so `Pathfinder` caches one route (plus its total length) per court. The
//! cache is keyed by the layout signature and dropped when the layout changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::constants::{DEFAULT_NET_CLEARANCE, DEFAULT_STRIPE_WIDTH};
use crate::layout::{FacilityLayout, Point};

/// Waypoints closer than this are treated as the same point.
const WAYPOINT_EPSILON: f32 = 1e-4;
/// Narrower stripes than this are widened to keep sweeps finite.
const MIN_STRIPE_WIDTH: f32 = 0.05;

/// Total polyline length of `path` when starting at `from`.
pub fn path_length(from: Point, path: &[Point]) -> f32 {
    let mut total = 0.0;
    let mut prev = from;
    for p in path {
        total += prev.distance(p);
        prev = *p;
    }
    total
}

/// Stripe geometry for in-court sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningPattern {
    /// Spacing between parallel stripes, meters.
    pub stripe_width: f32,
    /// Distance kept from the net and from the net posts, meters.
    pub net_clearance: f32,
}

impl Default for CleaningPattern {
    fn default() -> Self {
        Self {
            stripe_width: DEFAULT_STRIPE_WIDTH,
            net_clearance: DEFAULT_NET_CLEARANCE,
        }
    }
}

/// A complete sweep of one court. `waypoints[0]` is the court entrance, so
/// `length` is exactly the distance a robot covers from arrival to finish.
#[derive(Debug, Clone, PartialEq)]
pub struct CleaningRoute {
    pub waypoints: Vec<Point>,
    pub length: f32,
}

pub struct Pathfinder {
    layout: FacilityLayout,
    signature: u64,
    pattern: CleaningPattern,
    /// (row, col) → sweep. Bounded by the number of courts.
    cleaning_cache: HashMap<(u32, u32), CleaningRoute>,
}

impl Pathfinder {
    pub fn new(layout: FacilityLayout, pattern: CleaningPattern) -> Self {
        Self {
            signature: layout.signature(),
            layout,
            pattern,
            cleaning_cache: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &FacilityLayout {
        &self.layout
    }

    pub fn pattern(&self) -> CleaningPattern {
        self.pattern
    }

    /// Adopt `layout` if it differs from the current one. Returns true when
    /// the layout changed and cached routes were dropped.
    pub fn sync_layout(&mut self, layout: &FacilityLayout) -> bool {
        let signature = layout.signature();
        if signature == self.signature {
            return false;
        }
        self.layout = layout.clone();
        self.signature = signature;
        self.cleaning_cache.clear();
        true
    }

    /// Change the stripe geometry, dropping cached sweeps if it differs.
    pub fn set_pattern(&mut self, pattern: CleaningPattern) {
        if pattern != self.pattern {
            self.pattern = pattern;
            self.cleaning_cache.clear();
        }
    }

    pub fn cached_routes(&self) -> usize {
        self.cleaning_cache.len()
    }

    /// Route from `from` to the entrance of court (row, col). Empty when
    /// `from` is already at the entrance. `None` if the court does not exist.
    pub fn path_to_court_entrance(&self, from: Point, row: u32, col: u32) -> Option<Vec<Point>> {
        let mut out = Vec::with_capacity(5);
        self.path_to_court_entrance_into(from, row, col, &mut out)
            .then_some(out)
    }

    /// Like [`Pathfinder::path_to_court_entrance`] but writes into `out`,
    /// reusing its capacity. Returns false if the court does not exist.
    pub fn path_to_court_entrance_into(
        &self,
        from: Point,
        row: u32,
        col: u32,
        out: &mut Vec<Point>,
    ) -> bool {
        out.clear();
        if !self.layout.contains(row, col) {
            return false;
        }
        let entrance = self.layout.court_entrance(row, col);
        aisle_route_into(&self.layout, from, row, entrance, out);
        true
    }

    /// Route from `from` back to the dock.
    pub fn path_to_dock(&self, from: Point) -> Vec<Point> {
        let mut out = Vec::with_capacity(5);
        self.path_to_dock_into(from, &mut out);
        out
    }

    pub fn path_to_dock_into(&self, from: Point, out: &mut Vec<Point>) {
        out.clear();
        let dock = self.layout.dock_position();
        let dock_aisle = self.layout.nearest_row_aisle(dock.z);
        aisle_route_into(&self.layout, from, dock_aisle, dock, out);
    }

    /// Lawnmower sweep of court (row, col), computed once and cached.
    pub fn cleaning_path(&mut self, row: u32, col: u32) -> Option<&CleaningRoute> {
        if !self.layout.contains(row, col) {
            return None;
        }
        let layout = &self.layout;
        let pattern = self.pattern;
        Some(
            self.cleaning_cache
                .entry((row, col))
                .or_insert_with(|| build_cleaning_route(layout, pattern, row, col)),
        )
    }
}

fn push_waypoint(out: &mut Vec<Point>, cursor: &mut Point, p: Point) {
    if !cursor.approx_eq(&p, WAYPOINT_EPSILON) {
        out.push(p);
        *cursor = p;
    }
}

/// Row aisle → (column aisle → target row aisle) → along aisle → `dest`.
fn aisle_route_into(
    layout: &FacilityLayout,
    from: Point,
    target_aisle: u32,
    dest: Point,
    out: &mut Vec<Point>,
) {
    let mut cursor = from;
    let start_aisle = layout.nearest_row_aisle(from.z);
    let start_z = layout.row_aisle_z(start_aisle);
    let target_z = layout.row_aisle_z(target_aisle);

    push_waypoint(out, &mut cursor, Point::new(from.x, start_z));

    if start_aisle != target_aisle {
        let column_x = layout.column_aisle_x(layout.nearest_column_aisle(from.x));
        push_waypoint(out, &mut cursor, Point::new(column_x, start_z));
        push_waypoint(out, &mut cursor, Point::new(column_x, target_z));
    }

    push_waypoint(out, &mut cursor, Point::new(dest.x, target_z));
    push_waypoint(out, &mut cursor, dest);
}

/// Stripe centerlines from `start` to `end` inclusive, `step` apart. The last
/// stripe is pulled onto `end` so the far edge is always covered.
fn stripe_positions(start: f32, end: f32, step: f32, out: &mut Vec<f32>) {
    out.clear();
    if end <= start {
        out.push((start + end) / 2.0);
        return;
    }
    let step = step.max(MIN_STRIPE_WIDTH);
    let count = ((end - WAYPOINT_EPSILON - start) / step).ceil().max(0.0) as usize;
    out.extend((0..count).map(|i| start + i as f32 * step));
    out.push(end);
}

fn build_cleaning_route(
    layout: &FacilityLayout,
    pattern: CleaningPattern,
    row: u32,
    col: u32,
) -> CleaningRoute {
    let origin = layout.court_origin(row, col);
    let width = layout.court_width();
    let length = layout.court_length();
    let half_stripe = (pattern.stripe_width / 2.0).min(width / 2.0);
    let clearance = pattern.net_clearance;

    let x_left = origin.x + half_stripe;
    let x_right = origin.x + width - half_stripe;
    let net_z = origin.z + length / 2.0;

    let entrance = layout.court_entrance(row, col);
    let mut waypoints = vec![entrance];
    let mut stripes = Vec::new();

    // Near half, baseline toward the net
    stripe_positions(
        origin.z + half_stripe,
        net_z - clearance,
        pattern.stripe_width,
        &mut stripes,
    );
    let mut left_to_right = true;
    for &z in &stripes {
        let (a, b) = if left_to_right { (x_left, x_right) } else { (x_right, x_left) };
        waypoints.push(Point::new(a, z));
        waypoints.push(Point::new(b, z));
        left_to_right = !left_to_right;
    }
    let last_near_z = stripes.last().copied().unwrap_or(net_z - clearance);

    // Around the net post on whichever side the near half finished
    let finished_right = !left_to_right;
    let detour_x = if finished_right {
        origin.x + width + clearance
    } else {
        origin.x - clearance
    };

    stripe_positions(
        net_z + clearance,
        origin.z + length - half_stripe,
        pattern.stripe_width,
        &mut stripes,
    );
    let first_far_z = stripes.first().copied().unwrap_or(net_z + clearance);
    waypoints.push(Point::new(detour_x, last_near_z));
    waypoints.push(Point::new(detour_x, first_far_z));

    // Far half, net toward the back baseline
    let mut left_to_right = !finished_right;
    for &z in &stripes {
        let (a, b) = if left_to_right { (x_left, x_right) } else { (x_right, x_left) };
        waypoints.push(Point::new(a, z));
        waypoints.push(Point::new(b, z));
        left_to_right = !left_to_right;
    }

    let length = path_length(entrance, &waypoints);
    CleaningRoute { waypoints, length }
}
