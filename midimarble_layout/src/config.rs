// Data-driven layout configuration.
//
// Every tunable the planner reads lives in `LayoutConfig`: physical sizes,
// the speed curve, search budgets, and chord fan-out geometry. The planner
// never uses magic numbers; it reads from the config. Defaults reproduce the
// layouts the player was tuned against, and a JSON file can override them
// without recompiling (`--config` on the encoder CLI).
//
// Parameters are grouped into nested structs by the stage that consumes
// them: `GeometryParams` (spatial index + collision tests), `SpeedParams`
// (velocity curve), `SearchParams` (grouping + main placement search) and
// `ChordParams` (merge targets + split/merge planner).
//
// The random seed is deliberately not part of the config. It is passed
// separately as a `MarbleRng` so the same config can be replayed with
// different seeds.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4};
use std::path::Path;

/// Physical sizes and collision tolerances, in pixels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryParams {
    /// Length of every wall segment.
    pub wall_length: f64,
    /// Minimum distance between a new wall centre and any existing one.
    pub min_wall_dist: f64,
    /// Floor on the travel distance between consecutive walls.
    pub min_distance: f64,
    /// Spatial hash cell edge. Must exceed `wall_length` plus clearance so
    /// the 3x3 neighbourhood always contains every interacting wall.
    pub cell_size: f64,
    /// Ray-parameter slack for path-vs-wall tests.
    pub path_margin: f64,
    /// Ray-parameter slack for wall-vs-wall tests.
    pub segment_margin: f64,
    /// Two wall centres closer than `min_wall_dist * overlap_ratio` count
    /// as one overlap in the diagnostics.
    pub overlap_ratio: f64,
}

/// Note-density to travel-speed mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedParams {
    /// Speed at maximum density, px/s.
    pub min_speed: f64,
    /// Speed in sparse passages, px/s.
    pub max_speed: f64,
    /// Width of the centred density window, seconds.
    pub density_window_s: f64,
    /// Notes per second at which the curve bottoms out at `min_speed`.
    pub max_density_nps: f64,
}

/// Grouping and main placement search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Notes closer than this to the previous note of a group join it.
    pub chord_threshold_ms: f64,
    /// Perturbed-heading attempts after the straight attempt fails.
    pub max_retries: u32,
    /// Backtrack budget per group (total = max(groups * this, minimum)).
    pub backtracks_per_group: u32,
    /// Lower bound on the total backtrack budget.
    pub min_backtrack_budget: u32,
    /// Half-width of the retry heading perturbation, radians.
    pub retry_spread: f64,
    /// Half-width of the heading reroll after a backtrack, radians.
    pub backtrack_spread: f64,
    /// Half-width of the jitter added to every reflection, radians.
    pub reflection_jitter: f64,
    /// Distance multipliers tried by forced placement.
    pub forced_distance_multipliers: Vec<f64>,
    /// Heading offsets (radians) tried by forced placement.
    pub forced_angle_offsets: Vec<f64>,
    /// Clearance score given to a candidate with no wall nearby.
    pub empty_clearance: f64,
}

/// Chord merge targets and split/merge sub-path planning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChordParams {
    /// Minimum estimated distance from a chord to its merge target.
    pub merge_min_gap: f64,
    /// Upper bound on the sub-path fan half-angle, radians.
    pub fan_half_angle_cap: f64,
    /// Fan half-angle grows by this much per extra note until the cap.
    pub fan_step: f64,
    /// Child wall distance as a fraction of splitter-to-merge distance.
    pub child_distance_ratio: f64,
    /// Floor on the child wall distance.
    pub min_child_dist: f64,
    /// Child impact time as a fraction of splitter-to-merge time.
    pub child_impact_ratio: f64,
    /// How many walls past a splitter to look for a merger.
    pub merge_lookahead_walls: usize,
    /// Time span of a synthesized merge point, ms.
    pub virtual_merge_span_ms: f64,
    /// Assumed speed when extrapolating a synthesized merge point, px/s.
    pub virtual_merge_speed: f64,
    /// Distance multipliers tried when nudging a blocked child wall.
    pub child_distance_multipliers: Vec<f64>,
    /// Angle offsets (radians) tried when nudging a blocked child wall.
    pub child_angle_offsets: Vec<f64>,
    /// Half-width of the last-resort scan fan, radians.
    pub child_fallback_fan: f64,
    /// Number of evenly spaced angles in the last-resort scan.
    pub child_fallback_steps: usize,
}

/// All layout tunables.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub geometry: GeometryParams,
    pub speed: SpeedParams,
    pub search: SearchParams,
    pub chord: ChordParams,
}

impl LayoutConfig {
    /// Parse a complete config from JSON. Every field must be present.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&text)?)
    }

    /// Total backtracks the main search may spend on `group_count` groups.
    pub fn backtrack_budget(&self, group_count: usize) -> usize {
        (group_count * self.search.backtracks_per_group as usize)
            .max(self.search.min_backtrack_budget as usize)
    }
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            wall_length: 30.0,
            min_wall_dist: 25.0,
            min_distance: 25.0,
            cell_size: 50.0,
            path_margin: 2.0,
            segment_margin: 0.5,
            overlap_ratio: 0.8,
        }
    }
}

impl Default for SpeedParams {
    fn default() -> Self {
        Self {
            min_speed: 150.0,
            max_speed: 600.0,
            density_window_s: 2.0,
            max_density_nps: 8.0,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            chord_threshold_ms: 50.0,
            max_retries: 30,
            backtracks_per_group: 15,
            min_backtrack_budget: 200,
            retry_spread: FRAC_PI_3,
            backtrack_spread: FRAC_PI_2,
            reflection_jitter: 0.26,
            forced_distance_multipliers: vec![1.0, 1.5, 2.0, 0.7],
            forced_angle_offsets: vec![0.0, 0.3, -0.3, 0.6, -0.6, 1.0, -1.0],
            empty_clearance: 999.0,
        }
    }
}

impl Default for ChordParams {
    fn default() -> Self {
        Self {
            merge_min_gap: 25.0,
            fan_half_angle_cap: FRAC_PI_4,
            fan_step: std::f64::consts::PI / 16.0,
            child_distance_ratio: 0.35,
            min_child_dist: 15.0,
            child_impact_ratio: 0.08,
            merge_lookahead_walls: 16,
            virtual_merge_span_ms: 500.0,
            virtual_merge_speed: 300.0,
            child_distance_multipliers: vec![0.8, 1.2, 0.6, 1.5],
            child_angle_offsets: vec![0.0, 0.15, -0.15, 0.3, -0.3],
            child_fallback_fan: FRAC_PI_3,
            child_fallback_steps: 12,
        }
    }
}
