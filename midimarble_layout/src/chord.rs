// Chord split/merge planner: the second pass over the finished main path.
//
// A chord is struck by several notes at once, but the ball can only be in
// one place. The main search gives the chord's first note a splitter wall;
// this pass gives every other note of the chord its own short sub-path:
//
//   splitter --(slot direction)--> child wall --> merge point
//
// For each splitter:
//
// 1. The incoming flight direction is taken from the ball-path keyframe
//    before the splitter (diagonal fallback when degenerate).
// 2. The merge point is the first later MERGER wall within
//    `merge_lookahead_walls` walls. When there is none, a virtual point is
//    extrapolated along the incoming direction.
// 3. Extra notes get evenly spaced angular slots fanned around the incoming
//    direction. The half-angle is `min(cap, k * step)` for k extra notes.
// 4. Each child wall sits at a fraction of the splitter-to-merge distance
//    along its slot. A crowded slot is nudged through a grid of distance
//    multipliers x angle offsets; if every nudge is crowded, a coarse fan
//    is scanned for the spot farthest from any wall.
//
// Child walls are added to the shared spatial index as soon as they are
// placed, so later siblings and later chords avoid them. The child wall
// faces back along its own flight (normal = -flight direction) and is hit
// early, at `child_impact_ratio` of the way to the merge time, so the chord
// notes sound close together.
//
// **Critical constraint: determinism.** The pass draws no randomness. Its
// output depends only on the main-pass walls, the ball path and the config.

use crate::config::{ChordParams, LayoutConfig};
use crate::geom::{Vec2, round2, rotation_for_normal};
use crate::note::ChordNote;
use crate::spatial::SpatialIndex;
use crate::wall::{ChildSubPath, Keyframe, Wall, WallKind};

/// Where a chord's sub-paths rejoin the main path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergePoint {
    pub pos: Vec2,
    pub time_ms: f64,
    /// Index of the MERGER wall, or `None` for a synthesized point.
    pub wall: Option<usize>,
}

/// Result of the chord pass.
#[derive(Clone, Debug, Default)]
pub struct ChordPlan {
    /// One entry per main wall: `Some` for splitters, `None` otherwise.
    pub attachments: Vec<Option<Vec<ChildSubPath>>>,
    pub child_walls: usize,
    /// Splitters that fell back to a synthesized merge point.
    pub virtual_merges: usize,
}

/// Plan sub-paths for every splitter among the first `main_count` walls of
/// `index`. `ball_path[k + 1]` must be the keyframe of main wall `k`.
pub fn plan_chord_paths(
    index: &mut SpatialIndex,
    main_count: usize,
    ball_path: &[Keyframe],
    config: &LayoutConfig,
) -> ChordPlan {
    let mut plan = ChordPlan {
        attachments: Vec::with_capacity(main_count),
        ..ChordPlan::default()
    };
    for k in 0..main_count {
        let splitter = index.wall(k).clone();
        if !splitter.kind.is_splitter() {
            plan.attachments.push(None);
            continue;
        }
        let extras = splitter.kind.extra_notes();
        let incoming = incoming_direction(&splitter, k, ball_path);
        let merge = find_merge_point(index, k, main_count, &splitter, incoming, &config.chord);
        if merge.wall.is_none() {
            plan.virtual_merges += 1;
        }
        let children: Vec<ChildSubPath> = fan_angles(incoming.angle(), extras.len(), &config.chord)
            .into_iter()
            .zip(extras)
            .enumerate()
            .map(|(slot, (angle, &note))| {
                plan_child(index, &splitter, slot, angle, note, &merge, config)
            })
            .collect();
        log::trace!(
            "splitter {}: {} sub-paths merging at {:.2} ms{}",
            splitter.id,
            children.len(),
            merge.time_ms,
            if merge.wall.is_some() { "" } else { " (virtual)" }
        );
        plan.child_walls += children.len();
        plan.attachments.push(Some(children));
    }
    plan
}

/// Direction the ball was travelling when it reached main wall `k`.
pub fn incoming_direction(splitter: &Wall, k: usize, ball_path: &[Keyframe]) -> Vec2 {
    ball_path
        .get(k)
        .map_or(Vec2::DIAGONAL, |prev| {
            (splitter.pos - prev.pos()).normalize_or(Vec2::DIAGONAL)
        })
}

/// First MERGER wall after `k` (within the look-ahead window) that is hit
/// after the splitter, or a point extrapolated along `incoming`.
pub fn find_merge_point(
    index: &SpatialIndex,
    k: usize,
    main_count: usize,
    splitter: &Wall,
    incoming: Vec2,
    params: &ChordParams,
) -> MergePoint {
    let window_end = main_count.min(k + 1 + params.merge_lookahead_walls);
    let found = (k + 1..window_end).find(|&j| {
        let w = index.wall(j);
        w.kind.is_merger() && w.time_ms > splitter.time_ms
    });
    match found {
        Some(j) => {
            let w = index.wall(j);
            MergePoint {
                pos: w.pos,
                time_ms: w.time_ms,
                wall: Some(j),
            }
        }
        None => {
            let reach = params.virtual_merge_speed * params.virtual_merge_span_ms / 1000.0;
            MergePoint {
                pos: splitter.pos + incoming * reach,
                time_ms: splitter.time_ms + params.virtual_merge_span_ms,
                wall: None,
            }
        }
    }
}

/// Slot angles for `count` sub-paths around `base`, evenly spaced across
/// `[base - half, base + half]`. A single slot sits on `base`.
pub fn fan_angles(base: f64, count: usize, params: &ChordParams) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![base],
        n => {
            let half = params.fan_half_angle_cap.min(n as f64 * params.fan_step);
            (0..n)
                .map(|i| base + half * (2.0 * i as f64 / (n - 1) as f64 - 1.0))
                .collect()
        }
    }
}

fn plan_child(
    index: &mut SpatialIndex,
    splitter: &Wall,
    slot: usize,
    angle: f64,
    note: ChordNote,
    merge: &MergePoint,
    config: &LayoutConfig,
) -> ChildSubPath {
    let params = &config.chord;
    let span = splitter.pos.distance(merge.pos);
    let target = (span * params.child_distance_ratio).max(params.min_child_dist);
    let pos = child_position(index, splitter.pos, angle, target, config);

    let flight = (pos - splitter.pos).normalize_or(Vec2::from_angle(angle));
    let hit_ms = splitter.time_ms + (merge.time_ms - splitter.time_ms) * params.child_impact_ratio;
    let wall = Wall::new(
        splitter.id * 100 + slot as u32 + 1,
        hit_ms,
        WallKind::Child,
        pos,
        rotation_for_normal(-flight),
        note,
    );
    index.add(wall.clone());

    ChildSubPath {
        note,
        keyframes: [
            Keyframe::new(splitter.time_ms, splitter.pos),
            Keyframe::new(hit_ms, wall.pos),
            Keyframe::new(merge.time_ms, merge.pos),
        ],
        wall,
        merge_time_ms: round2(merge.time_ms),
    }
}

/// Uncrowded spot for a child wall near `origin + target` along `angle`.
fn child_position(
    index: &SpatialIndex,
    origin: Vec2,
    angle: f64,
    target: f64,
    config: &LayoutConfig,
) -> Vec2 {
    let params = &config.chord;
    let clearance = config.geometry.min_wall_dist;
    let at = |a: f64, d: f64| origin + Vec2::from_angle(a) * d;

    let direct = at(angle, target);
    if !index.crowded(direct, clearance) {
        return direct;
    }
    for &mult in &params.child_distance_multipliers {
        for &offset in &params.child_angle_offsets {
            let p = at(angle + offset, target * mult);
            if !index.crowded(p, clearance) {
                return p;
            }
        }
    }

    // Everything nearby is crowded: take the least crowded spot on the fan.
    let steps = params.child_fallback_steps;
    let fan = params.child_fallback_fan;
    let mut best = direct;
    let mut best_dist = 0.0;
    for s in 0..steps {
        let offset = if steps > 1 {
            -fan + 2.0 * fan * s as f64 / (steps - 1) as f64
        } else {
            0.0
        };
        let p = at(angle + offset, target);
        let d = index.nearest_wall_distance(p, config.search.empty_clearance);
        if d > best_dist {
            best = p;
            best_dist = d;
        }
    }
    best
}
