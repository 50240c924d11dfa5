// Main placement search: one wall per group, in time order.
//
// The ball starts at the origin heading down-right. For each group the
// search computes how far the ball travels before the group sounds
// (`speed * dt`, floored at `min_distance`) and tries to put a wall at the
// end of that straight flight:
//
// 1. Straight attempt along the current heading. The flight is rejected if
//    it crosses any placed wall segment or ends too close to a wall centre.
//    Otherwise the wall orientation is chosen from two axis-aligned
//    candidates (horizontal preferred on even walls, vertical on odd, the
//    other axis as fallback), each with its normal facing the incoming
//    ball; the first one that does not cross an existing wall wins.
// 2. Up to `max_retries` attempts with the heading perturbed by a random
//    angle in `[-retry_spread, retry_spread)`.
// 3. Backtrack: undo the newest wall, return to the wall before it (or the
//    origin), reroll the heading, and resume from that group. Limited by a
//    total budget proportional to the number of groups.
// 4. Forced placement once the budget is spent: score a fixed grid of
//    distance multipliers x heading offsets by clearance to the nearest wall
//    and commit the best one, collisions or not. This always succeeds, so
//    the loop always advances and terminates.
//
// On success the outgoing heading is the mirror reflection of the incoming
// heading about the wall normal, plus a small random jitter so long runs do
// not settle into a periodic zig-zag.
//
// The search keeps an explicit stack of `SearchFrame`s, one per committed
// wall, parallel to the spatial index and the ball path. Backtracking pops
// all three together.
//
// See also: `spatial.rs` for the collision index, `chord.rs` for the pass
// that runs over the finished wall list, `layout.rs` for orchestration.
//
// **Critical constraint: determinism.** All randomness is drawn from the
// `MarbleRng` passed in, in a fixed order. Same inputs and seed produce the
// same walls.

use crate::config::LayoutConfig;
use crate::geom::{Vec2, ray_hits_segment, reflect, rotation_for_normal, wall_segment};
use crate::grouper::Group;
use crate::note::ChordNote;
use crate::spatial::SpatialIndex;
use crate::wall::{Keyframe, Wall, WallKind};
use midimarble_prng::MarbleRng;
use std::collections::BTreeSet;

/// Log progress every this many committed groups.
const PROGRESS_INTERVAL: usize = 200;

/// State recorded for each committed wall.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchFrame {
    /// Ball position after the bounce (the wall centre, unrounded).
    pub position: Vec2,
    /// Outgoing heading, jitter included.
    pub heading: Vec2,
    /// Heading of the flight that reached the wall.
    pub incoming: Vec2,
    /// Wall normal used for the reflection.
    pub normal: Vec2,
    /// Mirror of `incoming` about `normal`, before jitter.
    pub reflected: Vec2,
    /// Committed by forced placement rather than a clean attempt.
    pub forced: bool,
}

/// Everything the main pass produces.
#[derive(Clone, Debug)]
pub struct MainPass {
    /// Holds exactly one wall per group, in group order.
    pub index: SpatialIndex,
    /// Origin keyframe followed by one keyframe per wall.
    pub ball_path: Vec<Keyframe>,
    /// One frame per wall.
    pub frames: Vec<SearchFrame>,
    pub backtracks: usize,
    pub forced: usize,
    pub backtrack_budget: usize,
}

/// What to build once a position is found.
struct PendingWall {
    id: u32,
    time_ms: f64,
    kind: WallKind,
    note: ChordNote,
}

impl PendingWall {
    fn for_group(index: usize, group: &Group, merge_targets: &BTreeSet<usize>) -> Self {
        let kind = if group.is_chord() {
            WallKind::Splitter {
                extra_notes: group.extra_notes(),
            }
        } else if merge_targets.contains(&index) {
            WallKind::Merger
        } else {
            WallKind::Plain
        };
        Self {
            id: index as u32 + 1,
            time_ms: group.time_ms(),
            kind,
            note: group.representative().chord_note(),
        }
    }
}

/// Orientation candidates for the `parity`-th wall: the preferred axis
/// first (horizontal wall on even walls, vertical on odd), then the other
/// axis. Each normal is signed to face the incoming heading.
pub fn ortho_normals(heading: Vec2, parity: usize) -> [Vec2; 2] {
    let horizontal_wall = Vec2::new(0.0, 1.0);
    let vertical_wall = Vec2::new(1.0, 0.0);
    let facing = |axis: Vec2| if heading.dot(axis) > 0.0 { -axis } else { axis };
    if parity % 2 == 0 {
        [facing(horizontal_wall), facing(vertical_wall)]
    } else {
        [facing(vertical_wall), facing(horizontal_wall)]
    }
}

/// Run the main placement search over all groups.
///
/// `speeds` and `groups` must have equal length; `merge_targets` holds group
/// indices (see `grouper::mark_merge_targets`).
pub fn place_groups(
    groups: &[Group],
    speeds: &[f64],
    merge_targets: &BTreeSet<usize>,
    config: &LayoutConfig,
    rng: &mut MarbleRng,
) -> MainPass {
    let mut placer = Placer {
        config,
        rng,
        index: SpatialIndex::new(config.geometry.cell_size),
        ball_path: vec![Keyframe::origin()],
        frames: Vec::with_capacity(groups.len()),
    };
    let budget = config.backtrack_budget(groups.len());
    let mut backtracks = 0;
    let mut forced = 0;

    let mut pos = Vec2::ZERO;
    let mut heading = Vec2::DIAGONAL;
    let mut i = 0;
    while i < groups.len() {
        let group = &groups[i];
        let prev_ms = if i > 0 { groups[i - 1].time_ms() } else { 0.0 };
        let dt_s = (group.time_ms() - prev_ms) / 1000.0;
        let dist = (speeds[i] * dt_s).max(config.geometry.min_distance);
        let pending = PendingWall::for_group(i, group, merge_targets);

        if let Some(frame) = placer.try_place(pos, heading, dist, i, &pending) {
            pos = frame.position;
            heading = frame.heading;
            i += 1;
            if i % PROGRESS_INTERVAL == 0 {
                log::debug!("placement progress: {}/{} groups", i, groups.len());
            }
            continue;
        }

        if backtracks < budget && !placer.index.is_empty() {
            placer.undo_last();
            i = placer.index.len();
            pos = placer.frames.last().map_or(Vec2::ZERO, |f| f.position);
            heading = heading.rotated(placer.rng.symmetric(config.search.backtrack_spread));
            backtracks += 1;
            log::trace!("backtrack {backtracks}/{budget}: resuming at group {i}");
            continue;
        }

        let frame = placer.force_place(pos, heading, dist, i, &pending);
        log::debug!("forced placement for group {i} at ({:.2}, {:.2})", frame.position.x, frame.position.y);
        pos = frame.position;
        heading = frame.heading;
        forced += 1;
        i += 1;
    }

    MainPass {
        index: placer.index,
        ball_path: placer.ball_path,
        frames: placer.frames,
        backtracks,
        forced,
        backtrack_budget: budget,
    }
}

/// Mutable search state shared by the placement attempts.
struct Placer<'a> {
    config: &'a LayoutConfig,
    rng: &'a mut MarbleRng,
    index: SpatialIndex,
    ball_path: Vec<Keyframe>,
    frames: Vec<SearchFrame>,
}

impl Placer<'_> {
    /// Straight attempt, then perturbed retries.
    fn try_place(
        &mut self,
        pos: Vec2,
        heading: Vec2,
        dist: f64,
        parity: usize,
        pending: &PendingWall,
    ) -> Option<SearchFrame> {
        if let Some(frame) = self.attempt(pos, heading, dist, parity, pending) {
            return Some(frame);
        }
        for _ in 0..self.config.search.max_retries {
            let dir = heading.rotated(self.rng.symmetric(self.config.search.retry_spread));
            if let Some(frame) = self.attempt(pos, dir, dist, parity, pending) {
                return Some(frame);
            }
        }
        None
    }

    /// One flight along `dir`; commits and returns the frame on success.
    fn attempt(
        &mut self,
        pos: Vec2,
        dir: Vec2,
        dist: f64,
        parity: usize,
        pending: &PendingWall,
    ) -> Option<SearchFrame> {
        let end = pos + dir * dist;
        if self.path_blocked(pos, dir, dist, end) {
            return None;
        }
        let geometry = &self.config.geometry;
        let normal = ortho_normals(dir, parity).into_iter().find(|&n| {
            !self.index.wall_crosses_any(
                end,
                rotation_for_normal(n),
                geometry.wall_length,
                geometry.segment_margin,
            )
        })?;
        Some(self.commit(end, dir, normal, false, pending))
    }

    /// Whether the flight `pos -> end` hits a wall segment or ends too close
    /// to a wall centre. The wall the ball is leaving is exempt: the flight
    /// starts on it by construction.
    fn path_blocked(&self, pos: Vec2, dir: Vec2, dist: f64, end: Vec2) -> bool {
        let geometry = &self.config.geometry;
        let departing = self.index.len().checked_sub(1);
        self.index
            .query_along(pos, end)
            .into_iter()
            .filter(|&i| Some(i) != departing)
            .any(|i| {
                let w = self.index.wall(i);
                let (a, b) = wall_segment(w.pos, w.rotation_deg, geometry.wall_length);
                ray_hits_segment(pos, dir, dist, a, b, geometry.path_margin)
                    || w.pos.distance(end) < geometry.min_wall_dist
            })
    }

    /// Least-bad candidate from the forced-placement grid. Always commits.
    fn force_place(
        &mut self,
        pos: Vec2,
        heading: Vec2,
        dist: f64,
        parity: usize,
        pending: &PendingWall,
    ) -> SearchFrame {
        let search = &self.config.search;
        let mut best: Option<(f64, Vec2, Vec2)> = None;
        for &mult in &search.forced_distance_multipliers {
            for &offset in &search.forced_angle_offsets {
                let dir = heading.rotated(offset);
                let candidate = pos + dir * (dist * mult);
                let clearance = self
                    .index
                    .nearest_wall_distance(candidate, search.empty_clearance);
                if best.is_none_or(|(c, _, _)| clearance > c) {
                    best = Some((clearance, candidate, dir));
                }
            }
        }
        let (_, end, dir) = best.unwrap_or((0.0, pos + heading * dist, heading));
        let [normal, _] = ortho_normals(dir, parity);
        self.commit(end, dir, normal, true, pending)
    }

    /// Reflect, jitter, and record the wall, keyframe and frame.
    fn commit(
        &mut self,
        end: Vec2,
        incoming: Vec2,
        normal: Vec2,
        forced: bool,
        pending: &PendingWall,
    ) -> SearchFrame {
        let reflected = reflect(incoming, normal);
        let heading = reflected.rotated(self.rng.symmetric(self.config.search.reflection_jitter));
        let wall = Wall::new(
            pending.id,
            pending.time_ms,
            pending.kind.clone(),
            end,
            rotation_for_normal(normal),
            pending.note,
        );
        self.index.add(wall);
        self.ball_path.push(Keyframe::new(pending.time_ms, end));
        let frame = SearchFrame {
            position: end,
            heading,
            incoming,
            normal,
            reflected,
            forced,
        };
        self.frames.push(frame);
        frame
    }

    fn undo_last(&mut self) {
        self.index.undo_last();
        self.ball_path.pop();
        self.frames.pop();
    }
}
