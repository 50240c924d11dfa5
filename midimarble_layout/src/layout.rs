// Pipeline orchestration: notes in, walls and ball path out.
//
// `plan_layout` runs the stages in order:
//
//   group_notes -> group_speed_curve -> mark_merge_targets
//     -> place_groups (main pass) -> plan_chord_paths (second pass)
//
// and packages the result as a `Layout`: one `TimelineEntry` per main wall
// (with the splitters' sub-paths attached), the main ball path, and a
// `LayoutStats` summary for diagnostics. The planner is infallible: empty
// input yields no walls and a ball path holding only the origin.
//
// Input is expected to satisfy `note::validate_notes`; front ends check it
// at the boundary and the planner does not re-check.

use crate::chord::plan_chord_paths;
use crate::config::LayoutConfig;
use crate::grouper::{group_notes, mark_merge_targets};
use crate::note::NoteEvent;
use crate::placement::place_groups;
use crate::velocity::group_speed_curve;
use crate::wall::{Keyframe, TimelineEntry, WallKind};
use midimarble_prng::MarbleRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Summary counters for one planning run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutStats {
    pub groups: usize,
    pub chords: usize,
    pub merge_targets: usize,
    /// Main-path walls (one per group).
    pub walls: usize,
    /// Main walls closer than `min_wall_dist * overlap_ratio` to an earlier one.
    pub overlaps: usize,
    pub backtracks: usize,
    pub backtrack_budget: usize,
    pub forced_placements: usize,
    pub splitters: usize,
    pub mergers: usize,
    pub child_walls: usize,
    /// Splitters whose sub-paths merge at a synthesized point.
    pub virtual_merges: usize,
}

/// A finished layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Main walls in time order, each with its optional sub-paths.
    pub timeline: Vec<TimelineEntry>,
    /// Origin followed by one keyframe per main wall.
    pub ball_path: Vec<Keyframe>,
    pub stats: LayoutStats,
}

impl Layout {
    /// The layout of an empty note list.
    pub fn empty() -> Self {
        Self {
            timeline: Vec::new(),
            ball_path: vec![Keyframe::origin()],
            stats: LayoutStats::default(),
        }
    }

    /// Total walls, children included.
    pub fn wall_count(&self) -> usize {
        self.stats.walls + self.stats.child_walls
    }
}

/// Plan walls and the ball path for time-sorted `notes`.
pub fn plan_layout(notes: &[NoteEvent], config: &LayoutConfig, rng: &mut MarbleRng) -> Layout {
    if notes.is_empty() {
        return Layout::empty();
    }
    let start = Instant::now();

    let groups = group_notes(notes, config.search.chord_threshold_ms);
    let speeds = group_speed_curve(&groups, notes, &config.speed);
    let merge_targets = mark_merge_targets(&groups, &speeds, config.chord.merge_min_gap);
    let chords = groups.iter().filter(|g| g.is_chord()).count();
    log::info!(
        "{} notes -> {} groups ({} chords, {} merge targets)",
        notes.len(),
        groups.len(),
        chords,
        merge_targets.len()
    );

    let mut pass = place_groups(&groups, &speeds, &merge_targets, config, rng);
    let main_count = pass.index.len();
    let overlaps = pass
        .index
        .count_overlaps(config.geometry.min_wall_dist * config.geometry.overlap_ratio);

    let plan = plan_chord_paths(&mut pass.index, main_count, &pass.ball_path, config);

    let timeline: Vec<TimelineEntry> = pass.index.walls()[..main_count]
        .iter()
        .cloned()
        .zip(plan.attachments)
        .map(|(wall, child_paths)| TimelineEntry { wall, child_paths })
        .collect();

    let stats = LayoutStats {
        groups: groups.len(),
        chords,
        merge_targets: merge_targets.len(),
        walls: main_count,
        overlaps,
        backtracks: pass.backtracks,
        backtrack_budget: pass.backtrack_budget,
        forced_placements: pass.forced,
        splitters: count_kind(&timeline, |k| k.is_splitter()),
        mergers: count_kind(&timeline, |k| k.is_merger()),
        child_walls: plan.child_walls,
        virtual_merges: plan.virtual_merges,
    };
    log::info!(
        "layout: {} walls, {} overlaps, {}/{} backtracks, {} forced, {} splitters, {} mergers, {} child walls in {:.1?}",
        stats.walls,
        stats.overlaps,
        stats.backtracks,
        stats.backtrack_budget,
        stats.forced_placements,
        stats.splitters,
        stats.mergers,
        stats.child_walls,
        start.elapsed()
    );

    Layout {
        timeline,
        ball_path: pass.ball_path,
        stats,
    }
}

fn count_kind(timeline: &[TimelineEntry], pred: impl Fn(&WallKind) -> bool) -> usize {
    timeline.iter().filter(|e| pred(&e.wall.kind)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(t: f64, pitch: u8) -> NoteEvent {
        NoteEvent::new(t, pitch, 100, 0)
    }

    #[test]
    fn empty_input_is_origin_only() {
        let mut rng = MarbleRng::new(1);
        let layout = plan_layout(&[], &LayoutConfig::default(), &mut rng);
        assert!(layout.timeline.is_empty());
        assert_eq!(layout.ball_path, vec![Keyframe::origin()]);
        assert_eq!(layout.stats, LayoutStats::default());
    }

    #[test]
    fn single_note_one_plain_wall() {
        let mut rng = MarbleRng::new(1);
        let layout = plan_layout(&[n(400.0, 60)], &LayoutConfig::default(), &mut rng);
        assert_eq!(layout.timeline.len(), 1);
        assert_eq!(layout.timeline[0].wall.kind, WallKind::Plain);
        assert!(layout.timeline[0].child_paths.is_none());
        assert_eq!(layout.ball_path.len(), 2);
        assert_eq!(layout.stats.groups, 1);
        assert_eq!(layout.wall_count(), 1);
    }

    #[test]
    fn stats_agree_with_timeline() {
        let notes = [
            n(0.0, 60),
            n(0.0, 64),
            n(500.0, 62),
            n(1000.0, 60),
            n(1010.0, 65),
            n(1020.0, 69),
            n(1600.0, 70),
        ];
        let mut rng = MarbleRng::new(8);
        let layout = plan_layout(&notes, &LayoutConfig::default(), &mut rng);
        let s = &layout.stats;
        assert_eq!(s.groups, 4);
        assert_eq!(s.chords, 2);
        assert_eq!(s.walls, 4);
        assert_eq!(s.splitters, 2);
        assert_eq!(s.mergers, s.merge_targets);
        // One child per extra chord note: 1 + 2.
        assert_eq!(s.child_walls, 3);
        assert_eq!(layout.wall_count(), 7);
    }
}
