// Placed geometry: walls, chord sub-paths and ball-path keyframes.
//
// A `Wall` is immutable once built. Its kind is a sum type so that only a
// splitter carries the extra chord notes it is responsible for; plain,
// merger and child walls carry nothing beyond the shared core fields.
//
// Child sub-paths are not stored on the wall itself. The chord planner
// runs after the main search has settled and returns them separately; the
// layout stage then pairs each main wall with its (optional) attachment in
// a `TimelineEntry`. Nothing mutates a wall after it leaves the spatial
// index.
//
// All numeric fields are rounded to two decimals when the wall is built
// (see `geom::round2`), which keeps collision checks and output in exact
// agreement.

use crate::geom::{Vec2, round2};
use crate::note::ChordNote;
use serde::{Deserialize, Serialize};

/// What role a wall plays in the layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WallKind {
    /// An ordinary single-note bounce.
    Plain,
    /// First note of a chord. Owns the chord's remaining notes, each of
    /// which is realized later as a `ChildSubPath`.
    Splitter { extra_notes: Vec<ChordNote> },
    /// Rendezvous wall toward which a preceding chord's sub-paths converge.
    Merger,
    /// Wall owned by a single chord sub-path.
    Child,
}

impl WallKind {
    pub fn is_splitter(&self) -> bool {
        matches!(self, WallKind::Splitter { .. })
    }

    pub fn is_merger(&self) -> bool {
        matches!(self, WallKind::Merger)
    }

    /// Extra chord notes for a splitter, empty for every other kind.
    pub fn extra_notes(&self) -> &[ChordNote] {
        match self {
            WallKind::Splitter { extra_notes } => extra_notes,
            _ => &[],
        }
    }
}

/// A placed reflective wall.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    /// Sequence id: 1-based for main walls, `splitter_id * 100 + n` for
    /// the n-th child wall of a splitter.
    pub id: u32,
    /// Impact time in milliseconds.
    pub time_ms: f64,
    pub kind: WallKind,
    /// Wall centre.
    pub pos: Vec2,
    /// Orientation of the wall segment, degrees.
    pub rotation_deg: f64,
    /// The note struck when the ball hits this wall.
    pub note: ChordNote,
}

impl Wall {
    /// Build a wall, rounding time, position and rotation to output precision.
    pub fn new(
        id: u32,
        time_ms: f64,
        kind: WallKind,
        pos: Vec2,
        rotation_deg: f64,
        note: ChordNote,
    ) -> Self {
        Self {
            id,
            time_ms: round2(time_ms),
            kind,
            pos: pos.rounded(),
            rotation_deg: round2(rotation_deg),
            note,
        }
    }
}

/// One point on a ball trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time_ms: f64,
    pub x: f64,
    pub y: f64,
}

impl Keyframe {
    pub fn new(time_ms: f64, pos: Vec2) -> Self {
        Self {
            time_ms: round2(time_ms),
            x: round2(pos.x),
            y: round2(pos.y),
        }
    }

    /// The trajectory's starting point: time zero at the origin.
    pub fn origin() -> Self {
        Self::new(0.0, Vec2::ZERO)
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// The independent flight of one non-primary chord note:
/// splitter -> child wall -> merge point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChildSubPath {
    pub note: ChordNote,
    /// The single `WallKind::Child` wall this sub-path strikes.
    pub wall: Wall,
    /// Splitter, child wall and merge point, in that order.
    pub keyframes: [Keyframe; 3],
    /// When the sub-path rejoins the main ball.
    pub merge_time_ms: f64,
}

/// A main-path wall together with whatever the chord planner attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub wall: Wall,
    /// `Some` only for splitters, populated once by the chord planner.
    pub child_paths: Option<Vec<ChildSubPath>>,
}
