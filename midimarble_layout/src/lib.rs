// midimarble_layout: chord-aware wall and ball-path layout engine.
//
// Turns a time-sorted list of note events into a chain of reflective walls
// and a ball trajectory that strikes each wall exactly when its note
// sounds. Chords are split into independent sub-paths that each hit their
// own child wall and rejoin the main path at a later merge point.
//
// Module overview:
// - `geom.rs`:      Vec2, reflection, wall segments, ray/segment tests, rounding.
// - `note.rs`:      NoteEvent / ChordNote input types + boundary validation.
// - `wall.rs`:      Wall, WallKind, Keyframe, ChildSubPath, TimelineEntry.
// - `config.rs`:    LayoutConfig, every tunable, serde-loadable from JSON.
// - `spatial.rs`:   Uniform-grid spatial hash over placed walls, with undo.
// - `grouper.rs`:   Chord grouping + merge-target marking.
// - `velocity.rs`:  Per-group speed from local note density.
// - `placement.rs`: Main placement search (retry, backtrack, forced placement).
// - `chord.rs`:     Second pass planning chord split/merge sub-paths.
// - `layout.rs`:    `plan_layout` pipeline, Layout result + LayoutStats.
// - `error.rs`:     InputError for the boundary check.
//
// The crate knows nothing about MIDI files or the on-disk layout format;
// `midimarble_encoder` converts at both ends.
//
// **Critical constraint: determinism.** All randomness comes from the
// `MarbleRng` the caller passes to `plan_layout`. Spatial queries return
// sorted indices, so hash iteration order never affects the result. The
// same notes, config and seed always produce the same layout.

pub mod chord;
pub mod config;
pub mod error;
pub mod geom;
pub mod grouper;
pub mod layout;
pub mod note;
pub mod placement;
pub mod spatial;
pub mod velocity;
pub mod wall;

pub use config::LayoutConfig;
pub use layout::{Layout, LayoutStats, plan_layout};
pub use midimarble_prng::MarbleRng;
pub use note::{NoteEvent, validate_notes};
