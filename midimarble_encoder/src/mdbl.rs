// `.mdbl` layout file writer.
//
// The player consumes a single pretty-printed JSON document:
//
//   { meta: { title, bpm, totalTime, mapBounds },
//     assets: { instruments: [{ id, name, color }] },
//     timeline: [wall...],
//     ballPath: [{ time, x, y }...] }
//
// Walls carry their kind as a `type` string ("WALL", "SPLITTER", "MERGER",
// "CHILD_WALL"). Splitters additionally carry `chordNotes` and, once the
// chord planner has run, `childPaths`. The record types here mirror the
// file format field for field; `build_document` converts a `Layout` and
// the song metadata into them.
//
// `mapBounds` is the bounding box of every wall centre and keyframe (the
// origin is always included), padded by `BOUNDS_PADDING` pixels.

use crate::error::EncodeError;
use crate::midi::{Instrument, SongMeta};
use midimarble_layout::geom::round2;
use midimarble_layout::layout::Layout;
use midimarble_layout::note::ChordNote;
use midimarble_layout::wall::{ChildSubPath, Keyframe, Wall, WallKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Padding around the layout's bounding box, px.
pub const BOUNDS_PADDING: f64 = 200.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MdblDocument {
    pub meta: MdblMeta,
    pub assets: MdblAssets,
    pub timeline: Vec<WallRecord>,
    pub ball_path: Vec<KeyframeRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MdblMeta {
    pub title: String,
    pub bpm: f64,
    pub total_time: f64,
    pub map_bounds: MapBounds,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MdblAssets {
    pub instruments: Vec<InstrumentRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub id: u16,
    pub name: String,
    pub color: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallType {
    #[serde(rename = "WALL")]
    Wall,
    #[serde(rename = "SPLITTER")]
    Splitter,
    #[serde(rename = "MERGER")]
    Merger,
    #[serde(rename = "CHILD_WALL")]
    ChildWall,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallRecord {
    pub id: u32,
    pub time: f64,
    #[serde(rename = "type")]
    pub wall_type: WallType,
    pub pos: Point,
    pub rotation: f64,
    pub note: u8,
    pub velocity: u8,
    pub instrument_id: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chord_notes: Option<Vec<ChordNoteRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_paths: Option<Vec<ChildPathRecord>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordNoteRecord {
    pub note: u8,
    pub velocity: u8,
    pub instrument_id: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildPathRecord {
    pub note: u8,
    pub velocity: u8,
    pub instrument_id: u16,
    pub walls: Vec<WallRecord>,
    pub keyframes: Vec<KeyframeRecord>,
    pub merger_time: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeRecord {
    pub time: f64,
    pub x: f64,
    pub y: f64,
}

impl From<&Keyframe> for KeyframeRecord {
    fn from(k: &Keyframe) -> Self {
        Self {
            time: k.time_ms,
            x: k.x,
            y: k.y,
        }
    }
}

impl From<ChordNote> for ChordNoteRecord {
    fn from(n: ChordNote) -> Self {
        Self {
            note: n.pitch,
            velocity: n.velocity,
            instrument_id: n.instrument,
        }
    }
}

impl From<&Instrument> for InstrumentRecord {
    fn from(i: &Instrument) -> Self {
        Self {
            id: i.id,
            name: i.name.clone(),
            color: i.color.clone(),
        }
    }
}

fn wall_type(kind: &WallKind) -> WallType {
    match kind {
        WallKind::Plain => WallType::Wall,
        WallKind::Splitter { .. } => WallType::Splitter,
        WallKind::Merger => WallType::Merger,
        WallKind::Child => WallType::ChildWall,
    }
}

fn wall_record(wall: &Wall, child_paths: Option<&[ChildSubPath]>) -> WallRecord {
    let extras = wall.kind.extra_notes();
    WallRecord {
        id: wall.id,
        time: wall.time_ms,
        wall_type: wall_type(&wall.kind),
        pos: Point {
            x: wall.pos.x,
            y: wall.pos.y,
        },
        rotation: wall.rotation_deg,
        note: wall.note.pitch,
        velocity: wall.note.velocity,
        instrument_id: wall.note.instrument,
        chord_notes: (!extras.is_empty())
            .then(|| extras.iter().copied().map(ChordNoteRecord::from).collect()),
        child_paths: child_paths.map(|paths| paths.iter().map(child_path_record).collect()),
    }
}

fn child_path_record(path: &ChildSubPath) -> ChildPathRecord {
    ChildPathRecord {
        note: path.note.pitch,
        velocity: path.note.velocity,
        instrument_id: path.note.instrument,
        walls: vec![wall_record(&path.wall, None)],
        keyframes: path.keyframes.iter().map(KeyframeRecord::from).collect(),
        merger_time: path.merge_time_ms,
    }
}

/// Bounding box of all wall centres and keyframes, origin included.
pub fn map_bounds(layout: &Layout) -> MapBounds {
    let mut xs = vec![0.0];
    let mut ys = vec![0.0];
    for entry in &layout.timeline {
        xs.push(entry.wall.pos.x);
        ys.push(entry.wall.pos.y);
        for path in entry.child_paths.iter().flatten() {
            xs.push(path.wall.pos.x);
            ys.push(path.wall.pos.y);
        }
    }
    for k in &layout.ball_path {
        xs.push(k.x);
        ys.push(k.y);
    }
    let min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
    let max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    MapBounds {
        min_x: round2(min(&xs) - BOUNDS_PADDING),
        max_x: round2(max(&xs) + BOUNDS_PADDING),
        min_y: round2(min(&ys) - BOUNDS_PADDING),
        max_y: round2(max(&ys) + BOUNDS_PADDING),
    }
}

/// Assemble the document for a planned layout.
pub fn build_document(layout: &Layout, meta: &SongMeta, instruments: &[Instrument]) -> MdblDocument {
    MdblDocument {
        meta: MdblMeta {
            title: meta.title.clone(),
            bpm: meta.bpm,
            total_time: meta.total_time_ms,
            map_bounds: map_bounds(layout),
        },
        assets: MdblAssets {
            instruments: instruments.iter().map(InstrumentRecord::from).collect(),
        },
        timeline: layout
            .timeline
            .iter()
            .map(|e| wall_record(&e.wall, e.child_paths.as_deref()))
            .collect(),
        ball_path: layout.ball_path.iter().map(KeyframeRecord::from).collect(),
    }
}

/// Serialize a document as pretty-printed JSON.
pub fn to_json(doc: &MdblDocument) -> Result<String, EncodeError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Write a document to `path`, returning the number of bytes written.
pub fn write_mdbl(doc: &MdblDocument, path: &Path) -> Result<usize, EncodeError> {
    let json = to_json(doc)?;
    std::fs::write(path, json.as_bytes())?;
    Ok(json.len())
}
