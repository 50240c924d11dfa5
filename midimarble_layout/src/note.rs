// Note events: the engine's only input.
//
// A `NoteEvent` is what the MIDI reader (or any other front end) hands to
// the planner: an onset time in milliseconds, a pitch, an intensity and an
// instrument tag. The list must be sorted by time; `validate_notes` is the
// boundary check for that, and the planning stages assume it holds.
//
// `ChordNote` is the timing-free part of a note, carried by splitter walls
// for the chord members that do not get a main-path wall of their own.

use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// A single note onset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Milliseconds from the start of the sequence.
    pub time_ms: f64,
    /// MIDI key number.
    pub pitch: u8,
    /// MIDI velocity, 1..=127 for real onsets.
    pub velocity: u8,
    /// Index into the song's instrument table.
    pub instrument: u16,
}

impl NoteEvent {
    pub fn new(time_ms: f64, pitch: u8, velocity: u8, instrument: u16) -> Self {
        Self {
            time_ms,
            pitch,
            velocity,
            instrument,
        }
    }

    /// The note's identity without its timestamp.
    pub fn chord_note(&self) -> ChordNote {
        ChordNote {
            pitch: self.pitch,
            velocity: self.velocity,
            instrument: self.instrument,
        }
    }
}

/// Pitch, intensity and instrument of a note, as struck by a wall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChordNote {
    pub pitch: u8,
    pub velocity: u8,
    pub instrument: u16,
}

/// Check the planner's input precondition: finite, non-negative timestamps
/// in non-decreasing order. An empty list is valid.
pub fn validate_notes(notes: &[NoteEvent]) -> Result<(), InputError> {
    let mut previous: Option<f64> = None;
    for (index, note) in notes.iter().enumerate() {
        let time_ms = note.time_ms;
        if !time_ms.is_finite() || time_ms < 0.0 {
            return Err(InputError::InvalidTime { index, time_ms });
        }
        if let Some(previous_ms) = previous {
            if time_ms < previous_ms {
                return Err(InputError::Unsorted {
                    index,
                    time_ms,
                    previous_ms,
                });
            }
        }
        previous = Some(time_ms);
    }
    Ok(())
}
