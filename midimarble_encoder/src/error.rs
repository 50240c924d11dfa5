// Error type for the encoder front and back ends.
//
// The layout engine itself is infallible; everything that can go wrong
// happens at the edges: reading and parsing the MIDI file, validating the
// extracted notes, and writing the `.mdbl` document.

use midimarble_layout::error::InputError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid MIDI file: {0}")]
    Midi(#[from] midly::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid note sequence: {0}")]
    Input(#[from] InputError),

    #[error("SMPTE timecode timing is not supported; re-export with ticks per beat")]
    UnsupportedTiming,

    #[error("No notes found in MIDI file")]
    NoNotes,
}
