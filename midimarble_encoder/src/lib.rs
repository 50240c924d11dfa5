// midimarble_encoder: MIDI in, `.mdbl` layout file out.
//
// Wraps the layout engine with its two external collaborators: the MIDI
// reader (`midi.rs`) and the layout-file writer (`mdbl.rs`). The binary in
// `main.rs` is a thin CLI over `encode_song`.
//
// Module overview:
// - `midi.rs`:  SMF parsing via `midly` -> Song (notes, meta, instruments).
// - `mdbl.rs`:  MdblDocument record types, bounds, JSON output.
// - `error.rs`: EncodeError.

pub mod error;
pub mod mdbl;
pub mod midi;

use error::EncodeError;
use mdbl::MdblDocument;
use midi::Song;
use midimarble_layout::{Layout, LayoutConfig, MarbleRng, plan_layout, validate_notes};

/// Validate, plan and assemble the document for a parsed song.
pub fn encode_song(
    song: &Song,
    config: &LayoutConfig,
    rng: &mut MarbleRng,
) -> Result<(Layout, MdblDocument), EncodeError> {
    if song.notes.is_empty() {
        return Err(EncodeError::NoNotes);
    }
    validate_notes(&song.notes)?;
    let layout = plan_layout(&song.notes, config, rng);
    let doc = mdbl::build_document(&layout, &song.meta, &song.instruments);
    Ok((layout, doc))
}
