// MIDI input: Standard MIDI File -> note events for the layout engine.
//
// Reads an SMF (any format) with `midly` and flattens every track into one
// time-sorted list of note onsets. A single tempo applies to the whole file:
// the first Tempo meta event found in any track, or 120 BPM if there is
// none. Only metrical timing (ticks per beat) is supported.
//
// Note pairing is per track and per key, first in first out: a NoteOn with
// non-zero velocity opens a pending note, and a NoteOff (or NoteOn with
// velocity 0) closes the oldest pending note on that key. Notes that are
// never closed are dropped. Times are in milliseconds rounded to two
// decimals.
//
// Each distinct channel that carries notes becomes an instrument, numbered
// in ascending channel order, with a display name and colour taken from a
// fixed 16-entry palette.

use crate::error::EncodeError;
use midimarble_layout::NoteEvent;
use midimarble_layout::geom::round2;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;

/// Microseconds per beat when the file has no Tempo event (120 BPM).
pub const DEFAULT_TEMPO_US: u32 = 500_000;

/// Display colour per MIDI channel.
pub const CHANNEL_COLORS: [&str; 16] = [
    "#4FC3F7", "#FF7043", "#66BB6A", "#AB47BC", "#FFA726", "#EC407A", "#26C6DA", "#D4E157",
    "#8D6E63", "#78909C", "#5C6BC0", "#29B6F6", "#EF5350", "#9CCC65", "#FFCA28", "#BDBDBD",
];

/// Display name per MIDI channel.
pub const CHANNEL_NAMES: [&str; 16] = [
    "Piano",
    "Piano2",
    "Keys",
    "Organ",
    "Guitar",
    "Bass",
    "Strings",
    "Ensemble",
    "Brass",
    "Reed",
    "Pipe",
    "Synth Lead",
    "Synth Pad",
    "FX",
    "Ethnic",
    "Percussion",
];

/// One channel's entry in the instrument table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: u16,
    pub channel: u8,
    pub name: String,
    pub color: String,
}

/// Song-level metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongMeta {
    pub title: String,
    pub bpm: f64,
    /// End of the last note to start, ms.
    pub total_time_ms: f64,
}

/// A parsed MIDI file.
#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    /// Sorted by onset; `instrument` indexes `instruments`.
    pub notes: Vec<NoteEvent>,
    pub meta: SongMeta,
    pub instruments: Vec<Instrument>,
}

/// A closed note before instrument ids are assigned.
struct RawNote {
    time_ms: f64,
    duration_ms: f64,
    key: u8,
    velocity: u8,
    channel: u8,
}

/// Read and parse a MIDI file from disk.
pub fn read_midi(path: &Path) -> Result<Song, EncodeError> {
    let bytes = std::fs::read(path)?;
    parse_midi(&bytes)
}

/// Parse an in-memory SMF.
pub fn parse_midi(bytes: &[u8]) -> Result<Song, EncodeError> {
    let smf = Smf::parse(bytes)?;
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpb) => tpb.as_int(),
        Timing::Timecode(..) => return Err(EncodeError::UnsupportedTiming),
    };
    let tempo = first_tempo(&smf).unwrap_or(DEFAULT_TEMPO_US);
    let ms_per_tick = tempo as f64 / ticks_per_beat.max(1) as f64 / 1000.0;

    let mut raw: Vec<RawNote> = smf
        .tracks
        .iter()
        .flat_map(|track| track_notes(track, ms_per_tick))
        .collect();
    raw.sort_by(|a, b| a.time_ms.total_cmp(&b.time_ms));

    let channels: BTreeSet<u8> = raw.iter().map(|n| n.channel).collect();
    let instruments: Vec<Instrument> = channels
        .iter()
        .enumerate()
        .map(|(id, &channel)| Instrument {
            id: id as u16,
            channel,
            name: CHANNEL_NAMES[channel as usize % 16].to_string(),
            color: CHANNEL_COLORS[channel as usize % 16].to_string(),
        })
        .collect();
    let id_of: HashMap<u8, u16> = instruments.iter().map(|i| (i.channel, i.id)).collect();

    let total_time_ms = raw.last().map_or(0.0, |n| round2(n.time_ms + n.duration_ms));
    let notes = raw
        .iter()
        .map(|n| {
            let instrument = id_of.get(&n.channel).copied().unwrap_or(0);
            NoteEvent::new(n.time_ms, n.key, n.velocity, instrument)
        })
        .collect();

    log::debug!(
        "parsed MIDI: {} tracks, {} ticks/beat, tempo {} us/beat",
        smf.tracks.len(),
        ticks_per_beat,
        tempo
    );

    Ok(Song {
        notes,
        meta: SongMeta {
            title: title(&smf),
            bpm: round2(60_000_000.0 / tempo as f64),
            total_time_ms,
        },
        instruments,
    })
}

fn first_tempo(smf: &Smf) -> Option<u32> {
    smf.tracks.iter().flatten().find_map(|event| match event.kind {
        TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
        _ => None,
    })
}

fn title(smf: &Smf) -> String {
    smf.tracks
        .iter()
        .flatten()
        .find_map(|event| match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                let name = String::from_utf8_lossy(name).trim().to_string();
                (!name.is_empty()).then_some(name)
            }
            _ => None,
        })
        .unwrap_or_else(|| "Untitled".to_string())
}

/// Closed notes of one track, in the order they close.
fn track_notes(track: &[midly::TrackEvent], ms_per_tick: f64) -> Vec<RawNote> {
    let mut notes = Vec::new();
    // Pending onsets per key: (tick, velocity, channel).
    let mut pending: HashMap<u8, VecDeque<(u64, u8, u8)>> = HashMap::new();
    let mut tick: u64 = 0;
    for event in track {
        tick += event.delta.as_int() as u64;
        let TrackEventKind::Midi { channel, message } = event.kind else {
            continue;
        };
        let (key, on_velocity) = match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => (key.as_int(), Some(vel.as_int())),
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => (key.as_int(), None),
            _ => continue,
        };
        match on_velocity {
            Some(velocity) => pending
                .entry(key)
                .or_default()
                .push_back((tick, velocity, channel.as_int())),
            None => {
                let Some((on_tick, velocity, channel)) =
                    pending.get_mut(&key).and_then(VecDeque::pop_front)
                else {
                    continue;
                };
                let on_ms = on_tick as f64 * ms_per_tick;
                let off_ms = tick as f64 * ms_per_tick;
                notes.push(RawNote {
                    time_ms: round2(on_ms),
                    duration_ms: round2(off_ms - on_ms),
                    key,
                    velocity,
                    channel,
                });
            }
        }
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::num::{u4, u7, u15, u24, u28};
    use midly::{Format, Header, Track, TrackEvent};

    fn midi(delta: u32, channel: u8, message: MidiMessage) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(channel),
                message,
            },
        }
    }

    fn on(delta: u32, channel: u8, key: u8, vel: u8) -> TrackEvent<'static> {
        midi(
            delta,
            channel,
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        )
    }

    fn off(delta: u32, channel: u8, key: u8) -> TrackEvent<'static> {
        midi(
            delta,
            channel,
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        )
    }

    fn meta(message: MetaMessage<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(message),
        }
    }

    fn encode(tracks: Vec<Track<'static>>, timing: Timing) -> Vec<u8> {
        let mut smf = Smf::new(Header::new(Format::Parallel, timing));
        smf.tracks = tracks;
        let mut buf = Vec::new();
        smf.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn pairs_notes_and_converts_ticks() {
        // 480 ticks per beat at 100 BPM (600000 us/beat): 1 tick = 1.25 ms.
        let tempo = vec![
            meta(MetaMessage::TrackName(b"  Etude  ")),
            meta(MetaMessage::Tempo(u24::new(600_000))),
            meta(MetaMessage::EndOfTrack),
        ];
        let notes = vec![
            on(0, 2, 60, 100),
            on(0, 2, 64, 90),
            off(480, 2, 60),
            // NoteOn with velocity 0 closes too.
            on(0, 2, 64, 0),
            on(0, 5, 67, 80),
            off(240, 5, 67),
            meta(MetaMessage::EndOfTrack),
        ];
        let bytes = encode(vec![tempo, notes], Timing::Metrical(u15::new(480)));
        let song = parse_midi(&bytes).unwrap();

        assert_eq!(song.meta.title, "Etude");
        assert_eq!(song.meta.bpm, 100.0);
        assert_eq!(song.notes.len(), 3);
        assert_eq!(song.notes[0].time_ms, 0.0);
        assert_eq!(song.notes[2].time_ms, 600.0);
        assert_eq!(song.notes[2].pitch, 67);
        assert_eq!(song.meta.total_time_ms, 900.0);

        assert_eq!(song.instruments.len(), 2);
        assert_eq!(song.instruments[0].channel, 2);
        assert_eq!(song.instruments[0].name, "Keys");
        assert_eq!(song.instruments[1].color, "#EC407A");
        assert_eq!(song.notes[0].instrument, 0);
        assert_eq!(song.notes[2].instrument, 1);
    }

    #[test]
    fn repeated_key_pairs_first_in_first_out() {
        let track = vec![
            on(0, 0, 60, 100),
            on(100, 0, 60, 50),
            off(100, 0, 60),
            off(100, 0, 60),
            meta(MetaMessage::EndOfTrack),
        ];
        let bytes = encode(vec![track], Timing::Metrical(u15::new(500)));
        let song = parse_midi(&bytes).unwrap();
        // Default tempo: 500000 us/beat at 500 ticks/beat = 1 ms per tick.
        assert_eq!(song.meta.bpm, 120.0);
        assert_eq!(song.meta.title, "Untitled");
        assert_eq!(song.notes.len(), 2);
        assert_eq!(song.notes[0].velocity, 100);
        assert_eq!(song.notes[1].velocity, 50);
        assert_eq!(song.notes[1].time_ms, 100.0);
        // The first note closes at 200, the second at 300.
        assert_eq!(song.meta.total_time_ms, 300.0);
    }

    #[test]
    fn unclosed_notes_are_dropped() {
        let track = vec![on(0, 0, 60, 100), meta(MetaMessage::EndOfTrack)];
        let bytes = encode(vec![track], Timing::Metrical(u15::new(480)));
        let song = parse_midi(&bytes).unwrap();
        assert!(song.notes.is_empty());
        assert!(song.instruments.is_empty());
        assert_eq!(song.meta.total_time_ms, 0.0);
    }

    #[test]
    fn timecode_is_rejected() {
        let bytes = encode(
            vec![vec![meta(MetaMessage::EndOfTrack)]],
            Timing::Timecode(midly::Fps::Fps25, 40),
        );
        assert!(matches!(parse_midi(&bytes), Err(EncodeError::UnsupportedTiming)));
    }

    #[test]
    fn garbage_is_a_midi_error() {
        assert!(matches!(parse_midi(b"not a midi file"), Err(EncodeError::Midi(_))));
    }
}
