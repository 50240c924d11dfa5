// Chord grouping and merge-target marking.
//
// `group_notes` is a single streaming pass over the time-sorted note list.
// A note joins the open group when it starts less than the chord threshold
// after the group's *last* note (so a rolled chord can span more than the
// threshold in total); otherwise the open group closes and a new one starts.
// Groups with more than one note are chords and become splitter walls.
//
// `mark_merge_targets` then decides, for every chord, which later group
// its sub-paths converge on: the first non-chord group far enough away,
// estimated as `speed(candidate) * dt`, to leave room for the sub-path
// fan. Chords with no such group are left unmarked; the chord planner
// synthesizes a merge point for them.
//
// See also: `velocity.rs` for the per-group speeds fed into the marking,
// `chord.rs` for the planner that consumes the resulting merger walls.

use crate::note::{ChordNote, NoteEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Notes treated as simultaneous.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Member notes in input order; never empty.
    pub notes: Vec<NoteEvent>,
}

impl Group {
    pub fn is_chord(&self) -> bool {
        self.notes.len() > 1
    }

    /// The note struck by this group's main-path wall.
    pub fn representative(&self) -> &NoteEvent {
        &self.notes[0]
    }

    /// Group timestamp: the representative's onset.
    pub fn time_ms(&self) -> f64 {
        self.notes[0].time_ms
    }

    /// Chord members after the representative.
    pub fn extra_notes(&self) -> Vec<ChordNote> {
        self.notes[1..].iter().map(NoteEvent::chord_note).collect()
    }
}

/// Partition time-sorted notes into groups.
pub fn group_notes(notes: &[NoteEvent], threshold_ms: f64) -> Vec<Group> {
    let mut groups = Vec::new();
    let mut current: Vec<NoteEvent> = Vec::new();
    for &note in notes {
        if let Some(last) = current.last() {
            if note.time_ms - last.time_ms >= threshold_ms {
                groups.push(Group {
                    notes: std::mem::take(&mut current),
                });
            }
        }
        current.push(note);
    }
    if !current.is_empty() {
        groups.push(Group { notes: current });
    }
    groups
}

/// Indices of groups that serve as the merge target of some chord.
///
/// `speeds` must hold one entry per group.
pub fn mark_merge_targets(groups: &[Group], speeds: &[f64], min_gap: f64) -> BTreeSet<usize> {
    let mut targets = BTreeSet::new();
    for (i, chord) in groups.iter().enumerate() {
        if !chord.is_chord() {
            continue;
        }
        let target = (i + 1..groups.len()).find(|&j| {
            let dt_s = (groups[j].time_ms() - chord.time_ms()) / 1000.0;
            let estimated = speeds.get(j).map_or(min_gap, |s| s * dt_s);
            !groups[j].is_chord() && estimated >= min_gap
        });
        if let Some(j) = target {
            targets.insert(j);
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(t: f64, pitch: u8) -> NoteEvent {
        NoteEvent::new(t, pitch, 100, 0)
    }

    #[test]
    fn empty_input_no_groups() {
        assert!(group_notes(&[], 50.0).is_empty());
    }

    #[test]
    fn simultaneous_notes_form_chord() {
        let notes = [n(0.0, 60), n(0.0, 64), n(0.0, 67), n(800.0, 72)];
        let groups = group_notes(&notes, 50.0);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].is_chord());
        assert_eq!(groups[0].notes.len(), 3);
        assert_eq!(groups[0].representative().pitch, 60);
        assert_eq!(groups[0].extra_notes().len(), 2);
        assert!(!groups[1].is_chord());
        assert_eq!(groups[1].time_ms(), 800.0);
    }

    #[test]
    fn gap_is_measured_from_last_note() {
        // 0 -> 40 -> 80: each step under 50 ms, total span 80 ms.
        let notes = [n(0.0, 60), n(40.0, 62), n(80.0, 64), n(130.0, 65)];
        let groups = group_notes(&notes, 50.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].notes.len(), 3);
        // Exactly the threshold starts a new group.
        assert_eq!(groups[1].notes.len(), 1);
    }

    #[test]
    fn merge_target_is_first_distant_single() {
        let groups = group_notes(
            &[
                n(0.0, 60),
                n(0.0, 64),
                n(10.0, 67),
                n(70.0, 70),
                n(70.0, 74),
                n(300.0, 72),
                n(900.0, 72),
            ],
            50.0,
        );
        // [chord@0], [chord@70], [single@300], [single@900]
        assert_eq!(groups.len(), 4);
        let speeds = vec![100.0; groups.len()];
        let targets = mark_merge_targets(&groups, &speeds, 25.0);
        // Both chords skip the chord candidate and land on the 300 ms single
        // (0.3 s * 100 px/s = 30 px >= 25 px; 0.23 s * 100 = 23 px < 25 for
        // the second chord, so it goes on to 900 ms).
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn chord_without_candidate_left_unmarked() {
        let groups = group_notes(&[n(0.0, 60), n(0.0, 64)], 50.0);
        let targets = mark_merge_targets(&groups, &[300.0], 25.0);
        assert!(targets.is_empty());
    }
}
