//! Beam grouping — partitions a voice's notes into runs rendered under
//! a shared beam, and derives per-pair beam counts and the group's stem
//! direction.
//!
//! Groups never cross a measure or an integer beat boundary, and only
//! eighth, sixteenth, and thirty-second notes beam at all. Everything
//! else (quarters and longer, triplets, sixty-fourths, rests) comes out
//! as a standalone group of one.

use serde::Serialize;

use crate::model::{NoteEvent, Partition, StemDirection};

/// Staff-line offset of the middle line, in the units of
/// `InstrumentPart::line_offset`.
const MIDDLE_LINE_OFFSET: f64 = 2.0;

/// A run of notes sharing one beam (or a single unbeamed note).
#[derive(Debug, Clone, Serialize)]
pub struct BeamGroup {
    pub notes: Vec<NoteEvent>,
}

impl BeamGroup {
    /// Groups of one render as flagged/plain notes, not beams.
    pub fn is_beamed(&self) -> bool {
        self.notes.len() >= 2
    }

    /// Beam count for each adjacent pair (length `notes.len() - 1`).
    ///
    /// The count is pairwise, not group-wide: an eighth next to a
    /// sixteenth gets one shared beam there, while a sixteenth pair in
    /// the same group gets two. A thirty-second pair gets three.
    pub fn pair_beam_levels(&self) -> Vec<u8> {
        self.notes
            .windows(2)
            .map(|w| w[0].duration.beam_level().min(w[1].duration.beam_level()))
            .collect()
    }

    /// Stem direction for the whole group, decided by the single note
    /// farthest from the middle staff line: the beam sits on that
    /// note's side so stems stay short and clear of the other heads.
    /// When every note sits on the middle line, the voice default wins.
    pub fn stem_direction(&self) -> StemDirection {
        let mut farthest_offset = MIDDLE_LINE_OFFSET;
        let mut farthest_distance = 0.0;
        for note in &self.notes {
            let offset = note.part.line_offset();
            let distance = (offset - MIDDLE_LINE_OFFSET).abs();
            if distance > farthest_distance {
                farthest_distance = distance;
                farthest_offset = offset;
            }
        }
        if farthest_distance == 0.0 {
            return self
                .notes
                .first()
                .map_or(StemDirection::Down, |n| n.stem_direction());
        }
        if farthest_offset < MIDDLE_LINE_OFFSET {
            StemDirection::Up
        } else {
            StemDirection::Down
        }
    }
}

/// Whether `note` may join a group whose last member is `last`.
fn can_beam_with(note: &NoteEvent, last: &NoteEvent) -> bool {
    note.duration.is_beamable()
        && note.voice == last.voice
        && note.measure == last.measure
        && note.beat.floor() == last.beat.floor()
}

/// Partition one voice's `(measure, beat)`-sorted notes into beam
/// groups with a single left-to-right scan.
pub fn group_for_beaming(notes: &[&NoteEvent]) -> Vec<BeamGroup> {
    let mut groups: Vec<BeamGroup> = Vec::new();
    let mut current: Vec<NoteEvent> = Vec::new();

    for &note in notes {
        if !note.duration.is_beamable() {
            if !current.is_empty() {
                groups.push(BeamGroup {
                    notes: std::mem::take(&mut current),
                });
            }
            groups.push(BeamGroup {
                notes: vec![note.clone()],
            });
            continue;
        }
        match current.last() {
            Some(last) if !can_beam_with(note, last) => {
                groups.push(BeamGroup {
                    notes: std::mem::take(&mut current),
                });
                current.push(note.clone());
            }
            _ => current.push(note.clone()),
        }
    }
    if !current.is_empty() {
        groups.push(BeamGroup { notes: current });
    }
    groups
}

/// Beam groups for a whole partition: each voice grouped independently,
/// concatenated in voice order. Rendering draws every group — beamed
/// runs with stems joined, singletons as flagged notes or rests.
pub fn beam_groups(partition: &Partition) -> Vec<BeamGroup> {
    let mut groups = Vec::new();
    for voice in 1..=4 {
        let notes = partition.voice_notes(voice);
        groups.extend(group_for_beaming(&notes));
    }
    groups
}
