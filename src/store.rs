//! Note store — validated edits against a [`Partition`].
//!
//! Placement validation uses interval overlap: a note occupies the
//! half-open beat range `[beat, beat + duration)` within its measure,
//! and no two notes of the same `(measure, voice)` may intersect, nor
//! may a note extend past the measure's span. Because accepted
//! intervals are disjoint and in bounds, the per-voice duration sum can
//! never exceed the measure capacity.
//!
//! Rejected edits leave the partition untouched and are surfaced as an
//! [`EditOutcome`] plus a `tracing` warning — they never raise.

use tracing::warn;

use crate::error::StructuralError;
use crate::layout::LayoutConfig;
use crate::model::{
    Articulation, Document, InstrumentPart, NoteDuration, NoteEvent, Partition, TextAnnotation,
    TimeSignature,
};

/// Tolerance absorbing floating-point error in beat arithmetic
/// (triplet grids do not have exact binary representations).
pub const BEAT_EPSILON: f64 = 1e-6;

/// Why an edit was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum EditRejection {
    /// The candidate interval intersects another note of the same voice.
    Overlap { with_note: u64 },
    /// The candidate extends past the end of the measure.
    ExceedsMeasure,
    /// Target measure or beat is outside the partition.
    OutOfRange,
}

/// Result of [`insert_or_replace`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// A new note was added.
    Inserted(NoteEvent),
    /// An existing note at the same `(measure, beat, part)` was swapped
    /// for one with the new duration (fresh id).
    Replaced(NoteEvent),
    /// An identical note already exists; nothing changed.
    Unchanged,
    /// Validation failed; nothing changed.
    Rejected(EditRejection),
}

impl EditOutcome {
    /// True when the partition was mutated.
    pub fn applied(&self) -> bool {
        matches!(self, EditOutcome::Inserted(_) | EditOutcome::Replaced(_))
    }
}

fn intervals_overlap(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 < b.1 - BEAT_EPSILON && b.0 < a.1 - BEAT_EPSILON
}

/// Insert a note at a quantized position, replacing any note of the same
/// part at the same `(measure, beat)`.
///
/// The voice is derived from the part; validation only considers notes
/// sharing that voice. A same-duration duplicate is an idempotent no-op.
pub fn insert_or_replace(
    partition: &mut Partition,
    measure: u32,
    beat: f64,
    part: InstrumentPart,
    duration: NoteDuration,
    articulation: Option<Articulation>,
) -> EditOutcome {
    let qpm = partition.time_signature.quarters_per_measure();

    if measure >= partition.num_measures || beat < 0.0 {
        warn!(measure, beat, "note placement outside the score");
        return EditOutcome::Rejected(EditRejection::OutOfRange);
    }

    let voice = part.voice();
    let interval = (beat, beat + duration.in_quarters());

    if interval.1 > qpm + BEAT_EPSILON {
        warn!(measure, beat, ?duration, "note would extend past the measure");
        return EditOutcome::Rejected(EditRejection::ExceedsMeasure);
    }

    // A note of the same part at the same position is replaced, so it is
    // excluded from the overlap scan.
    let replaced = partition
        .notes
        .iter()
        .find(|n| {
            n.measure == measure && n.part == part && (n.beat - beat).abs() < BEAT_EPSILON
        })
        .map(|n| (n.id, n.duration));

    if let Some((_, existing_duration)) = replaced {
        if existing_duration == duration {
            return EditOutcome::Unchanged;
        }
    }

    let collision = partition.notes.iter().find(|n| {
        n.measure == measure
            && n.voice == voice
            && Some(n.id) != replaced.map(|(id, _)| id)
            && intervals_overlap(n.interval(), interval)
    });
    if let Some(other) = collision {
        warn!(
            measure,
            beat,
            voice,
            with = other.id,
            "note placement overlaps an existing note in the same voice"
        );
        return EditOutcome::Rejected(EditRejection::Overlap { with_note: other.id });
    }

    // Allocate before removing the replaced note so a replacement never
    // resurrects the id it displaced.
    let new_id = partition.alloc_note_id();
    let replacing = replaced.is_some();
    if let Some((old_id, _)) = replaced {
        partition.notes.retain(|n| n.id != old_id);
    }

    let note = NoteEvent {
        id: new_id,
        part,
        duration,
        beat,
        measure,
        voice,
        articulation,
    };
    partition.notes.push(note.clone());
    partition.sort_notes();

    if replacing {
        EditOutcome::Replaced(note)
    } else {
        EditOutcome::Inserted(note)
    }
}

/// Remove a note by id. Returns false when the id is unknown.
pub fn remove(partition: &mut Partition, note_id: u64) -> bool {
    let before = partition.notes.len();
    partition.notes.retain(|n| n.id != note_id);
    partition.notes.len() != before
}

/// Shift every note at or past `threshold` by `delta` measures and
/// adjust `num_measures` to match. Callers are responsible for pairing
/// this with the corresponding annotation translation.
pub fn shift_measures_from(partition: &mut Partition, threshold: u32, delta: i32) {
    for note in &mut partition.notes {
        if note.measure >= threshold {
            note.measure = note.measure.saturating_add_signed(delta);
        }
    }
    partition.num_measures = partition.num_measures.saturating_add_signed(delta).max(1);
    partition.sort_notes();
}

/// Delete all measures in `[start, end]` (inclusive) and renumber the
/// rest, keeping at least one measure.
pub fn delete_measure_range(partition: &mut Partition, start: u32, end: u32) {
    let end = end.min(partition.num_measures.saturating_sub(1));
    if start > end {
        return;
    }
    let count = end - start + 1;
    partition
        .notes
        .retain(|n| n.measure < start || n.measure > end);
    for note in &mut partition.notes {
        if note.measure > end {
            note.measure -= count;
        }
    }
    partition.num_measures = partition.num_measures.saturating_sub(count).max(1);
    partition.sort_notes();
}

/// Insert `count` empty measures before measure `at`.
pub fn insert_measures(partition: &mut Partition, at: u32, count: u32) {
    if count == 0 {
        return;
    }
    shift_measures_from(partition, at, count as i32);
}

/// Deep copy of one measure's notes, suitable for pasting elsewhere.
#[derive(Debug, Clone)]
pub struct MeasureSnapshot {
    notes: Vec<NoteEvent>,
}

impl MeasureSnapshot {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }
}

/// Snapshot the notes of measure `src`.
pub fn copy_measure(partition: &Partition, src: u32) -> MeasureSnapshot {
    MeasureSnapshot {
        notes: partition
            .notes
            .iter()
            .filter(|n| n.measure == src)
            .cloned()
            .collect(),
    }
}

/// Paste a measure snapshot at `dst`, replacing (not merging with) any
/// notes already there. Pasted notes get fresh ids.
pub fn paste_measure(partition: &mut Partition, snapshot: &MeasureSnapshot, dst: u32) {
    if dst >= partition.num_measures {
        warn!(dst, "paste target measure outside the score");
        return;
    }
    partition.notes.retain(|n| n.measure != dst);
    let mut next_id = partition.alloc_note_id();
    for src_note in &snapshot.notes {
        let mut note = src_note.clone();
        note.id = next_id;
        note.measure = dst;
        next_id += 1;
        partition.notes.push(note);
    }
    partition.sort_notes();
}

/// Replace the time signature. Destructive by policy: all notes are
/// cleared, since beats quantized under the old grid have no meaningful
/// position under the new one. Callers gate this behind a confirmation.
pub fn set_time_signature(
    partition: &mut Partition,
    ts: TimeSignature,
) -> Result<(), StructuralError> {
    if !ts.is_valid() {
        return Err(StructuralError::InvalidTimeSignature {
            top: ts.top,
            bottom: ts.bottom,
        });
    }
    if ts != partition.time_signature {
        partition.notes.clear();
        partition.time_signature = ts;
    }
    Ok(())
}

// ── Line-level structural edits ─────────────────────────────────────

/// Number of staff lines currently needed by the partition.
pub fn line_count(partition: &Partition, config: &LayoutConfig) -> u32 {
    let mpl = config.measures_per_line.max(1);
    partition.num_measures.div_ceil(mpl).max(1)
}

/// Translate annotations vertically when lines are inserted or removed
/// at `threshold_line`. Annotations on removed lines are dropped by
/// [`delete_line`] before the shift.
fn shift_annotation_lines_from(
    partition: &mut Partition,
    config: &LayoutConfig,
    threshold_line: u32,
    delta_lines: i32,
) {
    let stride = config.line_stride();
    for ann in &mut partition.text_annotations {
        if config.line_of_y(ann.y) >= threshold_line {
            ann.y += delta_lines as f64 * stride;
        }
    }
}

/// Insert an empty staff line (one row of measures) before `line`,
/// shifting later notes and annotations down together.
pub fn insert_line(partition: &mut Partition, config: &LayoutConfig, line: u32) {
    let at = line * config.measures_per_line;
    shift_measures_from(partition, at, config.measures_per_line as i32);
    shift_annotation_lines_from(partition, config, line, 1);
}

/// Delete staff line `line` with its measures and annotations, pulling
/// everything after it up. Refused when it is the only line.
pub fn delete_line(
    partition: &mut Partition,
    config: &LayoutConfig,
    line: u32,
) -> Result<(), StructuralError> {
    let lines = line_count(partition, config);
    if lines <= 1 {
        return Err(StructuralError::LastLine);
    }
    if line >= lines {
        return Ok(());
    }
    let start = line * config.measures_per_line;
    let end = ((line + 1) * config.measures_per_line - 1).min(partition.num_measures - 1);

    partition
        .text_annotations
        .retain(|a| config.line_of_y(a.y) != line);
    delete_measure_range(partition, start, end);
    shift_annotation_lines_from(partition, config, line + 1, -1);
    Ok(())
}

// ── Text annotations ────────────────────────────────────────────────

/// Add a free text annotation and return its id.
pub fn add_text(partition: &mut Partition, text: impl Into<String>, x: f64, y: f64) -> u64 {
    let id = partition.alloc_annotation_id();
    partition.text_annotations.push(TextAnnotation {
        id,
        text: text.into(),
        x,
        y,
        font_size: 14.0,
        font_weight: None,
        font_style: None,
    });
    id
}

/// Move an annotation. Returns false when the id is unknown.
pub fn move_text(partition: &mut Partition, id: u64, x: f64, y: f64) -> bool {
    match partition.text_annotations.iter_mut().find(|a| a.id == id) {
        Some(ann) => {
            ann.x = x;
            ann.y = y;
            true
        }
        None => false,
    }
}

/// Remove an annotation by id.
pub fn remove_text(partition: &mut Partition, id: u64) -> bool {
    let before = partition.text_annotations.len();
    partition.text_annotations.retain(|a| a.id != id);
    partition.text_annotations.len() != before
}

// ── Document-level operations ───────────────────────────────────────

/// Append a fresh empty partition and make it current. Returns its
/// index.
pub fn add_partition(document: &mut Document, name: impl Into<String>) -> usize {
    let id = document
        .partitions
        .iter()
        .map(|p| p.id)
        .max()
        .map_or(1, |m| m + 1);
    document.partitions.push(Partition::new(id, name));
    document.current = document.partitions.len() - 1;
    document.current
}

/// Delete a partition. Refused when it is the last one remaining.
pub fn delete_partition(document: &mut Document, index: usize) -> Result<(), StructuralError> {
    if index >= document.partitions.len() {
        return Err(StructuralError::PartitionOutOfRange(index));
    }
    if document.partitions.len() == 1 {
        return Err(StructuralError::LastPartition);
    }
    document.partitions.remove(index);
    if document.current >= document.partitions.len() {
        document.current = document.partitions.len() - 1;
    }
    Ok(())
}

/// Switch the current partition.
pub fn select_partition(document: &mut Document, index: usize) -> Result<(), StructuralError> {
    if index >= document.partitions.len() {
        return Err(StructuralError::PartitionOutOfRange(index));
    }
    document.current = index;
    Ok(())
}
