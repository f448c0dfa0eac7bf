//! Compute trigger offsets for every note in the playback window.
//! This is the bridge between the note store and the player — it
//! answers "when does each chord sound?" and "how long is one pass?"
//! in seconds relative to the window's start.
//!
//! All positions are quarter-note units; `seconds_per_quarter` is the
//! single tempo conversion, so the grid, the store, and the schedule
//! agree on where a beat falls.

use crate::model::{Articulation, InstrumentPart, LoopRegion, NoteDuration, Partition};

/// Lead of the flam grace hit before the nominal time, in seconds.
pub const FLAM_GRACE_OFFSET_S: f64 = 0.03;
/// Interval between buzz-roll re-triggers, in seconds.
pub const BUZZ_ROLL_INTERVAL_S: f64 = 0.05;

/// Beats within this distance are the same chord onset.
const CHORD_EPSILON: f64 = 1e-6;

/// Seconds per quarter-note beat at the given tempo.
pub fn seconds_per_quarter(tempo: u32) -> f64 {
    60.0 / tempo.max(1) as f64
}

/// The measure range playback covers: the loop region when set, the
/// whole score otherwise. Returns `(first_measure, measure_count)`.
pub fn playback_window(partition: &Partition, loop_region: Option<LoopRegion>) -> (u32, u32) {
    match loop_region {
        Some(region) => {
            let start = region.start_measure.min(partition.num_measures.saturating_sub(1));
            let end = region.end_measure.min(partition.num_measures.saturating_sub(1));
            (start, end.saturating_sub(start) + 1)
        }
        None => (0, partition.num_measures),
    }
}

/// Duration of one pass over the window, in seconds.
pub fn total_duration_s(partition: &Partition, loop_region: Option<LoopRegion>) -> f64 {
    let (_, measures) = playback_window(partition, loop_region);
    let qpm = partition.time_signature.quarters_per_measure();
    measures as f64 * qpm * seconds_per_quarter(partition.tempo)
}

/// One note's triggers within a chord. Articulations are expanded here,
/// at schedule time: a flam gains a grace trigger just before the
/// nominal one, a buzz roll re-triggers across the note's duration.
#[derive(Debug, Clone)]
pub struct ScheduledNote {
    pub part: InstrumentPart,
    pub duration: NoteDuration,
    pub articulation: Option<Articulation>,
    /// Offsets in seconds from the window start, ascending. Always
    /// contains the nominal onset; articulation variants add more.
    pub trigger_offsets_s: Vec<f64>,
}

/// All notes sounding at one `(measure, beat)` position, triggered
/// together.
#[derive(Debug, Clone)]
pub struct ChordEvent {
    pub measure: u32,
    /// Beat within the measure, quarter-note units
    pub beat: f64,
    /// Nominal onset in seconds from the window start
    pub offset_s: f64,
    pub notes: Vec<ScheduledNote>,
}

fn expand_articulation(
    nominal_s: f64,
    duration_s: f64,
    articulation: Option<Articulation>,
) -> Vec<f64> {
    match articulation {
        None => vec![nominal_s],
        Some(Articulation::Flam) => vec![nominal_s - FLAM_GRACE_OFFSET_S, nominal_s],
        Some(Articulation::BuzzRoll) => {
            let count = ((duration_s - 1e-9) / BUZZ_ROLL_INTERVAL_S).ceil().max(1.0) as usize;
            (0..count)
                .map(|k| nominal_s + k as f64 * BUZZ_ROLL_INTERVAL_S)
                .collect()
        }
    }
}

/// Build the ordered chord schedule for one pass over the playback
/// window. Rests occupy time but trigger nothing, so they are skipped.
///
/// Trigger offsets come out monotonically non-decreasing because the
/// note store keeps notes sorted by `(measure, beat)` — no further
/// ordering pass is needed.
pub fn build_schedule(
    partition: &Partition,
    loop_region: Option<LoopRegion>,
) -> Vec<ChordEvent> {
    let (first_measure, measure_count) = playback_window(partition, loop_region);
    let last_measure = first_measure + measure_count - 1;
    let qpm = partition.time_signature.quarters_per_measure();
    let spq = seconds_per_quarter(partition.tempo);

    let mut chords: Vec<ChordEvent> = Vec::new();

    for note in &partition.notes {
        if note.measure < first_measure || note.measure > last_measure {
            continue;
        }
        if note.part == InstrumentPart::Rest {
            continue;
        }

        let absolute_beat = (note.measure - first_measure) as f64 * qpm + note.beat;
        let nominal_s = absolute_beat * spq;
        let duration_s = note.duration.in_quarters() * spq;

        let scheduled = ScheduledNote {
            part: note.part,
            duration: note.duration,
            articulation: note.articulation,
            trigger_offsets_s: expand_articulation(nominal_s, duration_s, note.articulation),
        };

        match chords.last_mut() {
            Some(chord)
                if chord.measure == note.measure
                    && (chord.beat - note.beat).abs() < CHORD_EPSILON =>
            {
                chord.notes.push(scheduled);
            }
            _ => chords.push(ChordEvent {
                measure: note.measure,
                beat: note.beat,
                offset_s: nominal_s,
                notes: vec![scheduled],
            }),
        }
    }

    chords
}

/// Continuous cursor position: map elapsed seconds to a score position,
/// folding into the window by modulo when looping. Returns None once a
/// non-looping pass has run out.
pub fn cursor_beat_at(
    partition: &Partition,
    loop_region: Option<LoopRegion>,
    elapsed_s: f64,
    looping: bool,
) -> Option<(u32, f64)> {
    if elapsed_s < 0.0 {
        return None;
    }
    let (first_measure, measure_count) = playback_window(partition, loop_region);
    let qpm = partition.time_signature.quarters_per_measure();
    let window_quarters = measure_count as f64 * qpm;

    let mut absolute = elapsed_s / seconds_per_quarter(partition.tempo);
    if looping {
        absolute %= window_quarters;
    } else if absolute >= window_quarters {
        return None;
    }

    let measure_in_window = (absolute / qpm) as u32;
    let beat = absolute - measure_in_window as f64 * qpm;
    Some((first_measure + measure_in_window, beat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeSignature;
    use crate::store;

    fn partition_with(notes: &[(u32, f64, InstrumentPart, NoteDuration)]) -> Partition {
        let mut p = Partition::new(1, "test");
        for &(measure, beat, part, duration) in notes {
            let outcome = store::insert_or_replace(&mut p, measure, beat, part, duration, None);
            assert!(outcome.applied(), "fixture insert rejected: {outcome:?}");
        }
        p
    }

    #[test]
    fn note_offset_matches_tempo_math() {
        // 120 bpm in 4/4: half a second per quarter, so (measure 1,
        // beat 2) sounds at (1 × 4 + 2) × 0.5 = 3.0 s.
        let p = partition_with(&[(1, 2.0, InstrumentPart::Snare, NoteDuration::Quarter)]);
        let schedule = build_schedule(&p, None);
        assert_eq!(schedule.len(), 1);
        assert!((schedule[0].offset_s - 3.0).abs() < 1e-9);
    }

    #[test]
    fn loop_window_duration_and_offsets() {
        let p = partition_with(&[
            (0, 0.0, InstrumentPart::BassDrum, NoteDuration::Quarter),
            (1, 2.0, InstrumentPart::Snare, NoteDuration::Quarter),
            (3, 0.0, InstrumentPart::Snare, NoteDuration::Quarter),
        ]);
        let region = LoopRegion { start_measure: 0, end_measure: 1 };
        assert!((total_duration_s(&p, Some(region)) - 4.0).abs() < 1e-9);

        // The measure-3 note is outside the loop window.
        let schedule = build_schedule(&p, Some(region));
        assert_eq!(schedule.len(), 2);
        assert!((schedule[1].offset_s - 3.0).abs() < 1e-9);
    }

    #[test]
    fn simultaneous_parts_form_one_chord() {
        let p = partition_with(&[
            (0, 1.0, InstrumentPart::BassDrum, NoteDuration::Quarter),
            (0, 1.0, InstrumentPart::HiHatClosed, NoteDuration::Quarter),
        ]);
        let schedule = build_schedule(&p, None);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].notes.len(), 2);
    }

    #[test]
    fn rests_are_silent() {
        let p = partition_with(&[
            (0, 0.0, InstrumentPart::Rest, NoteDuration::Half),
            (0, 2.0, InstrumentPart::Snare, NoteDuration::Quarter),
        ]);
        let schedule = build_schedule(&p, None);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].notes[0].part, InstrumentPart::Snare);
    }

    #[test]
    fn flam_adds_a_grace_trigger() {
        let p = {
            let mut p = Partition::new(1, "test");
            store::insert_or_replace(
                &mut p,
                0,
                1.0,
                InstrumentPart::Snare,
                NoteDuration::Quarter,
                Some(Articulation::Flam),
            );
            p
        };
        let schedule = build_schedule(&p, None);
        let offsets = &schedule[0].notes[0].trigger_offsets_s;
        assert_eq!(offsets.len(), 2);
        assert!((offsets[0] - (0.5 - FLAM_GRACE_OFFSET_S)).abs() < 1e-9);
        assert!((offsets[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn buzz_roll_spans_the_note_duration() {
        let p = {
            let mut p = Partition::new(1, "test");
            store::insert_or_replace(
                &mut p,
                0,
                0.0,
                InstrumentPart::Snare,
                NoteDuration::Quarter,
                Some(Articulation::BuzzRoll),
            );
            p
        };
        // A quarter at 120 bpm lasts 0.5 s: re-triggers at 0, 50, …,
        // 450 ms.
        let schedule = build_schedule(&p, None);
        let offsets = &schedule[0].notes[0].trigger_offsets_s;
        assert_eq!(offsets.len(), 10);
        assert!((offsets[9] - 0.45).abs() < 1e-9);
    }

    #[test]
    fn cursor_folds_into_the_loop_window() {
        let mut p = partition_with(&[(0, 0.0, InstrumentPart::Snare, NoteDuration::Quarter)]);
        p.time_signature = TimeSignature::new(4, 4);
        let region = LoopRegion { start_measure: 0, end_measure: 1 };

        // 4.0 s per pass; 5.0 s elapsed is beat 2 of measure 0 again.
        let (measure, beat) = cursor_beat_at(&p, Some(region), 5.0, true).unwrap();
        assert_eq!(measure, 0);
        assert!((beat - 2.0).abs() < 1e-9);

        // Without looping the same elapsed time is past the end.
        assert_eq!(cursor_beat_at(&p, Some(region), 5.0, false), None);
    }
}
