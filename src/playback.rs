//! Playback map: joins the layout table with the trigger schedule so a
//! host can position and animate the playback cursor without re-deriving
//! either. The cursor x for a chord is the same `beat_to_x` mapping the
//! editor used to place the note — the two can never disagree.

use serde::Serialize;

use crate::layout::{compute_layout, LayoutConfig, LineBox, MeasureBox};
use crate::model::{InstrumentPart, LoopRegion, Partition};
use crate::timemap;

/// Complete playback map combining visual positions with timing data.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackMap {
    /// Visual position of each measure.
    pub measures: Vec<MeasureBox>,
    /// Visual position of each staff line (row).
    pub lines: Vec<LineBox>,
    /// One entry per chord onset in the playback window, in trigger
    /// order.
    pub chords: Vec<ChordEntry>,
    /// Duration of one pass over the window, in seconds.
    pub total_duration_s: f64,
    pub tempo: u32,
}

/// Timing and cursor data for one chord onset.
#[derive(Debug, Clone, Serialize)]
pub struct ChordEntry {
    pub measure: u32,
    pub beat: f64,
    /// Seconds from the start of the playback window
    pub offset_s: f64,
    /// Cursor x in page coordinates
    pub cursor_x: f64,
    /// Which staff line (row) the cursor is on
    pub line: u32,
    /// Parts sounding at this onset
    pub parts: Vec<InstrumentPart>,
}

/// Generate a playback map for a partition at the given layout.
///
/// This computes the same layout as the editor and only extracts the
/// positions — combined with the schedule it gives a host everything it
/// needs to animate the cursor and highlight sounding notes.
pub fn generate_playback_map(
    partition: &Partition,
    config: &LayoutConfig,
    loop_region: Option<LoopRegion>,
) -> PlaybackMap {
    let layout = compute_layout(partition, config);
    let schedule = timemap::build_schedule(partition, loop_region);

    let chords = schedule
        .iter()
        .filter_map(|chord| {
            let mb = layout.measure_box(chord.measure)?;
            let cursor_x = layout.note_x(chord.measure, chord.beat)?;
            Some(ChordEntry {
                measure: chord.measure,
                beat: chord.beat,
                offset_s: chord.offset_s,
                cursor_x,
                line: mb.line,
                parts: chord.notes.iter().map(|n| n.part).collect(),
            })
        })
        .collect();

    PlaybackMap {
        measures: layout.measures,
        lines: layout.lines,
        chords,
        total_duration_s: timemap::total_duration_s(partition, loop_region),
        tempo: partition.tempo,
    }
}

/// Serialize a PlaybackMap to JSON.
pub fn playback_map_to_json(map: &PlaybackMap) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}
