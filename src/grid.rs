//! Time grid — bidirectional mapping between a horizontal position
//! inside a measure's note area and a quantized beat value.
//!
//! Both directions share one linear formula: if they ever diverge, the
//! visual note position disagrees with the stored grid value.

use crate::model::NoteDuration;

/// Snap a horizontal offset inside a measure's note area to the nearest
/// grid point for the selected duration.
///
/// `quarters_per_measure` comes from
/// `TimeSignature::quarters_per_measure()`; the returned beat is in
/// quarter-note units with a denominator dividing the duration's
/// `grid_subdivision()`. The result is never negative and can exceed
/// the measure span by at most one grid step near the right edge — the
/// note store enforces capacity separately.
pub fn quantize_beat(
    x_in_note_area: f64,
    note_area_width: f64,
    quarters_per_measure: f64,
    duration: NoteDuration,
) -> f64 {
    if note_area_width <= 0.0 {
        return 0.0;
    }
    let subdivision = duration.grid_subdivision() as f64;
    let beat = (x_in_note_area / note_area_width) * quarters_per_measure;
    ((beat * subdivision).round() / subdivision).max(0.0)
}

/// Exact algebraic inverse of [`quantize_beat`]'s linear model: the
/// horizontal offset of a beat inside the note area.
pub fn beat_to_x(beat: f64, note_area_width: f64, quarters_per_measure: f64) -> f64 {
    if quarters_per_measure <= 0.0 {
        return 0.0;
    }
    beat / quarters_per_measure * note_area_width
}
