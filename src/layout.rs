//! Layout computation — positions and sizes of measures and staff lines,
//! and the mapping between pointer coordinates and score positions.
//!
//! Rendering consumes the forward mapping (measure boxes, note x/y,
//! cursor geometry); pointer input consumes the inverse mapping
//! ([`ScoreLayout::locate`]), which feeds [`crate::grid::quantize_beat`].
//! Both share the same measure table, so a note lands exactly where the
//! click snapped.

use serde::Serialize;

use crate::grid;
use crate::model::{InstrumentPart, NoteDuration, Partition};

// ── Staff dimensions (SVG user units) ───────────────────────────────
pub const STAFF_HEIGHT: f64 = 120.0;
pub const STAFF_LINE_GAP: f64 = 12.0; // distance between staff lines
pub const STAFF_VERTICAL_GAP: f64 = 80.0; // space between staff lines (rows)
pub const STAFF_Y_OFFSET: f64 = 50.0; // top staff line within a row
pub const STAFF_X_OFFSET: f64 = 20.0;
pub const CLEF_WIDTH: f64 = 50.0;
pub const TIME_SIGNATURE_WIDTH: f64 = 30.0;
pub const MEASURE_PADDING_HORIZONTAL: f64 = 15.0;

// ── Measure packing ─────────────────────────────────────────────────
pub const PER_QUARTER_WIDTH: f64 = 70.0;
pub const MIN_MEASURE_WIDTH: f64 = 120.0;

/// Layout parameters that are host configuration rather than score data.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Measures per staff line (row)
    pub measures_per_line: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { measures_per_line: 4 }
    }
}

impl LayoutConfig {
    /// Vertical distance from one staff line (row) to the next.
    pub fn line_stride(&self) -> f64 {
        STAFF_HEIGHT + STAFF_VERTICAL_GAP
    }

    /// Which staff line (row) a y coordinate falls on.
    pub fn line_of_y(&self, y: f64) -> u32 {
        if y <= 0.0 {
            return 0;
        }
        (y / self.line_stride()) as u32
    }

    /// X where the first measure of every line starts (after clef and
    /// time signature).
    pub fn measures_start_x(&self) -> f64 {
        STAFF_X_OFFSET + CLEF_WIDTH + TIME_SIGNATURE_WIDTH
    }
}

/// Position of one measure in page coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct MeasureBox {
    pub measure: u32,
    /// Staff line (row) this measure sits on
    pub line: u32,
    /// Left edge in page coordinates
    pub x: f64,
    pub width: f64,
}

impl MeasureBox {
    /// Left edge of the playable note area (inside the padding).
    pub fn note_area_x(&self) -> f64 {
        self.x + MEASURE_PADDING_HORIZONTAL
    }

    pub fn note_area_width(&self) -> f64 {
        self.width - 2.0 * MEASURE_PADDING_HORIZONTAL
    }
}

/// Position of one staff line (row).
#[derive(Debug, Clone, Serialize)]
pub struct LineBox {
    pub line: u32,
    /// Top of the row block in page coordinates
    pub y: f64,
    pub height: f64,
}

/// Playback cursor geometry: a vertical line spanning the staff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cursor {
    pub x: f64,
    pub y1: f64,
    pub y2: f64,
}

/// Where a pointer event landed, ready for quantization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerHit {
    pub measure: u32,
    pub line: u32,
    /// Horizontal offset inside the measure's note area
    pub x_in_note_area: f64,
    pub note_area_width: f64,
}

/// Complete layout table for one partition.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreLayout {
    pub measures: Vec<MeasureBox>,
    pub lines: Vec<LineBox>,
    pub total_width: f64,
    pub total_height: f64,
    quarters_per_measure: f64,
    #[serde(skip)]
    line_stride: f64,
}

/// Width multiplier from the finest subdivision present in a measure.
/// Dense measures get more room so sixteenth clusters stay readable.
fn density_factor(finest_subdivision: u32) -> f64 {
    match finest_subdivision {
        0 | 1 => 1.0,
        2 => 1.25,
        3 | 4 => 1.5,
        _ => 1.75,
    }
}

fn measure_width(partition: &Partition, measure: u32) -> f64 {
    let qpm = partition.time_signature.quarters_per_measure();
    let base = (qpm * PER_QUARTER_WIDTH).max(MIN_MEASURE_WIDTH);

    let finest = partition
        .notes
        .iter()
        .filter(|n| n.measure == measure)
        .map(|n| n.duration.grid_subdivision())
        .max()
        .unwrap_or(1);

    base * density_factor(finest)
}

/// Compute the full layout for a partition.
pub fn compute_layout(partition: &Partition, config: &LayoutConfig) -> ScoreLayout {
    let mpl = config.measures_per_line.max(1);
    let num_lines = partition.num_measures.div_ceil(mpl).max(1);
    let stride = config.line_stride();

    let mut measures = Vec::with_capacity(partition.num_measures as usize);
    let mut max_line_end = config.measures_start_x();

    for line in 0..num_lines {
        let mut x = config.measures_start_x();
        let first = line * mpl;
        let last = ((line + 1) * mpl).min(partition.num_measures);
        for m in first..last {
            let w = measure_width(partition, m);
            measures.push(MeasureBox {
                measure: m,
                line,
                x,
                width: w,
            });
            x += w;
        }
        max_line_end = max_line_end.max(x);
    }

    let lines = (0..num_lines)
        .map(|line| LineBox {
            line,
            y: line as f64 * stride,
            height: STAFF_HEIGHT,
        })
        .collect();

    ScoreLayout {
        measures,
        lines,
        total_width: max_line_end + STAFF_X_OFFSET,
        total_height: num_lines as f64 * STAFF_HEIGHT
            + (num_lines as f64 - 1.0) * STAFF_VERTICAL_GAP
            + 20.0,
        quarters_per_measure: partition.time_signature.quarters_per_measure(),
        line_stride: stride,
    }
}

impl ScoreLayout {
    pub fn measure_box(&self, measure: u32) -> Option<&MeasureBox> {
        self.measures.iter().find(|mb| mb.measure == measure)
    }

    /// Page x of a beat inside a measure. None when the measure is
    /// outside the score.
    pub fn note_x(&self, measure: u32, beat: f64) -> Option<f64> {
        let mb = self.measure_box(measure)?;
        Some(
            mb.note_area_x()
                + grid::beat_to_x(beat, mb.note_area_width(), self.quarters_per_measure),
        )
    }

    /// Page y of an instrument part on a given staff line (row).
    pub fn part_y(&self, line: u32, part: InstrumentPart) -> f64 {
        line as f64 * self.line_stride + STAFF_Y_OFFSET + part.line_offset() * STAFF_LINE_GAP
    }

    /// Cursor geometry for a playback position.
    pub fn cursor_at(&self, measure: u32, beat_in_measure: f64) -> Option<Cursor> {
        let mb = self.measure_box(measure)?;
        let x = self.note_x(measure, beat_in_measure)?;
        let line_y = mb.line as f64 * self.line_stride;
        Some(Cursor {
            x,
            y1: line_y + STAFF_Y_OFFSET - STAFF_LINE_GAP,
            y2: line_y + STAFF_Y_OFFSET + 5.0 * STAFF_LINE_GAP,
        })
    }

    /// Inverse mapping: which measure's note area a pointer position
    /// falls in. None outside every note area (margins, clef column,
    /// padding, below the last line).
    pub fn locate(&self, x: f64, y: f64) -> Option<PointerHit> {
        if y < 0.0 {
            return None;
        }
        let line = (y / self.line_stride) as u32;
        if line as usize >= self.lines.len() {
            return None;
        }

        let mb = self
            .measures
            .iter()
            .find(|mb| mb.line == line && x >= mb.x && x < mb.x + mb.width)?;

        let x_in_note_area = x - mb.note_area_x();
        if x_in_note_area < 0.0 || x_in_note_area > mb.note_area_width() {
            return None;
        }

        Some(PointerHit {
            measure: mb.measure,
            line,
            x_in_note_area,
            note_area_width: mb.note_area_width(),
        })
    }

    pub fn quarters_per_measure(&self) -> f64 {
        self.quarters_per_measure
    }
}

/// Convenience: pointer position + selected duration → quantized
/// placement target, or None outside any note area.
pub fn locate_and_quantize(
    layout: &ScoreLayout,
    x: f64,
    y: f64,
    duration: NoteDuration,
) -> Option<(u32, f64)> {
    let hit = layout.locate(x, y)?;
    let beat = grid::quantize_beat(
        hit.x_in_note_area,
        hit.note_area_width,
        layout.quarters_per_measure,
        duration,
    );
    Some((hit.measure, beat))
}
