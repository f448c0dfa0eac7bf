//! Data model for a percussion score.
//!
//! These structures capture the musical information needed for staff
//! layout, beaming, and audio playback. Beat values are quarter-note
//! units everywhere: a half note spans 2.0 beat units regardless of the
//! time signature denominator.

use serde::{Deserialize, Serialize};

/// A drum-kit instrument part, or an explicit rest.
///
/// Every part has exactly one voice, one notehead shape, and one staff
/// position — the tables below are exhaustive matches so a new variant
/// cannot be added without extending them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstrumentPart {
    BassDrum,
    Snare,
    HiHatClosed,
    CrashCymbal,
    RideCymbal,
    HighTom,
    MidTom,
    FloorTom,
    Rest,
}

/// Notehead shape used by rendering consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notehead {
    Normal,
    X,
    Rest,
}

impl InstrumentPart {
    /// Voice assignment: cymbals/hi-hat → 1, snare/toms → 2,
    /// bass drum → 3, rests → 4. Voices group notes for stem direction
    /// and per-measure capacity accounting.
    pub fn voice(self) -> u8 {
        match self {
            InstrumentPart::HiHatClosed
            | InstrumentPart::CrashCymbal
            | InstrumentPart::RideCymbal => 1,
            InstrumentPart::Snare
            | InstrumentPart::HighTom
            | InstrumentPart::MidTom
            | InstrumentPart::FloorTom => 2,
            InstrumentPart::BassDrum => 3,
            InstrumentPart::Rest => 4,
        }
    }

    /// Staff position in staff-line units measured from the top line
    /// (0 = top line, 4 = bottom line; halves are spaces).
    pub fn line_offset(self) -> f64 {
        match self {
            InstrumentPart::CrashCymbal => -1.0,
            InstrumentPart::HiHatClosed => -0.5,
            InstrumentPart::RideCymbal => 0.0,
            InstrumentPart::HighTom => 0.5,
            InstrumentPart::MidTom => 1.5,
            InstrumentPart::Snare => 2.0,
            InstrumentPart::FloorTom => 3.0,
            InstrumentPart::BassDrum => 4.0,
            InstrumentPart::Rest => 2.0,
        }
    }

    pub fn notehead(self) -> Notehead {
        match self {
            InstrumentPart::CrashCymbal
            | InstrumentPart::HiHatClosed
            | InstrumentPart::RideCymbal => Notehead::X,
            InstrumentPart::BassDrum
            | InstrumentPart::Snare
            | InstrumentPart::HighTom
            | InstrumentPart::MidTom
            | InstrumentPart::FloorTom => Notehead::Normal,
            InstrumentPart::Rest => Notehead::Rest,
        }
    }

    /// General MIDI percussion key (channel 10), for hosts that route
    /// triggers through a MIDI synth. Rests have no key.
    pub fn midi_key(self) -> Option<u8> {
        match self {
            InstrumentPart::BassDrum => Some(36),
            InstrumentPart::Snare => Some(38),
            InstrumentPart::HiHatClosed => Some(42),
            InstrumentPart::FloorTom => Some(43),
            InstrumentPart::MidTom => Some(47),
            InstrumentPart::HighTom => Some(48),
            InstrumentPart::CrashCymbal => Some(49),
            InstrumentPart::RideCymbal => Some(51),
            InstrumentPart::Rest => None,
        }
    }
}

/// Note duration, including the eighth-note triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteDuration {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
    EighthTriplet,
}

impl NoteDuration {
    /// Duration as a fraction of a whole note.
    pub fn fraction(self) -> f64 {
        match self {
            NoteDuration::Whole => 1.0,
            NoteDuration::Half => 1.0 / 2.0,
            NoteDuration::Quarter => 1.0 / 4.0,
            NoteDuration::Eighth => 1.0 / 8.0,
            NoteDuration::Sixteenth => 1.0 / 16.0,
            NoteDuration::ThirtySecond => 1.0 / 32.0,
            NoteDuration::SixtyFourth => 1.0 / 64.0,
            NoteDuration::EighthTriplet => 1.0 / 12.0,
        }
    }

    /// Duration in quarter-note beat units (fraction × 4).
    pub fn in_quarters(self) -> f64 {
        self.fraction() * 4.0
    }

    /// Quantization steps per quarter note when this duration is the
    /// selected grid resolution.
    pub fn grid_subdivision(self) -> u32 {
        match self {
            NoteDuration::Whole | NoteDuration::Half | NoteDuration::Quarter => 1,
            NoteDuration::Eighth => 2,
            NoteDuration::EighthTriplet => 3,
            NoteDuration::Sixteenth => 4,
            NoteDuration::ThirtySecond => 8,
            NoteDuration::SixtyFourth => 16,
        }
    }

    /// Beam count when beamed: eighth → 1, sixteenth → 2,
    /// thirty-second → 3. Zero means the duration is never beamed.
    pub fn beam_level(self) -> u8 {
        match self {
            NoteDuration::Eighth => 1,
            NoteDuration::Sixteenth => 2,
            NoteDuration::ThirtySecond => 3,
            NoteDuration::Whole
            | NoteDuration::Half
            | NoteDuration::Quarter
            | NoteDuration::SixtyFourth
            | NoteDuration::EighthTriplet => 0,
        }
    }

    pub fn is_beamable(self) -> bool {
        self.beam_level() > 0
    }
}

/// Playing-technique articulation. Expanded at scheduling time only —
/// the note store treats articulated notes like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Articulation {
    Flam,
    BuzzRoll,
}

/// Stem direction, derived from the voice (never stored).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StemDirection {
    Up,
    Down,
}

impl StemDirection {
    /// Voice 1 (cymbals/hi-hat) stems up; everything else stems down.
    pub fn for_voice(voice: u8) -> Self {
        if voice == 1 {
            StemDirection::Up
        } else {
            StemDirection::Down
        }
    }
}

/// Time signature. Denominator is 4 or 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (beats per measure in meter units)
    pub top: u8,
    /// Denominator (the meter's beat unit)
    pub bottom: u8,
}

impl TimeSignature {
    pub fn new(top: u8, bottom: u8) -> Self {
        Self { top, bottom }
    }

    /// Measure capacity in whole-note fractions (e.g. 4/4 → 1.0,
    /// 6/8 → 0.75).
    pub fn capacity(&self) -> f64 {
        self.top as f64 / self.bottom as f64
    }

    /// Measure span in quarter-note beat units (e.g. 4/4 → 4.0,
    /// 6/8 → 3.0). The only place the denominator enters timing math.
    pub fn quarters_per_measure(&self) -> f64 {
        self.top as f64 * 4.0 / self.bottom as f64
    }

    pub fn is_valid(&self) -> bool {
        self.top >= 1 && (self.bottom == 4 || self.bottom == 8)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self { top: 4, bottom: 4 }
    }
}

/// A placed note or rest event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Identifier, unique within its partition
    pub id: u64,
    /// Instrument part (or rest)
    pub part: InstrumentPart,
    /// Duration
    pub duration: NoteDuration,
    /// Onset relative to the start of `measure`, in quarter-note units
    pub beat: f64,
    /// Zero-based measure index
    pub measure: u32,
    /// Voice (derived from `part` at insertion, stored for accounting)
    pub voice: u8,
    /// Optional articulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub articulation: Option<Articulation>,
}

impl NoteEvent {
    /// Half-open beat interval `[beat, beat + duration)` occupied within
    /// the measure, in quarter-note units.
    pub fn interval(&self) -> (f64, f64) {
        (self.beat, self.beat + self.duration.in_quarters())
    }

    pub fn stem_direction(&self) -> StemDirection {
        StemDirection::for_voice(self.voice)
    }
}

/// Free-floating text placed on the score (labels, stickings, fills).
/// Only its `y`-derived line index matters to the core: structural line
/// edits must translate annotations together with their measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    pub id: u64,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: Option<String>,
    #[serde(default)]
    pub font_style: Option<String>,
}

/// Inclusive measure range repeated indefinitely during playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start_measure: u32,
    pub end_measure: u32,
}

impl LoopRegion {
    /// Number of measures in the region.
    pub fn len(&self) -> u32 {
        self.end_measure.saturating_sub(self.start_measure) + 1
    }

    pub fn contains(&self, measure: u32) -> bool {
        measure >= self.start_measure && measure <= self.end_measure
    }
}

/// One score: an ordered collection of note events plus global settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub id: u64,
    pub name: String,
    /// Sorted ascending by `(measure, beat)` — maintained by every store
    /// operation and restored on snapshot load.
    pub notes: Vec<NoteEvent>,
    pub time_signature: TimeSignature,
    /// Tempo in quarter-note beats per minute
    pub tempo: u32,
    pub num_measures: u32,
    #[serde(default)]
    pub text_annotations: Vec<TextAnnotation>,
}

/// Default number of measures in a fresh partition.
pub const DEFAULT_NUM_MEASURES: u32 = 8;
/// Default tempo in BPM.
pub const DEFAULT_TEMPO: u32 = 120;

impl Partition {
    /// Create a new empty partition: 4/4, 120 bpm, 8 measures.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            notes: Vec::new(),
            time_signature: TimeSignature::default(),
            tempo: DEFAULT_TEMPO,
            num_measures: DEFAULT_NUM_MEASURES,
            text_annotations: Vec::new(),
        }
    }

    /// Next free note id (ids are unique within the partition).
    pub fn alloc_note_id(&self) -> u64 {
        self.notes.iter().map(|n| n.id).max().map_or(1, |m| m + 1)
    }

    /// Next free annotation id.
    pub fn alloc_annotation_id(&self) -> u64 {
        self.text_annotations
            .iter()
            .map(|a| a.id)
            .max()
            .map_or(1, |m| m + 1)
    }

    /// All notes of one voice, preserving the sort order.
    pub fn voice_notes(&self, voice: u8) -> Vec<&NoteEvent> {
        self.notes.iter().filter(|n| n.voice == voice).collect()
    }

    /// Restore the `(measure, beat)` sort invariant.
    pub fn sort_notes(&mut self) {
        self.notes.sort_by(|a, b| {
            a.measure
                .cmp(&b.measure)
                .then(a.beat.partial_cmp(&b.beat).unwrap_or(std::cmp::Ordering::Equal))
        });
    }
}

/// A document holding one or more independent partitions, exactly one of
/// which is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub partitions: Vec<Partition>,
    pub current: usize,
}

impl Document {
    /// A document always contains at least one partition.
    pub fn new() -> Self {
        Self {
            partitions: vec![Partition::new(1, "Partition 1")],
            current: 0,
        }
    }

    pub fn current_partition(&self) -> &Partition {
        &self.partitions[self.current]
    }

    pub fn current_partition_mut(&mut self) -> &mut Partition {
        &mut self.partitions[self.current]
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
