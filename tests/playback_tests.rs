//! Player tests — trigger scheduling against a mock audio clock and
//! sink, loop re-entry, toggle/stop semantics, and cursor motion.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use drumlib::layout::{compute_layout, LayoutConfig};
use drumlib::model::{Articulation, InstrumentPart, LoopRegion, NoteDuration, Partition};
use drumlib::player::{
    AudioClock, Player, TriggerSink, VoiceHandle, LOOP_PRESCHEDULE_MARGIN_S, SCHEDULE_LEAD_IN_S,
};
use drumlib::store;

// ─── Test doubles ───────────────────────────────────────────────────

#[derive(Default)]
struct ClockState {
    now: Cell<f64>,
    available: Cell<bool>,
    resumes: Cell<u32>,
    releases: Cell<u32>,
}

#[derive(Clone)]
struct TestClock(Rc<ClockState>);

impl TestClock {
    fn available() -> Self {
        let state = ClockState::default();
        state.available.set(true);
        TestClock(Rc::new(state))
    }

    fn unavailable() -> Self {
        TestClock(Rc::new(ClockState::default()))
    }
}

impl AudioClock for TestClock {
    fn now(&self) -> f64 {
        self.0.now.get()
    }

    fn resume(&mut self) -> bool {
        if self.0.available.get() {
            self.0.resumes.set(self.0.resumes.get() + 1);
            true
        } else {
            false
        }
    }

    fn release(&mut self) {
        self.0.releases.set(self.0.releases.get() + 1);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Trigger {
    part: InstrumentPart,
    at: f64,
    duration_s: f64,
    articulation: Option<Articulation>,
}

#[derive(Clone, Default)]
struct TestSink {
    triggers: Rc<RefCell<Vec<Trigger>>>,
    voice_stops: Rc<Cell<u32>>,
}

struct TestVoice {
    stops: Rc<Cell<u32>>,
}

impl VoiceHandle for TestVoice {
    fn stop(&mut self) {
        self.stops.set(self.stops.get() + 1);
    }
}

impl TriggerSink for TestSink {
    fn trigger(
        &mut self,
        part: InstrumentPart,
        at_audio_time: f64,
        duration_s: f64,
        _tempo: u32,
        articulation: Option<Articulation>,
    ) -> Vec<Box<dyn VoiceHandle>> {
        self.triggers.borrow_mut().push(Trigger {
            part,
            at: at_audio_time,
            duration_s,
            articulation,
        });
        vec![Box::new(TestVoice {
            stops: self.voice_stops.clone(),
        })]
    }
}

fn player_with(
    clock: TestClock,
    sink: TestSink,
) -> Player<TestClock, TestSink> {
    Player::new(clock, sink, LayoutConfig::default())
}

fn partition_with(notes: &[(u32, f64, InstrumentPart, NoteDuration)]) -> Partition {
    let mut p = Partition::new(1, "groove");
    for &(measure, beat, part, duration) in notes {
        let outcome = store::insert_or_replace(&mut p, measure, beat, part, duration, None);
        assert!(outcome.applied(), "fixture insert rejected: {outcome:?}");
    }
    p
}

// ─── Scheduling ─────────────────────────────────────────────────────

#[test]
fn triggers_land_at_epoch_plus_beat_time() {
    // 120 bpm in 4/4: (measure 1, beat 2) sounds 3.0 s after the epoch.
    let clock = TestClock::available();
    let sink = TestSink::default();
    let triggers = sink.triggers.clone();

    let p = partition_with(&[(1, 2.0, InstrumentPart::Snare, NoteDuration::Quarter)]);
    let mut player = player_with(clock, sink);

    assert!(player.play(&p, None, false, 0.0));
    let recorded = triggers.borrow();
    assert_eq!(recorded.len(), 1);
    assert!((recorded[0].at - (SCHEDULE_LEAD_IN_S + 3.0)).abs() < 1e-9);
    assert!((recorded[0].duration_s - 0.5).abs() < 1e-9);
}

#[test]
fn chords_trigger_every_part_at_the_same_time() {
    let clock = TestClock::available();
    let sink = TestSink::default();
    let triggers = sink.triggers.clone();

    let p = partition_with(&[
        (0, 1.0, InstrumentPart::BassDrum, NoteDuration::Quarter),
        (0, 1.0, InstrumentPart::HiHatClosed, NoteDuration::Quarter),
        (0, 1.0, InstrumentPart::Snare, NoteDuration::Quarter),
    ]);
    let mut player = player_with(clock, sink);
    player.play(&p, None, false, 0.0);

    let recorded = triggers.borrow();
    assert_eq!(recorded.len(), 3);
    assert!(recorded.windows(2).all(|w| w[0].at == w[1].at));
}

#[test]
fn late_reentry_skips_triggers_already_in_the_past() {
    let clock = TestClock::available();
    let sink = TestSink::default();
    let triggers = sink.triggers.clone();

    let p = partition_with(&[
        (0, 0.0, InstrumentPart::BassDrum, NoteDuration::Quarter),
        (0, 2.0, InstrumentPart::Snare, NoteDuration::Quarter),
    ]);
    let region = LoopRegion { start_measure: 0, end_measure: 0 };

    let mut player = player_with(clock.clone(), sink);
    player.play(&p, Some(region), true, 0.0);
    assert_eq!(triggers.borrow().len(), 2);

    // The audio clock has already run past the second pass's first
    // chord (2.1 s) when the boundary tick arrives: that chord must
    // not be scheduled with a negative delay, while the later one
    // (3.1 s) still is.
    clock.0.now.set(2.7);
    player.tick(&p, SCHEDULE_LEAD_IN_S + 2.0 - LOOP_PRESCHEDULE_MARGIN_S + 0.01);

    let recorded = triggers.borrow();
    assert_eq!(recorded.len(), 3);
    assert_eq!(recorded[2].part, InstrumentPart::Snare);
    assert!((recorded[2].at - 3.1).abs() < 1e-9);
}

#[test]
fn flam_and_buzz_expand_into_extra_triggers() {
    let clock = TestClock::available();
    let sink = TestSink::default();
    let triggers = sink.triggers.clone();

    let mut p = Partition::new(1, "rudiments");
    store::insert_or_replace(
        &mut p,
        0,
        0.0,
        InstrumentPart::Snare,
        NoteDuration::Quarter,
        Some(Articulation::Flam),
    );
    store::insert_or_replace(
        &mut p,
        0,
        1.0,
        InstrumentPart::Snare,
        NoteDuration::Quarter,
        Some(Articulation::BuzzRoll),
    );

    let mut player = player_with(clock, sink);
    player.play(&p, None, false, 0.0);

    let recorded = triggers.borrow();
    let flams: Vec<_> = recorded
        .iter()
        .filter(|t| t.articulation == Some(Articulation::Flam))
        .collect();
    let buzzes: Vec<_> = recorded
        .iter()
        .filter(|t| t.articulation == Some(Articulation::BuzzRoll))
        .collect();

    assert_eq!(flams.len(), 2, "flam = grace + nominal");
    assert!((flams[1].at - flams[0].at - 0.03).abs() < 1e-9);
    assert_eq!(buzzes.len(), 10, "quarter-note buzz at 50 ms intervals");
}

// ─── Loop semantics ─────────────────────────────────────────────────

#[test]
fn loop_reentry_repeats_the_window_every_pass() {
    let clock = TestClock::available();
    let sink = TestSink::default();
    let triggers = sink.triggers.clone();

    let p = partition_with(&[
        (0, 0.0, InstrumentPart::BassDrum, NoteDuration::Quarter),
        (1, 2.0, InstrumentPart::Snare, NoteDuration::Quarter),
    ]);
    let region = LoopRegion { start_measure: 0, end_measure: 1 };

    let mut player = player_with(clock, sink);
    player.play(&p, Some(region), true, 0.0);
    assert_eq!(triggers.borrow().len(), 2);

    // One pass lasts 4.0 s; the re-entry timer fires 50 ms early.
    let boundary = SCHEDULE_LEAD_IN_S + 4.0 - LOOP_PRESCHEDULE_MARGIN_S;
    assert!(player.tick(&p, boundary - 0.01).is_some());
    assert_eq!(triggers.borrow().len(), 2, "not yet at the boundary");

    assert!(player.tick(&p, boundary + 0.01).is_some());
    let recorded = triggers.borrow();
    assert_eq!(recorded.len(), 4, "second pass scheduled at the boundary");

    // Second-pass triggers are exactly one window later.
    assert!((recorded[2].at - recorded[0].at - 4.0).abs() < 1e-9);
    assert!((recorded[3].at - recorded[1].at - 4.0).abs() < 1e-9);
    drop(recorded);

    // A third boundary keeps the loop rolling until stop().
    let second_boundary = boundary + 4.0;
    assert!(player.tick(&p, second_boundary + 0.01).is_some());
    assert_eq!(triggers.borrow().len(), 6);

    player.stop();
    assert!(!player.is_playing());
}

#[test]
fn loop_boundary_picks_up_edits() {
    let clock = TestClock::available();
    let sink = TestSink::default();
    let triggers = sink.triggers.clone();

    let mut p = partition_with(&[(0, 0.0, InstrumentPart::Snare, NoteDuration::Quarter)]);
    let region = LoopRegion { start_measure: 0, end_measure: 0 };

    let mut player = player_with(clock, sink);
    player.play(&p, Some(region), true, 0.0);
    assert_eq!(triggers.borrow().len(), 1);

    // Edit while the first pass plays: the in-flight pass is stale, but
    // the next boundary re-reads the store.
    store::insert_or_replace(&mut p, 0, 2.0, InstrumentPart::BassDrum, NoteDuration::Quarter, None);

    let boundary = SCHEDULE_LEAD_IN_S + 2.0 - LOOP_PRESCHEDULE_MARGIN_S;
    player.tick(&p, boundary + 0.01);
    assert_eq!(triggers.borrow().len(), 3, "second pass includes the new note");
}

#[test]
fn non_looping_playback_stops_at_the_end() {
    let clock = TestClock::available();
    let sink = TestSink::default();

    let p = partition_with(&[(0, 0.0, InstrumentPart::Snare, NoteDuration::Quarter)]);
    let mut player = player_with(clock.clone(), sink);
    player.play(&p, None, false, 0.0);
    assert!(player.is_playing());

    // 8 measures of 4/4 at 120 bpm = 16 s. Just before the end the
    // cursor still moves; past it the stop timer fires.
    assert!(player.tick(&p, SCHEDULE_LEAD_IN_S + 15.9).is_some());
    assert!(player.tick(&p, SCHEDULE_LEAD_IN_S + 16.0).is_none());
    assert!(!player.is_playing());
    assert!(clock.0.releases.get() >= 1, "stop releases the audio clock");
}

// ─── State machine ──────────────────────────────────────────────────

#[test]
fn play_acts_as_a_toggle() {
    let clock = TestClock::available();
    let p = partition_with(&[(0, 0.0, InstrumentPart::Snare, NoteDuration::Quarter)]);

    let mut player = player_with(clock, TestSink::default());
    assert!(player.play(&p, None, false, 0.0));
    assert!(player.is_playing());

    // Play while playing = stop.
    assert!(!player.play(&p, None, false, 0.5));
    assert!(!player.is_playing());

    // And a fresh play starts again.
    assert!(player.play(&p, None, false, 1.0));
}

#[test]
fn stop_is_idempotent_and_silences_voices() {
    let clock = TestClock::available();
    let sink = TestSink::default();
    let stops = sink.voice_stops.clone();
    let triggers = sink.triggers.clone();

    let p = partition_with(&[
        (0, 0.0, InstrumentPart::CrashCymbal, NoteDuration::Quarter),
        (0, 2.0, InstrumentPart::Snare, NoteDuration::Quarter),
    ]);
    let mut player = player_with(clock.clone(), sink);
    player.play(&p, None, false, 0.0);

    player.stop();
    assert_eq!(stops.get(), triggers.borrow().len() as u32);

    // Stopping again must not re-stop voices or panic.
    player.stop();
    assert_eq!(stops.get(), triggers.borrow().len() as u32);
    assert!(clock.0.releases.get() >= 2);
}

#[test]
fn playback_does_not_start_without_an_audio_device() {
    let p = partition_with(&[(0, 0.0, InstrumentPart::Snare, NoteDuration::Quarter)]);
    let mut player = player_with(TestClock::unavailable(), TestSink::default());

    assert!(!player.play(&p, None, false, 0.0));
    assert!(!player.is_playing());
    assert!(player.tick(&p, 1.0).is_none());
}

#[test]
fn empty_partitions_do_not_play() {
    let clock = TestClock::available();
    let p = Partition::new(1, "empty");
    let mut player = player_with(clock.clone(), TestSink::default());

    assert!(!player.play(&p, None, false, 0.0));
    assert_eq!(clock.0.resumes.get(), 0, "no device churn for empty scores");
}

#[test]
fn rests_never_reach_the_sink() {
    let clock = TestClock::available();
    let sink = TestSink::default();
    let triggers = sink.triggers.clone();

    let p = partition_with(&[
        (0, 0.0, InstrumentPart::Rest, NoteDuration::Half),
        (0, 2.0, InstrumentPart::Snare, NoteDuration::Quarter),
    ]);
    let mut player = player_with(clock, sink);
    player.play(&p, None, false, 0.0);

    let recorded = triggers.borrow();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].part, InstrumentPart::Snare);
}

// ─── Cursor ─────────────────────────────────────────────────────────

#[test]
fn cursor_tracks_elapsed_time_through_the_layout() {
    let clock = TestClock::available();
    let p = partition_with(&[(0, 0.0, InstrumentPart::Snare, NoteDuration::Quarter)]);
    let layout = compute_layout(&p, &LayoutConfig::default());

    let mut player = player_with(clock, TestSink::default());
    player.play(&p, None, false, 0.0);

    // During the lead-in the cursor sits at the start.
    let cursor = player.tick(&p, 0.05).unwrap();
    assert_eq!(cursor.x, layout.note_x(0, 0.0).unwrap());

    // One second after the epoch = beat 2 of measure 0.
    let cursor = player.tick(&p, SCHEDULE_LEAD_IN_S + 1.0).unwrap();
    assert_eq!(cursor.x, layout.note_x(0, 2.0).unwrap());

    // 2.5 s in = measure 1, beat 1: the cursor jumps to the next
    // measure box.
    let cursor = player.tick(&p, SCHEDULE_LEAD_IN_S + 2.5).unwrap();
    assert_eq!(cursor.x, layout.note_x(1, 1.0).unwrap());
}

#[test]
fn looping_cursor_wraps_at_the_window_edge() {
    let clock = TestClock::available();
    let p = partition_with(&[(0, 0.0, InstrumentPart::Snare, NoteDuration::Quarter)]);
    let layout = compute_layout(&p, &LayoutConfig::default());
    let region = LoopRegion { start_measure: 0, end_measure: 1 };

    let mut player = player_with(clock, TestSink::default());
    player.play(&p, Some(region), true, 0.0);

    // 4.0 s per pass; 4.5 s elapsed is beat 1 of measure 0 again.
    // (The boundary timer also fires during this tick.)
    let cursor = player.tick(&p, SCHEDULE_LEAD_IN_S + 4.5).unwrap();
    assert_eq!(cursor.x, layout.note_x(0, 1.0).unwrap());
    assert!(player.is_playing());
}
