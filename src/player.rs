//! Player — schedules audio triggers against an audio clock and drives
//! the playback cursor against the wall clock.
//!
//! The two clocks are pinned together once per session (the epoch
//! pair); they are not assumed identical beyond that offset. Triggers
//! are handed to the sink up front with absolute audio times
//! (fire-and-forget, sample-accurate at the backend); the only timers
//! the player keeps for itself are the loop re-entry and end-of-score
//! timers, pumped cooperatively through [`Player::tick`].
//!
//! Staleness: a scheduled pass keeps the note set it was built from.
//! Edits made while playing are picked up at the next loop boundary,
//! when the schedule re-reads the partition.

use tracing::{debug, warn};

use crate::layout::{compute_layout, Cursor, LayoutConfig, ScoreLayout};
use crate::model::{Articulation, InstrumentPart, LoopRegion, Partition};
use crate::timemap;

/// Lead-in between pressing play and the first possible trigger,
/// absorbing scheduling jitter.
pub const SCHEDULE_LEAD_IN_S: f64 = 0.1;
/// How far before the end of a pass the next loop iteration is
/// scheduled, so the backend never starves at the boundary.
pub const LOOP_PRESCHEDULE_MARGIN_S: f64 = 0.05;

/// The process-wide audio device handle, owned by the player.
///
/// `resume` is called on every `play` (lazily creating or reviving the
/// underlying device) and `release` on every stop and on teardown; an
/// implementation may suspend instead of destroying so later resumes
/// are cheap.
pub trait AudioClock {
    /// Current time on the audio timebase, in seconds.
    fn now(&self) -> f64;
    /// Make the clock usable. Returns false when the device is
    /// unavailable — playback then simply does not start.
    fn resume(&mut self) -> bool;
    /// Release the device. Must be safe to call when already released.
    fn release(&mut self);
}

/// A still-sounding synthesized voice that can be silenced early.
pub trait VoiceHandle {
    fn stop(&mut self);
}

/// Audio synthesis collaborator. Called once per trigger with an
/// absolute audio-clock time; returns handles for any voices that keep
/// sounding so `stop` can silence them.
pub trait TriggerSink {
    fn trigger(
        &mut self,
        part: InstrumentPart,
        at_audio_time: f64,
        duration_s: f64,
        tempo: u32,
        articulation: Option<Articulation>,
    ) -> Vec<Box<dyn VoiceHandle>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    /// Schedule pass `next_pass` and re-arm.
    LoopReentry { next_pass: u64 },
    /// One pass, no loop: stop when the score runs out.
    StopAtEnd,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    fire_at_wall: f64,
    kind: TimerKind,
}

struct Session {
    epoch_audio: f64,
    epoch_wall: f64,
    loop_region: Option<LoopRegion>,
    looping: bool,
    /// Seconds per pass over the playback window
    pass_duration_s: f64,
    layout: ScoreLayout,
    timers: Vec<PendingTimer>,
    voices: Vec<Box<dyn VoiceHandle>>,
}

/// Playback state machine: `Stopped → Playing → Stopped`, with looping
/// passes rescheduled at each boundary.
pub struct Player<C: AudioClock, S: TriggerSink> {
    clock: C,
    sink: S,
    layout_config: LayoutConfig,
    session: Option<Session>,
}

impl<C: AudioClock, S: TriggerSink> Player<C, S> {
    pub fn new(clock: C, sink: S, layout_config: LayoutConfig) -> Self {
        Self {
            clock,
            sink,
            layout_config,
            session: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_some()
    }

    /// Start playback, or stop it when already playing (play acts as a
    /// toggle). Returns true when a new session actually started.
    ///
    /// `wall_now` is the caller's animation clock, in seconds; it only
    /// needs to be monotonic and share units with later `tick` calls.
    pub fn play(
        &mut self,
        partition: &Partition,
        loop_region: Option<LoopRegion>,
        looping: bool,
        wall_now: f64,
    ) -> bool {
        if self.session.is_some() {
            self.stop();
            return false;
        }
        if partition.notes.is_empty() {
            return false;
        }
        if !self.clock.resume() {
            warn!("audio device unavailable, playback not started");
            return false;
        }

        let epoch_audio = self.clock.now() + SCHEDULE_LEAD_IN_S;
        let epoch_wall = wall_now + SCHEDULE_LEAD_IN_S;
        let pass_duration_s = timemap::total_duration_s(partition, loop_region);

        let mut session = Session {
            epoch_audio,
            epoch_wall,
            loop_region,
            looping,
            pass_duration_s,
            layout: compute_layout(partition, &self.layout_config),
            timers: Vec::new(),
            voices: Vec::new(),
        };

        Self::schedule_pass(&mut self.sink, &self.clock, &mut session, partition, 0);
        Self::arm_boundary_timer(&mut session, 0);

        debug!(epoch_audio, pass_duration_s, looping, "playback started");
        self.session = Some(session);
        true
    }

    /// Cancel every pending timer, silence live voices, release the
    /// clock, and reset cursor state. Safe to call repeatedly and on
    /// teardown.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.timers.clear();
            for voice in &mut session.voices {
                voice.stop();
            }
            debug!("playback stopped");
        }
        self.clock.release();
    }

    /// Cooperative pump: fire due timers, then report the cursor for
    /// the current elapsed time. Call once per animation frame with the
    /// same wall clock `play` was given. Returns None when stopped.
    pub fn tick(&mut self, partition: &Partition, wall_now: f64) -> Option<Cursor> {
        loop {
            let due = {
                let session = self.session.as_mut()?;
                session
                    .timers
                    .iter()
                    .position(|t| t.fire_at_wall <= wall_now)
                    .map(|idx| session.timers.swap_remove(idx))
            };
            match due {
                Some(PendingTimer {
                    kind: TimerKind::StopAtEnd,
                    ..
                }) => {
                    self.stop();
                    return None;
                }
                Some(PendingTimer {
                    kind: TimerKind::LoopReentry { next_pass },
                    ..
                }) => {
                    let session = self.session.as_mut()?;
                    // The boundary is where edits become audible: the
                    // schedule and layout re-read the partition here.
                    session.layout = compute_layout(partition, &self.layout_config);
                    session.pass_duration_s =
                        timemap::total_duration_s(partition, session.loop_region);
                    Self::schedule_pass(
                        &mut self.sink,
                        &self.clock,
                        session,
                        partition,
                        next_pass,
                    );
                    Self::arm_boundary_timer(session, next_pass);
                }
                None => break,
            }
        }

        let (epoch_wall, loop_region, looping) = {
            let session = self.session.as_ref()?;
            (session.epoch_wall, session.loop_region, session.looping)
        };
        let elapsed = (wall_now - epoch_wall).max(0.0);
        match timemap::cursor_beat_at(partition, loop_region, elapsed, looping) {
            Some((measure, beat)) => self
                .session
                .as_ref()
                .and_then(|s| s.layout.cursor_at(measure, beat)),
            None => {
                // Ran out before the stop timer fired (clock skew).
                self.stop();
                None
            }
        }
    }

    /// Hand one pass's triggers to the sink. Only triggers still in the
    /// audio clock's future are scheduled, guarding against negative
    /// delays when a pass is re-entered late.
    fn schedule_pass(
        sink: &mut S,
        clock: &C,
        session: &mut Session,
        partition: &Partition,
        pass: u64,
    ) {
        let pass_epoch = session.epoch_audio + pass as f64 * session.pass_duration_s;
        let audio_now = clock.now();
        let spq = timemap::seconds_per_quarter(partition.tempo);

        for chord in timemap::build_schedule(partition, session.loop_region) {
            for note in &chord.notes {
                let duration_s = note.duration.in_quarters() * spq;
                for &offset in &note.trigger_offsets_s {
                    let at = pass_epoch + offset;
                    if at <= audio_now {
                        continue;
                    }
                    let handles =
                        sink.trigger(note.part, at, duration_s, partition.tempo, note.articulation);
                    session.voices.extend(handles);
                }
            }
        }
    }

    /// Arm the timer that ends pass `pass`: either the next loop
    /// iteration (a little early, to pre-schedule across the seam) or
    /// the final stop.
    fn arm_boundary_timer(session: &mut Session, pass: u64) {
        let pass_end_wall = session.epoch_wall + (pass + 1) as f64 * session.pass_duration_s;
        let timer = if session.looping {
            PendingTimer {
                fire_at_wall: pass_end_wall - LOOP_PRESCHEDULE_MARGIN_S,
                kind: TimerKind::LoopReentry { next_pass: pass + 1 },
            }
        } else {
            PendingTimer {
                fire_at_wall: pass_end_wall,
                kind: TimerKind::StopAtEnd,
            }
        };
        session.timers.push(timer);
    }
}

impl<C: AudioClock, S: TriggerSink> Drop for Player<C, S> {
    /// Scoped-resource discipline: teardown always releases the clock
    /// and silences pending voices, whatever state we were left in.
    fn drop(&mut self) {
        self.stop();
    }
}
