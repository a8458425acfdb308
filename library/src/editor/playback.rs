use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use log::debug;

/// Monotonic wall clock in milliseconds.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

pub struct SystemTimeSource {
    origin: Instant,
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests and headless use. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<f64>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance_ms(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum ClockState {
    Stopped,
    Playing { wall_start_ms: f64, scene_start: f64 },
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TickOutcome {
    /// Not playing; carries the unchanged current time.
    Idle(f64),
    Advanced(f64),
    /// Reached the end of the scene and stopped.
    Ended(f64),
}

/// Scene time driven by a wall clock. Time is derived from the anchor taken
/// at `play`, never accumulated per tick, so irregular ticks do not drift.
pub struct PlaybackClock {
    source: Box<dyn TimeSource>,
    state: ClockState,
    current: f64,
    duration: f64,
    on_end: Option<Box<dyn FnMut()>>,
}

impl PlaybackClock {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            state: ClockState::Stopped,
            current: 0.0,
            duration: 0.0,
            on_end: None,
        }
    }

    pub fn set_on_end(&mut self, callback: impl FnMut() + 'static) {
        self.on_end = Some(Box::new(callback));
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        if !self.is_playing() {
            self.current = self.current.min(self.duration);
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn current_time(&self) -> f64 {
        self.current
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, ClockState::Playing { .. })
    }

    pub fn play(&mut self) {
        if self.is_playing() {
            return;
        }
        if self.current >= self.duration {
            self.current = 0.0;
        }
        self.state = ClockState::Playing {
            wall_start_ms: self.source.now_ms(),
            scene_start: self.current,
        };
        debug!("Playback started at {:.3}s", self.current);
    }

    /// Freezes at the time reached so far.
    pub fn stop(&mut self) {
        if let ClockState::Playing { .. } = self.state {
            self.current = self.position();
            self.state = ClockState::Stopped;
            debug!("Playback stopped at {:.3}s", self.current);
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_playing() {
            return TickOutcome::Idle(self.current);
        }
        self.current = self.position();
        if self.current >= self.duration {
            self.current = self.duration;
            self.state = ClockState::Stopped;
            if let Some(on_end) = self.on_end.as_mut() {
                on_end();
            }
            return TickOutcome::Ended(self.current);
        }
        TickOutcome::Advanced(self.current)
    }

    /// Jumps to `time`. Playback is paused first.
    pub fn scrub(&mut self, time: f64) {
        self.stop();
        self.current = time.clamp(0.0, self.duration);
    }

    fn position(&self) -> f64 {
        match self.state {
            ClockState::Stopped => self.current,
            ClockState::Playing {
                wall_start_ms,
                scene_start,
            } => {
                let elapsed = (self.source.now_ms() - wall_start_ms) / 1000.0;
                (scene_start + elapsed).min(self.duration)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(duration: f64) -> (PlaybackClock, ManualTimeSource) {
        let source = ManualTimeSource::new();
        let mut clock = PlaybackClock::new(Box::new(source.clone()));
        clock.set_duration(duration);
        (clock, source)
    }

    #[test]
    fn advances_from_anchor() {
        let (mut clock, source) = clock(10.0);
        source.set_ms(5_000.0);
        clock.scrub(2.0);
        clock.play();
        source.advance_ms(1_500.0);
        assert_eq!(clock.tick(), TickOutcome::Advanced(3.5));
    }

    #[test]
    fn stops_at_end_and_fires_callback() {
        let (mut clock, source) = clock(4.0);
        let fired = Rc::new(Cell::new(0));
        let seen = fired.clone();
        clock.set_on_end(move || seen.set(seen.get() + 1));
        clock.play();
        source.advance_ms(9_000.0);
        assert_eq!(clock.tick(), TickOutcome::Ended(4.0));
        assert_eq!(fired.get(), 1);
        assert!(!clock.is_playing());
        assert_eq!(clock.tick(), TickOutcome::Idle(4.0));
    }

    #[test]
    fn scrub_pauses_and_clamps() {
        let (mut clock, source) = clock(6.0);
        clock.play();
        source.advance_ms(1_000.0);
        clock.scrub(42.0);
        assert!(!clock.is_playing());
        assert_eq!(clock.current_time(), 6.0);
        clock.scrub(-1.0);
        assert_eq!(clock.current_time(), 0.0);
    }

    #[test]
    fn play_at_end_restarts() {
        let (mut clock, source) = clock(3.0);
        clock.scrub(3.0);
        clock.play();
        source.advance_ms(500.0);
        assert_eq!(clock.tick(), TickOutcome::Advanced(0.5));
    }
}
