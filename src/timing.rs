use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of monotonic wall time in milliseconds.
///
/// The session clock samples this fresh on every query. The alternative of
/// accumulating per-frame deltas drifts under variable frame rate and is
/// deliberately not offered.
pub trait TimeSource: Send {
    /// Milliseconds elapsed since an arbitrary fixed origin.
    fn now_ms(&self) -> f64;
}

/// Hardware monotonic clock backed by `std::time::Instant`.
pub struct MonotonicTime {
    epoch: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually driven clock for deterministic tests and scripted playback.
///
/// Clones share the same underlying counter, so a test can hold one handle
/// while the session clock reads another.
#[derive(Clone, Default)]
pub struct ManualTime {
    micros: Arc<AtomicU64>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_ms(&self, ms: f64) {
        self.micros
            .fetch_add((ms * 1000.0).round() as u64, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: f64) {
        self.micros
            .store((ms * 1000.0).round() as u64, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1000.0
    }
}

/// Session-local clock: a monotonic anchor plus pause accounting.
///
/// `current_ms()` is negative during the audio pre-roll and crosses zero at
/// the instant chart time begins.
pub struct SessionClock {
    source: Box<dyn TimeSource>,
    origin_ms: f64,
    paused_at_ms: Option<f64>,
    pause_accum_ms: f64,
}

impl SessionClock {
    pub fn new(source: Box<dyn TimeSource>) -> Self {
        Self {
            source,
            origin_ms: 0.0,
            paused_at_ms: None,
            pause_accum_ms: 0.0,
        }
    }

    /// Anchor session time zero at `now + pre_roll_ms` and reset the pause
    /// accumulator.
    pub fn start(&mut self, pre_roll_ms: f64) {
        self.origin_ms = self.source.now_ms() + pre_roll_ms;
        self.paused_at_ms = None;
        self.pause_accum_ms = 0.0;
    }

    /// Elapsed session time excluding paused duration.
    pub fn current_ms(&self) -> f64 {
        let now = self.paused_at_ms.unwrap_or_else(|| self.source.now_ms());
        now - self.origin_ms - self.pause_accum_ms
    }

    /// Record the pause instant. No-op if already paused.
    pub fn pause(&mut self) {
        if self.paused_at_ms.is_none() {
            self.paused_at_ms = Some(self.source.now_ms());
        }
    }

    /// Fold the paused interval into the accumulator. No-op if not paused.
    pub fn resume(&mut self) {
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.pause_accum_ms += self.source.now_ms() - paused_at;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at_ms.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(time: &ManualTime) -> SessionClock {
        SessionClock::new(Box::new(time.clone()))
    }

    #[test]
    fn pre_roll_starts_negative() {
        let time = ManualTime::new();
        time.set_ms(1000.0);
        let mut clock = clock_at(&time);
        clock.start(1500.0);
        assert_eq!(clock.current_ms(), -1500.0);

        time.advance_ms(1500.0);
        assert_eq!(clock.current_ms(), 0.0);
        time.advance_ms(250.0);
        assert_eq!(clock.current_ms(), 250.0);
    }

    #[test]
    fn pause_freezes_current_time() {
        let time = ManualTime::new();
        let mut clock = clock_at(&time);
        clock.start(0.0);

        time.advance_ms(400.0);
        clock.pause();
        let frozen = clock.current_ms();
        time.advance_ms(5000.0);
        assert_eq!(clock.current_ms(), frozen);

        clock.resume();
        assert_eq!(clock.current_ms(), frozen);
        time.advance_ms(100.0);
        assert_eq!(clock.current_ms(), 500.0);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let time = ManualTime::new();
        let mut clock = clock_at(&time);
        clock.start(0.0);

        clock.resume(); // not paused: no-op
        time.advance_ms(100.0);
        clock.pause();
        clock.pause(); // already paused: no-op
        time.advance_ms(300.0);
        clock.resume();
        assert_eq!(clock.current_ms(), 100.0);
    }

    #[test]
    fn restart_resets_pause_accumulator() {
        let time = ManualTime::new();
        let mut clock = clock_at(&time);
        clock.start(0.0);
        time.advance_ms(100.0);
        clock.pause();
        time.advance_ms(100.0);
        clock.resume();

        clock.start(0.0);
        time.advance_ms(50.0);
        assert_eq!(clock.current_ms(), 50.0);
        assert!(!clock.is_paused());
    }

    #[test]
    fn monotonic_source_advances() {
        let source = MonotonicTime::new();
        let a = source.now_ms();
        let b = source.now_ms();
        assert!(b >= a);
    }
}
