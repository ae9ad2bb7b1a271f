//! Sequencer timing engine, grounded in `dev_oss_sequencer.c`'s
//! `vm_time_get` / `vm_timer_wait`. Uses `Instant`/`thread::sleep` rather
//! than raw `clock_nanosleep`: both already retry internally on spurious
//! wakeups, and the reference's own EINTR-retry loop exists only because C
//! has no such guarantee.

use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_TEMPO: u64 = 60;
const DEFAULT_BASE: u64 = 100;

/// Per-handle timer state: base, tempo, and the start/stop bookkeeping
/// needed to support `TMR_STOP`/`TMR_CONTINUE` resuming from where the timer
/// left off instead of restarting from zero.
pub struct Timer {
    base: u64,
    tempo: u64,
    start: Option<Instant>,
    stopped_at: Option<Duration>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            base: DEFAULT_BASE,
            tempo: DEFAULT_TEMPO,
            start: None,
            stopped_at: None,
        }
    }

    pub fn set_tempo(&mut self, tempo: u32) {
        self.tempo = tempo.clamp(8, 360) as u64;
    }

    pub fn set_base(&mut self, base: u32) {
        self.base = base.clamp(1, 1000) as u64;
    }

    pub fn start(&mut self) {
        self.start = Some(Instant::now());
        self.stopped_at = None;
    }

    /// `TMR_STOP`: only takes effect if the timer is running and has not
    /// already been stopped.
    pub fn stop(&mut self) {
        if let Some(start) = self.start {
            if self.stopped_at.is_none() {
                self.stopped_at = Some(start.elapsed());
            }
        }
    }

    /// `TMR_CONTINUE`: only takes effect if the timer was actually stopped;
    /// resumes as if it had started `stopped_at` in the past.
    pub fn resume(&mut self) {
        if let Some(elapsed) = self.stopped_at.take() {
            self.start = Instant::now().checked_sub(elapsed);
        }
    }

    /// Elapsed ticks since the timer started, scaled by `base`. Zero if the
    /// timer was never started.
    pub fn elapsed_ticks(&self) -> u64 {
        let Some(start) = self.start else {
            return 0;
        };
        let ns = start.elapsed().as_nanos() as u64;
        (ns * self.base) / 1_000_000_000
    }

    /// Converts a tick count to wall-clock duration at the current
    /// base/tempo. `pub` so callers (the sequencer engine) can compute the
    /// sleep duration while holding the lock, then sleep after releasing it.
    pub fn ticks_to_duration(&self, ticks: u32) -> Duration {
        let ns = (ticks as u64 * 60 * 1_000_000_000) / (self.tempo * self.base);
        Duration::from_nanos(ns)
    }

    /// `TMR_WAIT_REL`: sleeps for `ticks` converted to wall-clock time.
    pub fn wait_rel(&self, ticks: u32) {
        thread::sleep(self.ticks_to_duration(ticks));
    }

    /// `TMR_WAIT_ABS`: sleeps until `ticks` after the timer's start. A no-op
    /// if the timer was never started, matching the reference.
    pub fn wait_abs(&self, ticks: u32) {
        if let Some(d) = self.wait_abs_remaining(ticks) {
            thread::sleep(d);
        }
    }

    /// Remaining wall-clock time until `ticks` after the timer's start, or
    /// `None` if the timer was never started or the target already passed.
    /// Split out from `wait_abs` so a caller holding a lock on shared state
    /// can compute the duration, release the lock, and sleep separately.
    pub fn wait_abs_remaining(&self, ticks: u32) -> Option<Duration> {
        let start = self.start?;
        let target = start + self.ticks_to_duration(ticks);
        let now = Instant::now();
        (target > now).then(|| target - now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_clamps_to_documented_range() {
        let mut t = Timer::new();
        t.set_tempo(4);
        assert_eq!(t.tempo, 8);
        t.set_tempo(1000);
        assert_eq!(t.tempo, 360);
    }

    #[test]
    fn base_clamps_to_documented_range() {
        let mut t = Timer::new();
        t.set_base(0);
        assert_eq!(t.base, 1);
        t.set_base(5000);
        assert_eq!(t.base, 1000);
    }

    #[test]
    fn wait_abs_before_start_is_noop() {
        let t = Timer::new();
        let before = Instant::now();
        t.wait_abs(1_000_000);
        assert!(before.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn stop_is_idempotent_until_continue() {
        let mut t = Timer::new();
        t.start();
        t.stop();
        let first = t.stopped_at;
        thread::sleep(Duration::from_millis(5));
        t.stop();
        assert_eq!(t.stopped_at, first);
    }
}
