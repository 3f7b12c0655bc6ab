//! Injected time sources.
//!
//! Nothing in the estimator or the animation engine reads the host clock
//! directly.  The host owns a [`Clock`], turns it into one [`FrameTime`] per
//! tick with a [`FrameTimer`], and hands `now` / `dt` down explicitly.

use std::cell::Cell;
use std::time::Instant;

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by [`Instant`], zeroed at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self { Self::new() }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-advanced clock for deterministic runs and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        ManualClock { now: Cell::new(start_ms) }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 { self.now.get() }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameTime
// ════════════════════════════════════════════════════════════════════════════

/// The timing of one frame tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Absolute timestamp of this tick in milliseconds.
    pub now_ms: f64,
    /// Integration step in seconds.
    pub dt: f32,
}

impl FrameTime {
    pub fn new(now_ms: f64, dt: f32) -> Self {
        FrameTime { now_ms, dt }
    }

    /// Absolute time in seconds, the unit trails and equalizer phases use.
    pub fn seconds(&self) -> f64 { self.now_ms / 1000.0 }
}

/// Derives successive [`FrameTime`]s from a clock.
///
/// The step is clamped to `max_dt` so a stalled host (window drag,
/// breakpoint) does not fling every integrator at once.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    prev_ms: Option<f64>,
    max_dt:  f32,
}

impl FrameTimer {
    pub fn new(max_dt: f32) -> Self {
        FrameTimer { prev_ms: None, max_dt }
    }

    pub fn tick(&mut self, clock: &impl Clock) -> FrameTime {
        let now = clock.now_ms();
        let dt = match self.prev_ms {
            Some(prev) => (((now - prev) / 1000.0) as f32).clamp(0.0, self.max_dt),
            None       => 0.0,
        };
        self.prev_ms = Some(now);
        FrameTime { now_ms: now, dt }
    }

    pub fn reset(&mut self) { self.prev_ms = None; }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
