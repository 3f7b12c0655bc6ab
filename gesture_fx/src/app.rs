//! Top-level application loop.
//!
//! `AppState` owns the [`Engine`] and the frame timer.  It applies
//! [`SourceEvent`]s as they arrive and steps the engine once per rendered
//! frame; [`run`] wires it to a landmark source thread and the window.
//!
//! A hardware source that fails, or stays silent for
//! [`AppConfig::fallback_after_ms`], is swapped for the simulated hand.

use std::sync::mpsc::{self, Receiver, TryRecvError};

use hand_kinematics::{Clock, FrameTimer, SystemClock};
use tracing::{info, warn};

use crate::engine::{Engine, EngineConfig, FrameStats};
use crate::error::FxError;
use crate::source::{spawn_landmark_source, SimHandSource, SimInput, SourceEvent};
use crate::visualizer::{Visualizer, WIN_H, WIN_W};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppConfig {
    pub engine:            EngineConfig,
    /// A hardware source with no frame after this long (ms) is replaced by
    /// the simulated hand.
    pub fallback_after_ms: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            engine:            EngineConfig::default().with_aspect(WIN_W as f32 / WIN_H as f32),
            fallback_after_ms: 3000.0,
        }
    }
}

/// What the loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
    /// The primary source failed; switch to the simulated hand.
    FallBack,
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    engine:      Engine,
    timer:       FrameTimer,
    frames:      u64,
    rejected:    u64,
    last:        FrameStats,

    fallback_after_ms: f64,
    /// Set while a hardware source is on probation: when it started.
    watching_since:    Option<f64>,
    seen_frame:        bool,
}

impl AppState {
    pub fn new(cfg: AppConfig) -> Result<Self, FxError> {
        Ok(AppState {
            engine:      Engine::new(cfg.engine)?,
            timer:       FrameTimer::new(cfg.engine.max_dt),
            frames:      0,
            rejected:    0,
            last:        FrameStats::default(),
            fallback_after_ms: cfg.fallback_after_ms,
            watching_since:    None,
            seen_frame:        false,
        })
    }

    // ── fallback bookkeeping ──────────────────────────────────────────────

    /// Start watching a source that may be replaced by the simulated hand.
    pub fn arm_fallback(&mut self, now_ms: f64) {
        self.watching_since = Some(now_ms);
        self.seen_frame = false;
    }

    /// True once an armed source has produced nothing for the timeout.
    pub fn fallback_due(&self, now_ms: f64) -> bool {
        match self.watching_since {
            Some(since) => !self.seen_frame && now_ms - since >= self.fallback_after_ms,
            None        => false,
        }
    }

    /// The simulated hand has taken over; forget the old source's hand.
    pub fn fall_back(&mut self) {
        self.watching_since = None;
        self.engine.reset();
        self.timer.reset();
    }

    // ── process one SourceEvent ───────────────────────────────────────────

    pub fn handle_event(&mut self, event: SourceEvent) -> Result<Flow, FxError> {
        match event {
            SourceEvent::Frame(frame) => {
                self.seen_frame = true;
                if self.engine.ingest(&frame.landmarks, frame.time_ms).is_err() {
                    // the estimator already logged why
                    self.rejected += 1;
                }
            }
            SourceEvent::Reset => {
                self.engine.reset();
                self.timer.reset();
            }
            SourceEvent::Failed(msg) => {
                if self.watching_since.is_none() { return Err(FxError::Source(msg)); }
                warn!(reason = %msg, "landmark source failed");
                return Ok(Flow::FallBack);
            }
            SourceEvent::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    // ── Per-frame tick ────────────────────────────────────────────────────

    pub fn tick(&mut self, clock: &impl Clock) -> FrameStats {
        let frame = self.timer.tick(clock);
        self.frames += 1;
        self.last = self.engine.step(frame);
        self.last
    }

    pub fn status(&self) -> String {
        let hand = self.engine.hand();
        let particles = self.engine.particles();
        if !hand.is_tracked {
            return format!("no hand   frames {}   rejected {}", self.frames, self.rejected);
        }
        format!(
            "pose {}   speed {:.2}   clench {:.2}   compression {:.2}   particles {}/{}   ripples {}",
            hand.pose.name(),
            hand.speed,
            hand.clench_factor,
            self.engine.compression(),
            particles.active_count(),
            particles.capacity(),
            self.engine.ripples().active_count(),
        )
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn engine(&self)     -> &Engine     { &self.engine }
    pub fn frames(&self)     -> u64         { self.frames }
    pub fn rejected(&self)   -> u64         { self.rejected }
    pub fn last_stats(&self) -> FrameStats  { self.last }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the preview window until the user quits or the source fails.
///
/// The landmark source is the simulated hand by default and the LeapMotion
/// controller with `--features leap`, which falls back to the simulated hand
/// when it fails or stays silent.  Source frames and the render loop share
/// one [`SystemClock`] so timestamps line up.
pub fn run(cfg: AppConfig) -> Result<(), FxError> {
    let clock = SystemClock::new();

    // ── Landmark source ───────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();

    #[cfg(not(feature = "leap"))]
    let (mut source_rx, mut spare_sim) =
        (spawn_landmark_source(SimHandSource::new(sim_rx, clock)), None);

    #[cfg(feature = "leap")]
    let (mut source_rx, mut spare_sim) =
        (spawn_landmark_source(crate::source::LeapLandmarkSource { clock }), Some(sim_rx));

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(sim_tx)?;
    let mut app = AppState::new(cfg)?;
    if spare_sim.is_some() { app.arm_fallback(clock.now_ms()); }
    info!("preview running");

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        if !vis.poll_input() { break; }

        let mut failed = false;
        loop {
            match source_rx.try_recv() {
                Ok(event) => match app.handle_event(event)? {
                    Flow::Continue => {}
                    Flow::Quit => {
                        info!("source asked to quit");
                        return Ok(());
                    }
                    Flow::FallBack => {
                        failed = true;
                        break;
                    }
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("landmark source disconnected");
                    return Ok(());
                }
            }
        }
        if failed || app.fallback_due(clock.now_ms()) {
            switch_to_sim(&mut app, &mut source_rx, &mut spare_sim, clock);
        }

        app.tick(&clock);
        vis.render(&app.engine().snapshot(), &app.status())?;
    }

    info!(frames = app.frames(), rejected = app.rejected(), "preview closed");
    Ok(())
}

/// Replace the current source with a simulated hand fed by `spare`.  Only
/// the first call does anything.
fn switch_to_sim(
    app: &mut AppState,
    source_rx: &mut Receiver<SourceEvent>,
    spare: &mut Option<Receiver<SimInput>>,
    clock: SystemClock,
) {
    let Some(sim_rx) = spare.take() else { return };
    warn!("switching to the simulated hand");
    app.fall_back();
    *source_rx = spawn_landmark_source(SimHandSource::new(sim_rx, clock));
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{LandmarkFrame, LandmarkSource, SimKey, SimulatedHand};
    use hand_kinematics::{Landmark, ManualClock};
    use std::sync::mpsc::Sender;
    use std::time::Duration;

    fn frame(hand: &SimulatedHand, time_ms: f64) -> SourceEvent {
        SourceEvent::Frame(LandmarkFrame { landmarks: hand.landmarks(), time_ms })
    }

    #[test]
    fn default_aspect_matches_window() {
        assert_eq!(AppConfig::default().engine.aspect, 1.6);
    }

    #[test]
    fn frames_drive_the_engine() {
        let mut app = AppState::new(AppConfig::default()).unwrap();
        let clock = ManualClock::new(0.0);
        assert!(app.status().starts_with("no hand"));

        let hand = SimulatedHand::default();
        for _ in 0..3 {
            clock.advance(16.0);
            assert_eq!(app.handle_event(frame(&hand, clock.now_ms())).unwrap(), Flow::Continue);
            app.tick(&clock);
        }
        assert_eq!(app.frames(), 3);
        assert!(app.engine().hand().is_tracked);
        assert!(app.status().starts_with("pose open"));
    }

    #[test]
    fn bad_frame_is_counted_not_fatal() {
        let mut app = AppState::new(AppConfig::default()).unwrap();
        let mut landmarks = SimulatedHand::default().landmarks();
        landmarks[3] = Landmark::new(f32::NAN, 0.5, 0.0);
        let ev = SourceEvent::Frame(LandmarkFrame { landmarks, time_ms: 10.0 });
        assert_eq!(app.handle_event(ev).unwrap(), Flow::Continue);
        assert_eq!(app.rejected(), 1);
        assert!(!app.engine().hand().is_tracked);
    }

    #[test]
    fn reset_and_quit_and_failure() {
        let mut app = AppState::new(AppConfig::default()).unwrap();
        app.handle_event(frame(&SimulatedHand::default(), 5.0)).unwrap();
        assert!(app.engine().hand().is_tracked);

        assert_eq!(app.handle_event(SourceEvent::Reset).unwrap(), Flow::Continue);
        assert!(!app.engine().hand().is_tracked);

        assert_eq!(app.handle_event(SourceEvent::Quit).unwrap(), Flow::Quit);

        // nothing to fall back to
        let err = app.handle_event(SourceEvent::Failed("no device".into())).unwrap_err();
        assert_eq!(err.to_string(), "landmark source error: no device");
    }

    #[test]
    fn armed_failure_falls_back_once() {
        let mut app = AppState::new(AppConfig::default()).unwrap();
        app.arm_fallback(0.0);
        let failed = || SourceEvent::Failed("no device".into());
        assert_eq!(app.handle_event(failed()).unwrap(), Flow::FallBack);

        app.fall_back();
        assert!(!app.fallback_due(1e6));
        assert!(app.handle_event(failed()).is_err());
    }

    #[test]
    fn silent_source_times_out() {
        let mut app = AppState::new(AppConfig::default()).unwrap();
        assert!(!app.fallback_due(10_000.0));

        app.arm_fallback(1000.0);
        assert!(!app.fallback_due(3999.0));
        assert!(app.fallback_due(4000.0));

        // any frame, even a rejected one, proves the source is alive
        app.arm_fallback(1000.0);
        let mut landmarks = SimulatedHand::default().landmarks();
        landmarks[0] = Landmark::new(f32::NAN, 0.0, 0.0);
        app.handle_event(SourceEvent::Frame(LandmarkFrame { landmarks, time_ms: 1500.0 })).unwrap();
        assert!(!app.fallback_due(9000.0));
    }

    struct NoDevice;

    impl LandmarkSource for NoDevice {
        fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
            let _ = tx.send(SourceEvent::Failed("no device".into()));
        }
    }

    #[test]
    fn failing_source_is_replaced_by_the_simulated_hand() {
        let clock = SystemClock::new();
        let mut app = AppState::new(AppConfig::default()).unwrap();
        app.arm_fallback(clock.now_ms());

        let mut source_rx = spawn_landmark_source(NoDevice);
        let event = source_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(app.handle_event(event).unwrap(), Flow::FallBack);

        let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
        let mut spare = Some(sim_rx);
        switch_to_sim(&mut app, &mut source_rx, &mut spare, clock);
        assert!(spare.is_none());

        let event = source_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(event, SourceEvent::Frame(_)));
        assert_eq!(app.handle_event(event).unwrap(), Flow::Continue);
        assert!(app.engine().hand().is_tracked);

        // second switch is a no-op
        switch_to_sim(&mut app, &mut source_rx, &mut spare, clock);
        sim_tx.send(SimInput::KeyDown(SimKey::Quit)).unwrap();
        let quit = std::iter::from_fn(|| source_rx.recv_timeout(Duration::from_secs(2)).ok())
            .find(|e| *e == SourceEvent::Quit);
        assert_eq!(quit, Some(SourceEvent::Quit));
    }

    #[test]
    fn invalid_engine_config_is_reported() {
        let mut cfg = AppConfig::default();
        cfg.engine.bar_count = 0;
        match AppState::new(cfg) {
            Err(FxError::Config(e)) => assert!(e.to_string().contains("bar_count")),
            _ => panic!("expected a config error"),
        }
    }
}
