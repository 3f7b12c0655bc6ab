//! The frame-stepped effect engine.
//!
//! `Engine` owns the kinematic estimator and every effect.  The host feeds
//! it landmark frames as they arrive ([`Engine::ingest`]) and steps it once
//! per rendered frame ([`Engine::step`]).  Within a step the order is fixed:
//!
//! 1. staleness tick; an untracked hand hides the HUD and stops here,
//! 2. HUD layout from the current snapshot,
//! 3. gesture detection, then particle / ripple spawns,
//! 4. equalizer, orbit, trails, particles, ripples each advance once.
//!
//! All buffers are sized at construction.

use glam::Vec2;
use hand_kinematics::{
    EstimatorConfig, FrameTime, HandState, KinematicEstimator, Landmark, LandmarkError,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bars::{BarChannel, BarEqualizer, BarSprite, EqualizerConfig};
use crate::error::ConfigError;
use crate::gesture::{GestureConfig, GestureDetector, GestureSignal};
use crate::hud::{x_scale_for, Hud, Summon};
use crate::orbit::{OrbitBody, OrbitSimulator, OrbitSprite, SpringConfig};
use crate::palette::{Segment, Sprite};
use crate::particles::{ParticlePool, SpawnRequest};
use crate::ripple::RipplePool;
use crate::trail::{TrailBuffer, TrailInput};

// ════════════════════════════════════════════════════════════════════════════
// EngineConfig
// ════════════════════════════════════════════════════════════════════════════

/// Everything fixed at construction.  Any subset can be overridden by name
/// through serde; missing fields keep their defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub estimator:         EstimatorConfig,
    pub gesture:           GestureConfig,
    pub springs:           SpringConfig,
    pub equalizer:         EqualizerConfig,

    pub particle_capacity: usize,
    pub ripple_capacity:   usize,
    pub pointer_count:     usize,
    pub trail_capacity:    usize,
    pub bar_count:         usize,
    pub orbit_bodies:      usize,

    /// 0..1, how eagerly the pointers follow the hand.
    pub sensitivity:       f32,
    pub particle_scale:    f32,
    /// Window width / height.
    pub aspect:            f32,
    pub seed:              u64,
    /// Longest frame step (s) the host should feed.
    pub max_dt:            f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            estimator:         EstimatorConfig::default(),
            gesture:           GestureConfig::default(),
            springs:           SpringConfig::default(),
            equalizer:         EqualizerConfig::default(),
            particle_capacity: 150,
            ripple_capacity:   4,
            pointer_count:     8,
            trail_capacity:    80,
            bar_count:         28,
            orbit_bodies:      18,
            sensitivity:       0.3,
            particle_scale:    1.0,
            aspect:            1.0,
            seed:              0x5EED,
            max_dt:            0.05,
        }
    }
}

impl EngineConfig {
    pub fn with_sensitivity(mut self, s: f32) -> Self {
        self.sensitivity = s.clamp(0.0, 1.0);
        self
    }

    pub fn with_particle_scale(mut self, scale: f32) -> Self {
        self.particle_scale = scale;
        self
    }

    pub fn with_pinch_threshold(mut self, threshold: f32) -> Self {
        self.gesture.pinch_threshold = threshold;
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacities = [
            ("particle_capacity", self.particle_capacity),
            ("ripple_capacity",   self.ripple_capacity),
            ("pointer_count",     self.pointer_count),
            ("trail_capacity",    self.trail_capacity),
            ("bar_count",         self.bar_count),
            ("orbit_bodies",      self.orbit_bodies),
        ];
        for (name, n) in capacities {
            if n == 0 { return Err(ConfigError::ZeroCapacity { name }); }
        }

        let GestureConfig {
            pinch_threshold, fist_accel_threshold, compression_clench,
            compression_charge, compression_decay,
        } = self.gesture;
        let s = &self.springs;
        let positives = [
            ("stale_timeout_ms",     self.estimator.stale_timeout_ms),
            ("particle_scale",       self.particle_scale as f64),
            ("aspect",               self.aspect as f64),
            ("max_dt",               self.max_dt as f64),
            ("rise_rate",            self.equalizer.rise_rate as f64),
            ("decay_rate",           self.equalizer.decay_rate as f64),
            ("pinch_threshold",      pinch_threshold as f64),
            ("fist_accel_threshold", fist_accel_threshold as f64),
            ("compression_clench",   compression_clench as f64),
            ("compression_charge",   compression_charge as f64),
            ("compression_decay",    compression_decay as f64),
            ("radial_stiffness",     s.radial_stiffness as f64),
            ("angular_stiffness",    s.angular_stiffness as f64),
            ("radial_damping",       s.radial_damping as f64),
            ("angular_damping",      s.angular_damping as f64),
            ("scatter_threshold",    s.scatter_threshold as f64),
            ("pull_threshold",       s.pull_threshold as f64),
            ("carousel_threshold",   s.carousel_threshold as f64),
        ];
        for (name, value) in positives {
            // NaN fails the comparison
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        let EqualizerConfig { rise_rate, decay_rate } = self.equalizer;
        if !(rise_rate > decay_rate) {
            return Err(ConfigError::RiseNotAboveDecay { rise: rise_rate, decay: decay_rate });
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Per-frame output
// ════════════════════════════════════════════════════════════════════════════

/// What one step spawned, for status lines and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub signals:           usize,
    pub particles_spawned: usize,
    pub ripples_spawned:   usize,
}

/// Read-only view of everything a renderer needs for one frame.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub hand:         &'a HandState,
    pub hud:          Hud,
    pub compression:  f32,
    pub particles:    &'a [Sprite],
    pub ripples:      &'a [Segment],
    pub trails:       &'a [Sprite],
    pub spokes:       &'a [Segment],
    pub pointer_tips: &'a [Vec2],
    pub orbit:        &'a [OrbitSprite],
    pub bodies:       &'a [OrbitBody],
    pub bars:         &'a [BarSprite],
    pub channels:     &'a [BarChannel],
}

// ════════════════════════════════════════════════════════════════════════════
// Engine
// ════════════════════════════════════════════════════════════════════════════

pub struct Engine {
    config:      EngineConfig,

    // ── hand ──────────────────────────────────────────────────────────────
    estimator:   KinematicEstimator,
    detector:    GestureDetector,

    // ── effects ───────────────────────────────────────────────────────────
    particles:   ParticlePool,
    ripples:     RipplePool,
    trails:      TrailBuffer,
    orbit:       OrbitSimulator,
    bars:        BarEqualizer,

    // ── HUD ───────────────────────────────────────────────────────────────
    summon:      Summon,
    hud:         Hud,
    compression: f32,
    stats:       FrameStats,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let x_scale = x_scale_for(config.aspect);
        let engine = Engine {
            config,
            estimator:   KinematicEstimator::new(config.estimator),
            detector:    GestureDetector::new(config.gesture),
            particles:   ParticlePool::new(config.particle_capacity, config.particle_scale, config.seed),
            ripples:     RipplePool::new(config.ripple_capacity, x_scale),
            trails:      TrailBuffer::new(
                config.pointer_count,
                config.trail_capacity,
                config.sensitivity,
                config.particle_scale,
                x_scale,
            ),
            orbit:       OrbitSimulator::new(config.orbit_bodies, config.springs, config.seed.wrapping_add(1)),
            bars:        BarEqualizer::new(config.bar_count, config.equalizer),
            summon:      Summon::default(),
            hud:         Hud { x_scale, ..Hud::default() },
            compression: 0.0,
            stats:       FrameStats::default(),
        };
        info!(
            particles = config.particle_capacity,
            ripples = config.ripple_capacity,
            pointers = config.pointer_count,
            seed = config.seed,
            "engine ready"
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Feed one landmark frame.  A rejected frame leaves every state untouched.
    pub fn ingest(&mut self, landmarks: &[Landmark], now_ms: f64) -> Result<&HandState, LandmarkError> {
        self.estimator.update(landmarks, now_ms)
    }

    /// Advance everything by one frame.
    pub fn step(&mut self, frame: FrameTime) -> FrameStats {
        let dt = frame.dt;
        self.stats = FrameStats::default();
        self.estimator.tick(frame.now_ms);

        let hand = self.estimator.state();
        if !hand.is_tracked {
            if self.hud.visible { debug!("hud hidden"); }
            self.hud.visible = false;
            self.summon.reset();
            return self.stats;
        }

        let scale = self.config.particle_scale;
        self.hud = Hud::from_hand(hand, &self.summon, scale, self.hud.x_scale);

        // ── gestures → spawns ─────────────────────────────────────────────
        let depth = hand.depth_scale;
        let signals = self.detector.detect(hand, dt);
        self.stats.signals = signals.len();
        for &signal in signals {
            let (sparks, ripple) = match signal {
                GestureSignal::PinchLevel { at } =>
                    (SpawnRequest::spark(2, at, 0.03, 0.5), None),
                GestureSignal::PinchEdge { at } =>
                    (SpawnRequest::spark(25, at, 0.1, 0.8), Some((at, 0.12 * depth, 0.5))),
                GestureSignal::BurstLevel { at } =>
                    (SpawnRequest::burst(40, at, 0.18 * depth, 0.8), Some((at, 0.2 * depth, 0.8))),
                GestureSignal::PoseTransition { at } =>
                    (SpawnRequest::burst(30, at, 0.18 * depth, 0.8), Some((at, 0.2 * depth, 1.0))),
                GestureSignal::CompressionLevel(level) => {
                    self.compression = level;
                    continue;
                }
            };
            self.stats.particles_spawned += self.particles.spawn(sparks);
            if let Some((at, growth, life)) = ripple {
                if self.ripples.spawn(at, growth, life).is_some() {
                    self.stats.ripples_spawned += 1;
                }
            }
        }

        self.summon.advance(dt);

        // ── integrate ────────────────────────────────────────────────────
        let hud = self.hud;
        self.bars.step(frame.seconds() as f32, hand.speed, hand.clench_factor, dt);
        self.bars.layout(&hud);

        self.orbit.step(hand.clench_factor, hand.smooth_palm_angle, dt);
        self.orbit.layout(&hud, hand.finger_spread_norm, hand.clench_factor, scale);

        self.trails.update(&TrailInput {
            center:     hud.center,
            pinch_mid:  hand.pinch_midpoint(),
            pinch_dist: hand.pinch_distance(),
            hud_radius: hud.radius,
            depth,
            now:        frame.seconds(),
        });

        self.particles.step(dt);
        self.ripples.step(dt);
        self.stats
    }

    /// Reinitialise every structure.  Orbit equilibria are kept.
    pub fn reset(&mut self) {
        self.estimator.reset();
        self.detector.reset();
        self.particles.reset();
        self.ripples.reset();
        self.trails.reset();
        self.orbit.reset();
        self.bars.reset();
        self.summon.reset();
        self.hud = Hud { x_scale: self.hud.x_scale, ..Hud::default() };
        self.compression = 0.0;
        self.stats = FrameStats::default();
        info!("engine reset");
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn hand(&self)        -> &HandState      { self.estimator.state() }
    pub fn hud(&self)         -> &Hud            { &self.hud }
    pub fn compression(&self) -> f32             { self.compression }
    pub fn last_stats(&self)  -> FrameStats      { self.stats }
    pub fn particles(&self)   -> &ParticlePool   { &self.particles }
    pub fn ripples(&self)     -> &RipplePool     { &self.ripples }
    pub fn trails(&self)      -> &TrailBuffer    { &self.trails }
    pub fn orbit(&self)       -> &OrbitSimulator { &self.orbit }
    pub fn bars(&self)        -> &BarEqualizer   { &self.bars }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            hand:         self.estimator.state(),
            hud:          self.hud,
            compression:  self.compression,
            particles:    self.particles.sprites(),
            ripples:      self.ripples.segments(),
            trails:       self.trails.sprites(),
            spokes:       self.trails.spokes(),
            pointer_tips: self.trails.tips(),
            orbit:        self.orbit.sprites(),
            bodies:       self.orbit.bodies(),
            bars:         self.bars.sprites(),
            channels:     self.bars.channels(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SimulatedHand;
    use hand_kinematics::{Clock, FrameTimer, ManualClock, Pose};

    const FRAME_MS: f64 = 16.0;

    /// Drives an engine with a manual clock, one landmark frame per step.
    struct Rig {
        engine: Engine,
        clock:  ManualClock,
        timer:  FrameTimer,
    }

    impl Rig {
        fn new() -> Self {
            let config = EngineConfig::default();
            let mut timer = FrameTimer::new(config.max_dt);
            let clock = ManualClock::new(1000.0);
            timer.tick(&clock);
            Rig { engine: Engine::new(config).unwrap(), clock, timer }
        }

        fn frame(&mut self, hand: Option<&SimulatedHand>) -> FrameStats {
            self.clock.advance(FRAME_MS);
            if let Some(h) = hand {
                self.engine.ingest(&h.landmarks(), self.clock.now_ms()).unwrap();
            }
            let ft = self.timer.tick(&self.clock);
            self.engine.step(ft)
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut c = EngineConfig::default();
        c.ripple_capacity = 0;
        assert_eq!(c.validate(), Err(ConfigError::ZeroCapacity { name: "ripple_capacity" }));

        let mut c = EngineConfig::default();
        c.equalizer.rise_rate = 3.0;
        assert!(matches!(c.validate(), Err(ConfigError::RiseNotAboveDecay { .. })));

        let c = EngineConfig::default().with_pinch_threshold(0.0);
        assert!(matches!(c.validate(), Err(ConfigError::NotPositive { name: "pinch_threshold", .. })));

        let c = EngineConfig::default().with_particle_scale(f32::NAN);
        assert!(c.validate().is_err());
        assert!(Engine::new(c).is_err());
    }

    #[test]
    fn springs_and_thresholds_must_be_finite_and_positive() {
        let mut c = EngineConfig::default();
        c.springs.radial_stiffness = f32::INFINITY;
        assert!(matches!(c.validate(), Err(ConfigError::NotPositive { name: "radial_stiffness", .. })));

        let mut c = EngineConfig::default();
        c.springs.angular_damping = -1.0;
        assert!(matches!(c.validate(), Err(ConfigError::NotPositive { name: "angular_damping", .. })));

        let mut c = EngineConfig::default();
        c.gesture.fist_accel_threshold = f32::NAN;
        assert!(matches!(c.validate(), Err(ConfigError::NotPositive { name: "fist_accel_threshold", .. })));

        let mut c = EngineConfig::default();
        c.estimator.stale_timeout_ms = f64::INFINITY;
        assert!(matches!(c.validate(), Err(ConfigError::NotPositive { name: "stale_timeout_ms", .. })));

        let mut c = EngineConfig::default();
        c.springs.carousel_threshold = 0.0;
        assert!(Engine::new(c).is_err());

        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn named_overrides_keep_other_defaults() {
        let json = r#"{ "particle_capacity": 300, "gesture": { "pinch_threshold": 0.06 },
                        "estimator": { "stale_timeout_ms": 250.0 } }"#;
        let c: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.particle_capacity, 300);
        assert_eq!(c.gesture.pinch_threshold, 0.06);
        assert_eq!(c.gesture.fist_accel_threshold, 0.25);
        assert_eq!(c.estimator.stale_timeout_ms, 250.0);
        assert_eq!(c.bar_count, 28);
        assert_eq!(c.equalizer, EqualizerConfig::default());
    }

    #[test]
    fn builders_clamp_sensitivity() {
        assert_eq!(EngineConfig::default().with_sensitivity(3.0).sensitivity, 1.0);
        assert_eq!(EngineConfig::default().with_seed(9).seed, 9);
        assert_eq!(EngineConfig::default().with_aspect(1.6).aspect, 1.6);
    }

    #[test]
    fn untracked_engine_stays_hidden() {
        let mut rig = Rig::new();
        let stats = rig.frame(None);
        assert_eq!(stats, FrameStats::default());
        assert!(!rig.engine.hud().visible);
        assert!(rig.engine.snapshot().particles.is_empty());
    }

    #[test]
    fn pinch_edge_then_continuous_sparks() {
        let mut rig = Rig::new();
        let open = SimulatedHand::default();
        let pinched = SimulatedHand { pinch: 1.0, ..open };

        let s = rig.frame(Some(&open));
        assert_eq!(s.particles_spawned, 0);
        assert!(rig.engine.hud().visible);

        // crossing frame: 25 edge sparks + 2 level sparks + one ripple
        let s = rig.frame(Some(&pinched));
        assert_eq!(s.particles_spawned, 27);
        assert_eq!(s.ripples_spawned, 1);
        assert_eq!(rig.engine.particles().active_count(), 27);

        for _ in 0..5 {
            let s = rig.frame(Some(&pinched));
            assert_eq!(s.particles_spawned, 2);
            assert_eq!(s.ripples_spawned, 0);
        }
        assert_eq!(rig.engine.ripples().active_count(), 1);
    }

    #[test]
    fn shaking_fist_bursts_every_frame() {
        let mut rig = Rig::new();
        let mut fist = SimulatedHand { openness: 0.0, ..SimulatedHand::default() };
        rig.frame(Some(&fist));
        assert_eq!(rig.engine.hand().pose, Pose::Fist);

        for i in 0..5 {
            fist.palm.x = if i % 2 == 0 { 0.45 } else { 0.55 };
            let s = rig.frame(Some(&fist));
            assert!(rig.engine.hand().accel_norm > 0.30);
            assert_eq!(s.ripples_spawned, 1);
            assert!(s.particles_spawned > 0 || rig.engine.particles().active_count() == 150);
            assert!(rig.engine.particles().active_count() <= 150);
        }
        assert_eq!(rig.engine.ripples().active_count(), 4);
    }

    #[test]
    fn releasing_fist_bursts_once() {
        let mut rig = Rig::new();
        let fist = SimulatedHand { openness: 0.0, ..SimulatedHand::default() };
        let open = SimulatedHand::default();
        rig.frame(Some(&fist));
        rig.frame(Some(&fist));
        let s = rig.frame(Some(&open));
        assert_eq!(rig.engine.hand().pose, Pose::Open);
        assert_eq!(s.particles_spawned, 30);
        assert_eq!(s.ripples_spawned, 1);
        let s = rig.frame(Some(&open));
        assert_eq!(s.particles_spawned, 0);
    }

    #[test]
    fn stale_hand_hides_hud_and_resets_summon() {
        let mut rig = Rig::new();
        let open = SimulatedHand::default();
        for _ in 0..10 { rig.frame(Some(&open)); }
        let r1 = rig.engine.hud().radius;
        assert!(r1 > 0.0);

        // 31 silent frames = 496 ms since the last landmark frame
        for _ in 0..31 { rig.frame(None); }
        assert!(rig.engine.hand().is_tracked);
        rig.frame(None);
        assert!(!rig.engine.hand().is_tracked);
        assert!(!rig.engine.hud().visible);

        // back: HUD summons again from zero
        rig.frame(Some(&open));
        assert!(rig.engine.hud().visible);
        assert_eq!(rig.engine.hud().radius, 0.0);
    }

    #[test]
    fn long_stall_untracks_despite_dt_clamp() {
        let mut rig = Rig::new();
        let open = SimulatedHand::default();
        rig.frame(Some(&open));
        assert!(rig.engine.hand().is_tracked);

        // one 2 s render stall: dt clamps to max_dt, staleness must not
        rig.clock.advance(2000.0 - FRAME_MS);
        rig.frame(None);
        assert!(!rig.engine.hand().is_tracked);
        assert!(rig.engine.hand().time_since_update_ms >= 2000.0);
        assert!(!rig.engine.hud().visible);
    }

    #[test]
    fn snapshot_shapes() {
        let mut rig = Rig::new();
        let open = SimulatedHand::default();
        for _ in 0..20 { rig.frame(Some(&open)); }
        let snap = rig.engine.snapshot();
        assert_eq!(snap.bars.len(), 28);
        assert_eq!(snap.channels.len(), 28);
        assert_eq!(snap.orbit.len(), 18);
        assert_eq!(snap.bodies.len(), 18);
        assert_eq!(snap.pointer_tips.len(), 8);
        assert_eq!(snap.spokes.len(), 8 * crate::trail::SPOKE_SEGMENTS);
        assert!(snap.hud.visible);
    }

    #[test]
    fn same_seed_same_frames() {
        let run = || {
            let mut rig = Rig::new();
            let mut h = SimulatedHand { pinch: 1.0, ..SimulatedHand::default() };
            for i in 0..40 {
                h.openness = if (i / 10) % 2 == 0 { 1.0 } else { 0.0 };
                h.palm.x = 0.5 + 0.01 * i as f32;
                rig.frame(Some(&h));
            }
            let snap = rig.engine.snapshot();
            (snap.particles.to_vec(), snap.bodies.to_vec())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn reset_clears_effects() {
        let mut rig = Rig::new();
        let open = SimulatedHand::default();
        rig.frame(Some(&open));
        rig.frame(Some(&SimulatedHand { pinch: 1.0, ..open }));
        rig.engine.reset();
        assert!(!rig.engine.hand().is_tracked);
        assert_eq!(rig.engine.particles().active_count(), 0);
        assert_eq!(rig.engine.ripples().active_count(), 0);
        assert_eq!(rig.engine.compression(), 0.0);
    }

    #[test]
    fn reset_replays_like_a_fresh_engine() {
        let play = |rig: &mut Rig| {
            let open = SimulatedHand::default();
            for i in 0..12 {
                let pinch = if i % 4 < 2 { 1.0 } else { 0.0 };
                rig.frame(Some(&SimulatedHand { pinch, ..open }));
            }
            rig.engine.snapshot().particles.to_vec()
        };
        let mut fresh = Rig::new();
        let want = play(&mut fresh);
        assert!(!want.is_empty());

        let mut reused = Rig::new();
        play(&mut reused);
        reused.engine.reset();
        assert_eq!(play(&mut reused), want);
    }
}
