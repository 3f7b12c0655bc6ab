//! Gesture detection over successive [`HandState`] snapshots.
//!
//! The detector owns its own hysteresis (previous pinch flag, previous pose,
//! compression level) and emits [`GestureSignal`]s.  Consumers don't need to
//! know which signals are edge- and which are level-triggered; they react to
//! whatever arrives each frame.
//!
//! | Signal | Trigger | Fires |
//! |---|---|---|
//! | `PinchLevel` | thumb/index tips closer than the threshold | every frame |
//! | `PinchEdge` | pinch begins | once |
//! | `BurstLevel` | fist while accelerating hard | every frame |
//! | `PoseTransition` | fist opens | once |
//! | `CompressionLevel` | clench leaky integrator | every frame |

use glam::Vec2;
use hand_kinematics::{HandState, Pose};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound on signals emitted in one frame.
pub const MAX_SIGNALS_PER_FRAME: usize = 5;

// ════════════════════════════════════════════════════════════════════════════
// GestureSignal
// ════════════════════════════════════════════════════════════════════════════

/// A gesture observation for one frame.  Positions are in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureSignal {
    /// Pinch just closed, at the thumb/index midpoint.
    PinchEdge { at: Vec2 },
    /// Pinch is held, at the thumb/index midpoint.
    PinchLevel { at: Vec2 },
    /// Fist moving with high acceleration, at the palm.
    BurstLevel { at: Vec2 },
    /// Fist released into an open hand, at the palm.
    PoseTransition { at: Vec2 },
    /// Current compression charge in `[0, 1]`.
    CompressionLevel(f32),
}

impl GestureSignal {
    /// True for signals that fire once per transition.
    pub fn is_edge(&self) -> bool {
        matches!(self, GestureSignal::PinchEdge { .. } | GestureSignal::PoseTransition { .. })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureConfig
// ════════════════════════════════════════════════════════════════════════════

/// Thresholds (empirically tuned).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Screen-space thumb/index distance below which the hand pinches.
    pub pinch_threshold:      f32,
    /// Acceleration magnitude a fist must exceed to burst.
    pub fist_accel_threshold: f32,
    /// Clench above which compression charges.
    pub compression_clench:   f32,
    /// Charge rate per second.
    pub compression_charge:   f32,
    /// Exponential decay rate per second.
    pub compression_decay:    f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            pinch_threshold:      0.045,
            fist_accel_threshold: 0.25,
            compression_clench:   0.65,
            compression_charge:   4.0,
            compression_decay:    5.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// GestureDetector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct GestureDetector {
    config:       GestureConfig,
    was_pinching: bool,
    prev_pose:    Pose,
    compression:  f32,
    signals:      Vec<GestureSignal>,
}

impl GestureDetector {
    pub fn new(config: GestureConfig) -> Self {
        GestureDetector {
            config,
            was_pinching: false,
            prev_pose:    Pose::Open,
            compression:  0.0,
            signals:      Vec::with_capacity(MAX_SIGNALS_PER_FRAME),
        }
    }

    pub fn reset(&mut self) {
        self.was_pinching = false;
        self.prev_pose = Pose::Open;
        self.compression = 0.0;
        self.signals.clear();
    }

    pub fn is_pinching(&self) -> bool { self.was_pinching }
    pub fn compression(&self) -> f32 { self.compression }

    /// Signals from the most recent [`detect`](Self::detect) call.
    pub fn signals(&self) -> &[GestureSignal] { &self.signals }

    /// Examine one snapshot.  `dt` is the frame step in seconds.
    pub fn detect(&mut self, hand: &HandState, dt: f32) -> &[GestureSignal] {
        let cfg = self.config;
        self.signals.clear();

        // ── Pinch ─────────────────────────────────────────────────────────
        let pinching = hand.pinch_distance() < cfg.pinch_threshold;
        let mid = hand.pinch_midpoint();
        if pinching {
            self.signals.push(GestureSignal::PinchLevel { at: mid });
            if !self.was_pinching {
                debug!(x = mid.x, y = mid.y, "pinch started");
                self.signals.push(GestureSignal::PinchEdge { at: mid });
            }
        }
        self.was_pinching = pinching;

        // ── Sustained fist ────────────────────────────────────────────────
        if hand.pose == Pose::Fist && hand.accel_norm > cfg.fist_accel_threshold {
            self.signals.push(GestureSignal::BurstLevel { at: hand.screen_palm });
        }

        // ── Fist → Open ───────────────────────────────────────────────────
        if self.prev_pose == Pose::Fist && hand.pose == Pose::Open {
            debug!("fist released");
            self.signals.push(GestureSignal::PoseTransition { at: hand.screen_palm });
        }
        self.prev_pose = hand.pose;

        // ── Compression ───────────────────────────────────────────────────
        if hand.clench_factor > cfg.compression_clench {
            self.compression = (self.compression + cfg.compression_charge * dt).min(1.0);
        } else {
            self.compression *= (-cfg.compression_decay * dt).exp();
        }
        self.signals.push(GestureSignal::CompressionLevel(self.compression));

        &self.signals
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
