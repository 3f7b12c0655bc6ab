//! Kinematic state estimator: landmarks in, [`HandState`] out.
//!
//! # Algorithm
//!
//! Each accepted frame:
//!
//! * **Remap** every landmark to model space (centered, y flipped, depth
//!   negated, scaled) and to mirrored screen space.
//! * **Palm**: center = mean of wrist + four finger bases; normal = unit
//!   cross product of (index base − wrist) × (pinky base − wrist).
//! * **Derivatives** against the previous accepted frame: velocity is a
//!   finite difference blended with the previous estimate, acceleration the
//!   raw difference of that smoothed velocity, rotation rate the angle
//!   between successive palm normals per second.
//! * **Shape metrics**: per-digit curl, thumb/index clench, thumb/index
//!   spread, then a priority-ordered pose classification.
//!
//! Staleness is driven separately by [`KinematicEstimator::tick`].

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::landmark::{
    validate_frame, Landmark, LandmarkError, FINGER_BASES, FINGER_TIPS, INDEX_MCP, INDEX_TIP,
    LANDMARK_COUNT, MIDDLE_MCP, MIDDLE_TIP, PALM_JOINTS, PINKY_MCP, THUMB_TIP, WRIST,
};
use crate::state::{HandState, Pose, DEFAULT_PALM_NORMAL};

/// Below this length a vector is treated as having no direction.
const DEGENERATE_LEN: f32 = 1e-7;
/// Frames closer together than this (seconds) do not update derivatives.
const MIN_DT: f64 = 1e-6;
/// Floor for the wrist-to-base reference length of a ratio.
const MIN_REFERENCE_LEN: f32 = 0.001;
/// Tip-to-base distance of a straight digit, relative to base-to-wrist.
const EXTENSION_REACH: f32 = 1.5;
/// Image-space wrist to middle-tip span of a hand at nominal depth.
const NOMINAL_HAND_SPAN: f32 = 0.22;

// ════════════════════════════════════════════════════════════════════════════
// EstimatorConfig
// ════════════════════════════════════════════════════════════════════════════

/// Tuning for [`KinematicEstimator`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// No update for this long (ms) marks the hand untracked.
    pub stale_timeout_ms: f64,
    /// Per-call exponential factor for the palm roll angle.
    pub palm_angle_smoothing: f32,
    /// Weight of the previous velocity in the velocity blend.
    pub velocity_blend: f32,
    /// Image-to-model scale.
    pub model_scale: f32,
    /// Thumb/index angle (rad) mapped to spread 0.
    pub spread_min_angle: f32,
    /// Thumb/index angle (rad) mapped to spread 1.
    pub spread_max_angle: f32,
    /// Curl below this counts as extended.
    pub extended_curl: f32,
    /// Curl above this counts as curled.
    pub curled_curl: f32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            stale_timeout_ms:     500.0,
            palm_angle_smoothing: 0.15,
            velocity_blend:       0.5,
            model_scale:          0.3,
            spread_min_angle:     0.05,
            spread_max_angle:     0.50,
            extended_curl:        0.35,
            curled_curl:          0.6,
        }
    }
}

impl EstimatorConfig {
    pub fn with_stale_timeout_ms(mut self, ms: f64) -> Self {
        self.stale_timeout_ms = ms;
        self
    }

    pub fn with_palm_angle_smoothing(mut self, factor: f32) -> Self {
        self.palm_angle_smoothing = factor;
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════
// KinematicEstimator
// ════════════════════════════════════════════════════════════════════════════

/// Values carried from the previous accepted frame.
#[derive(Clone, Copy, Debug)]
struct PrevSample {
    palm:     Vec3,
    velocity: Vec3,
    normal:   Vec3,
    time_ms:  f64,
}

/// Converts raw landmark frames into [`HandState`] snapshots.
#[derive(Debug, Clone)]
pub struct KinematicEstimator {
    config: EstimatorConfig,
    state:  HandState,
    prev:   Option<PrevSample>,
}

impl KinematicEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        KinematicEstimator { config, state: HandState::default(), prev: None }
    }

    pub fn config(&self) -> &EstimatorConfig { &self.config }

    /// The most recent snapshot.
    pub fn state(&self) -> &HandState { &self.state }

    /// Forget all history.
    pub fn reset(&mut self) {
        self.state = HandState::default();
        self.prev = None;
    }

    /// Re-measure staleness against the wall-clock time `now_ms`, on the same
    /// timeline as the frame timestamps passed to [`update`](Self::update).
    pub fn tick(&mut self, now_ms: f64) {
        if !self.state.is_tracked { return; }
        let Some(prev) = self.prev else { return };
        self.state.time_since_update_ms = (now_ms - prev.time_ms).max(0.0);
        if self.state.time_since_update_ms >= self.config.stale_timeout_ms {
            self.state.is_tracked = false;
            debug!(after_ms = self.state.time_since_update_ms, "hand tracking lost");
        }
    }

    /// Accept one landmark frame captured at `now_ms`.
    ///
    /// A frame with the wrong landmark count or a non-finite coordinate is
    /// rejected and the current state is left untouched.
    pub fn update(&mut self, landmarks: &[Landmark], now_ms: f64) -> Result<&HandState, LandmarkError> {
        let frame = match validate_frame(landmarks) {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "rejected landmark frame");
                return Err(e);
            }
        };

        let cfg = self.config;
        let prev_state = &self.state;

        // ── coordinate remap ──────────────────────────────────────────────
        let mut joints = [Vec3::ZERO; LANDMARK_COUNT];
        let mut screen = [Vec2::ZERO; LANDMARK_COUNT];
        for (i, lm) in frame.iter().enumerate() {
            joints[i] = Vec3::new(
                (lm.x - 0.5) * cfg.model_scale,
                -(lm.y - 0.5) * cfg.model_scale,
                -lm.z * cfg.model_scale,
            );
            screen[i] = Vec2::new(1.0 - lm.x, 1.0 - lm.y);
        }

        // ── palm ──────────────────────────────────────────────────────────
        let palm_center = PALM_JOINTS.iter().map(|&j| joints[j]).sum::<Vec3>() / PALM_JOINTS.len() as f32;
        let screen_palm = PALM_JOINTS.iter().map(|&j| screen[j]).sum::<Vec2>() / PALM_JOINTS.len() as f32;
        let palm_normal = palm_normal(&joints);

        // ── derivatives ───────────────────────────────────────────────────
        let mut velocity = prev_state.velocity;
        let mut acceleration = prev_state.acceleration;
        let mut accel_norm = prev_state.accel_norm;
        let mut wrist_rotation_rate = prev_state.wrist_rotation_rate;

        if let Some(prev) = self.prev {
            let dt = (now_ms - prev.time_ms) / 1000.0;
            if dt > MIN_DT {
                let dt = dt as f32;
                let raw = (palm_center - prev.palm) / dt;
                velocity = raw.lerp(prev.velocity, cfg.velocity_blend);
                acceleration = (velocity - prev.velocity) / dt;
                accel_norm = acceleration.length();
                let cos = prev.normal.dot(palm_normal).clamp(-1.0, 1.0);
                wrist_rotation_rate = cos.acos() / dt;
            } else {
                wrist_rotation_rate = 0.0;
            }
        }

        // ── shape metrics ─────────────────────────────────────────────────
        let mut finger_curl = [0.0f32; 5];
        for f in 0..5 {
            finger_curl[f] = 1.0 - extension(&joints, FINGER_BASES[f], FINGER_TIPS[f]);
        }
        let clench_factor = 1.0
            - (extension(&joints, FINGER_BASES[0], FINGER_TIPS[0])
                + extension(&joints, FINGER_BASES[1], FINGER_TIPS[1]))
                / 2.0;
        let finger_spread_norm = spread(&joints, &cfg);

        let wrist = frame[WRIST];
        let mid_tip = frame[MIDDLE_TIP];
        let hand_span = Vec2::new(wrist.x - mid_tip.x, wrist.y - mid_tip.y).length();
        let depth_scale = (hand_span / NOMINAL_HAND_SPAN).clamp(0.3, 2.5);

        let up = screen[MIDDLE_MCP] - screen[WRIST];
        let raw_angle = up.x.atan2(-up.y);
        let smooth_palm_angle = prev_state.smooth_palm_angle
            + (raw_angle - prev_state.smooth_palm_angle) * cfg.palm_angle_smoothing;

        let pose = classify_pose(&finger_curl, &cfg);
        if pose != prev_state.pose {
            debug!(from = prev_state.pose.name(), to = pose.name(), "pose changed");
        }
        if !prev_state.is_tracked {
            debug!("hand tracking acquired");
        }

        self.state = HandState {
            joints,
            palm_center,
            palm_normal,
            velocity,
            speed: velocity.length(),
            acceleration,
            accel_norm,
            wrist_rotation_rate,
            finger_spread_norm,
            clench_factor,
            finger_curl,
            pose,
            is_tracked: true,
            time_since_update_ms: 0.0,
            screen_joints: screen,
            screen_palm,
            depth_scale,
            smooth_palm_angle,
        };
        self.prev = Some(PrevSample { palm: palm_center, velocity, normal: palm_normal, time_ms: now_ms });

        Ok(&self.state)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Geometry helpers
// ════════════════════════════════════════════════════════════════════════════

fn palm_normal(joints: &[Vec3; LANDMARK_COUNT]) -> Vec3 {
    let wrist = joints[WRIST];
    let n = (joints[INDEX_MCP] - wrist).cross(joints[PINKY_MCP] - wrist);
    let len = n.length();
    if len > DEGENERATE_LEN { n / len } else { DEFAULT_PALM_NORMAL }
}

fn unit_or_zero(v: Vec3) -> Vec3 {
    let len = v.length();
    if len > DEGENERATE_LEN { v / len } else { Vec3::ZERO }
}

/// Straightness of one digit in `[0, 1]`: tip-to-base distance relative to
/// a straight digit's reach, estimated from base-to-wrist.
fn extension(joints: &[Vec3; LANDMARK_COUNT], base: usize, tip: usize) -> f32 {
    let reach = (joints[WRIST] - joints[base]).length() * EXTENSION_REACH;
    let current = (joints[tip] - joints[base]).length();
    (current / reach.max(MIN_REFERENCE_LEN)).clamp(0.0, 1.0)
}

/// Thumb/index angular separation measured from the wrist, normalised.
fn spread(joints: &[Vec3; LANDMARK_COUNT], cfg: &EstimatorConfig) -> f32 {
    let wrist = joints[WRIST];
    let thumb = unit_or_zero(joints[THUMB_TIP] - wrist);
    let index = unit_or_zero(joints[INDEX_TIP] - wrist);
    let angle = thumb.dot(index).clamp(-1.0, 1.0).acos();
    let span = (cfg.spread_max_angle - cfg.spread_min_angle).max(f32::EPSILON);
    ((angle - cfg.spread_min_angle) / span).clamp(0.0, 1.0)
}

fn classify_pose(curl: &[f32; 5], cfg: &EstimatorConfig) -> Pose {
    let thumb_ext    = curl[0] < cfg.extended_curl;
    let index_ext    = curl[1] < cfg.extended_curl;
    let thumb_curled = curl[0] > cfg.curled_curl;
    let index_curled = curl[1] > cfg.curled_curl;

    if thumb_ext && index_ext {
        Pose::Open
    } else if thumb_curled && index_curled {
        Pose::Fist
    } else if index_ext && !thumb_ext {
        Pose::PointOnly
    } else {
        Pose::Point
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const WRIST_AT: (f32, f32) = (0.5, 0.7);

    /// Synthetic flat hand.  Each digit lies on a ray from the wrist; `ext`
    /// scales how far the distal joints reach past the base.
    fn hand(thumb_ext: f32, index_ext: f32, thumb_angle: f32) -> Vec<Landmark> {
        let angles = [thumb_angle, -0.3, 0.0, 0.3, 0.6];
        let exts = [thumb_ext, index_ext, 1.0, 1.0, 1.0];
        let mut lms = vec![Landmark::new(WRIST_AT.0, WRIST_AT.1, 0.0)];
        for f in 0..5 {
            let (s, c) = angles[f].sin_cos();
            let e = exts[f];
            let dists = if f == 0 {
                [0.05, 0.1, 0.1 + 0.06 * e, 0.1 + 0.12 * e]
            } else {
                [0.1, 0.1 + 0.04 * e, 0.1 + 0.08 * e, 0.1 + 0.12 * e]
            };
            for d in dists {
                lms.push(Landmark::new(WRIST_AT.0 + s * d, WRIST_AT.1 - c * d, 0.0));
            }
        }
        lms
    }

    fn shifted(lms: &[Landmark], dx: f32) -> Vec<Landmark> {
        lms.iter().map(|l| Landmark::new(l.x + dx, l.y, l.z)).collect()
    }

    fn est() -> KinematicEstimator {
        KinematicEstimator::new(EstimatorConfig::default())
    }

    // ── validation ────────────────────────────────────────────────────────
    #[test]
    fn bad_frame_leaves_state_untouched() {
        let mut e = est();
        e.update(&hand(1.0, 1.0, -0.9), 0.0).unwrap();
        let before = e.state().clone();
        let mut bad = hand(0.1, 0.1, -0.9);
        bad[3].x = f32::NAN;
        assert!(e.update(&bad, 16.0).is_err());
        assert!(e.update(&bad[..20], 16.0).is_err());
        assert_eq!(e.state(), &before);
    }

    // ── palm normal ───────────────────────────────────────────────────────
    #[test]
    fn palm_normal_is_unit() {
        let mut e = est();
        for (i, ext) in [0.1f32, 0.5, 1.0].iter().enumerate() {
            let mut lms = hand(*ext, 1.0 - ext * 0.5, -0.9);
            lms[PINKY_MCP].z = 0.05 * i as f32;
            let s = e.update(&lms, i as f64 * 16.0).unwrap();
            assert!((s.palm_normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_palm_uses_default_normal() {
        let mut e = est();
        let lms = vec![Landmark::new(0.3, 0.3, 0.0); LANDMARK_COUNT];
        let s = e.update(&lms, 0.0).unwrap();
        assert_eq!(s.palm_normal, DEFAULT_PALM_NORMAL);
    }

    // ── curl / clench ─────────────────────────────────────────────────────
    #[test]
    fn curl_is_bounded_even_for_zero_length_bones() {
        let mut e = est();
        let lms = vec![Landmark::new(0.3, 0.3, 0.0); LANDMARK_COUNT];
        let s = e.update(&lms, 0.0).unwrap();
        for c in s.finger_curl {
            assert!((0.0..=1.0).contains(&c));
        }
        assert!((0.0..=1.0).contains(&s.clench_factor));

        for ext in [0.0f32, 0.3, 1.0, 3.0] {
            let s = e.update(&hand(ext, ext, -0.9), 10.0).unwrap();
            for c in s.finger_curl {
                assert!((0.0..=1.0).contains(&c), "curl {} for ext {}", c, ext);
            }
        }
    }

    #[test]
    fn straight_digit_curl_value() {
        // tip-base = 0.12, reach = 1.5 * 0.1 → extension 0.8 → curl 0.2
        let mut e = est();
        let s = e.update(&hand(1.0, 1.0, -0.9), 0.0).unwrap();
        assert!((s.finger_curl[1] - 0.2).abs() < 1e-4);
        assert!((s.clench_factor - 0.2).abs() < 1e-4);
    }

    // ── pose ──────────────────────────────────────────────────────────────
    #[test]
    fn pose_classification_priorities() {
        let mut e = est();
        assert_eq!(e.update(&hand(1.0, 1.0, -0.9), 0.0).unwrap().pose, Pose::Open);
        assert_eq!(e.update(&hand(0.1, 0.1, -0.9), 16.0).unwrap().pose, Pose::Fist);
        assert_eq!(e.update(&hand(0.6, 1.0, -0.9), 32.0).unwrap().pose, Pose::PointOnly);
        assert_eq!(e.update(&hand(1.0, 0.1, -0.9), 48.0).unwrap().pose, Pose::Point);
    }

    // ── spread ────────────────────────────────────────────────────────────
    #[test]
    fn spread_maps_calibrated_range() {
        let mut e = est();
        // index at −0.3 rad; thumb 0.275 rad further out → halfway
        let s = e.update(&hand(1.0, 1.0, -0.575), 0.0).unwrap();
        assert!((s.finger_spread_norm - 0.5).abs() < 1e-3, "{}", s.finger_spread_norm);
        let s = e.update(&hand(1.0, 1.0, -0.9), 16.0).unwrap();
        assert_eq!(s.finger_spread_norm, 1.0);
        let s = e.update(&hand(1.0, 1.0, -0.3), 32.0).unwrap();
        assert_eq!(s.finger_spread_norm, 0.0);
    }

    // ── derivatives ───────────────────────────────────────────────────────
    #[test]
    fn velocity_is_blended_with_previous_estimate() {
        let mut e = est();
        let base = hand(1.0, 1.0, -0.9);
        e.update(&base, 0.0).unwrap();
        assert_eq!(e.state().velocity, Vec3::ZERO);

        // +0.01 image x over 0.1 s = 0.003 model units / 0.1 s = 0.03 /s
        let s = e.update(&shifted(&base, 0.01), 100.0).unwrap();
        assert!((s.velocity.x - 0.015).abs() < 1e-5);
        assert!((s.acceleration.x - 0.15).abs() < 1e-3);

        let s = e.update(&shifted(&base, 0.02), 200.0).unwrap();
        assert!((s.velocity.x - 0.0225).abs() < 1e-5);
        assert!((s.speed - s.velocity.length()).abs() < 1e-7);
    }

    #[test]
    fn velocity_holds_when_dt_is_tiny() {
        let mut e = est();
        let base = hand(1.0, 1.0, -0.9);
        e.update(&base, 0.0).unwrap();
        e.update(&shifted(&base, 0.01), 100.0).unwrap();
        let v = e.state().velocity;
        let s = e.update(&shifted(&base, 0.05), 100.0).unwrap();
        assert_eq!(s.velocity, v);
        assert_eq!(s.wrist_rotation_rate, 0.0);
    }

    #[test]
    fn rotation_rate_is_zero_for_steady_palm() {
        let mut e = est();
        let base = hand(1.0, 1.0, -0.9);
        e.update(&base, 0.0).unwrap();
        let s = e.update(&shifted(&base, 0.01), 16.0).unwrap();
        assert!(s.wrist_rotation_rate.abs() < 1e-3);
    }

    #[test]
    fn rotation_rate_for_flipped_palm() {
        let mut e = est();
        let base = hand(1.0, 1.0, -0.9);
        e.update(&base, 0.0).unwrap();
        // mirror x about the wrist: the palm normal flips
        let mirrored: Vec<Landmark> = base
            .iter()
            .map(|l| Landmark::new(2.0 * WRIST_AT.0 - l.x, l.y, l.z))
            .collect();
        let s = e.update(&mirrored, 500.0).unwrap();
        assert!((s.wrist_rotation_rate - std::f32::consts::PI / 0.5).abs() < 1e-3);
    }

    // ── depth / palm angle ────────────────────────────────────────────────
    #[test]
    fn depth_scale_from_hand_span() {
        let mut e = est();
        // middle tip sits 0.22 from the wrist
        let s = e.update(&hand(1.0, 1.0, -0.9), 0.0).unwrap();
        assert!((s.depth_scale - 1.0).abs() < 1e-4);
    }

    #[test]
    fn palm_angle_smoothing_is_per_call() {
        let mut e = est();
        let lms = hand(1.0, 1.0, -0.9);
        let first = e.update(&lms, 0.0).unwrap().smooth_palm_angle;
        let second = e.update(&lms, 1.0).unwrap().smooth_palm_angle;
        // same raw angle twice: 0.15, then 0.15 + 0.85 * 0.15
        assert!(first.abs() > 0.0);
        assert!((second / first - 1.85).abs() < 1e-4);
    }

    // ── staleness ─────────────────────────────────────────────────────────
    #[test]
    fn staleness_flips_at_timeout() {
        let mut e = est();
        assert!(!e.state().is_tracked);
        e.update(&hand(1.0, 1.0, -0.9), 0.0).unwrap();
        assert!(e.state().is_tracked);
        e.tick(499.0);
        assert!(e.state().is_tracked);
        assert_eq!(e.state().time_since_update_ms, 499.0);
        e.tick(500.0);
        assert!(!e.state().is_tracked);
    }

    #[test]
    fn staleness_is_measured_from_the_last_frame() {
        let mut e = est();
        e.update(&hand(1.0, 1.0, -0.9), 1000.0).unwrap();
        // one long gap counts in full
        e.tick(3000.0);
        assert!(!e.state().is_tracked);
        assert_eq!(e.state().time_since_update_ms, 2000.0);

        // ticks before the frame time never count negative
        e.update(&hand(1.0, 1.0, -0.9), 4000.0).unwrap();
        e.tick(3990.0);
        assert!(e.state().is_tracked);
        assert_eq!(e.state().time_since_update_ms, 0.0);
    }

    #[test]
    fn any_update_retracks_regardless_of_gap() {
        let mut e = est();
        e.update(&hand(1.0, 1.0, -0.9), 0.0).unwrap();
        e.tick(10_000.0);
        assert!(!e.state().is_tracked);
        let s = e.update(&hand(1.0, 1.0, -0.9), 60_000.0).unwrap();
        assert!(s.is_tracked);
        assert_eq!(s.time_since_update_ms, 0.0);
    }

    #[test]
    fn reset_forgets_history() {
        let mut e = est();
        e.update(&hand(1.0, 1.0, -0.9), 0.0).unwrap();
        e.reset();
        assert_eq!(e.state(), &HandState::default());
    }

    #[test]
    fn config_overrides_by_name() {
        let cfg: EstimatorConfig =
            serde_json::from_str(r#"{ "stale_timeout_ms": 250.0 }"#).unwrap();
        assert_eq!(cfg.stale_timeout_ms, 250.0);
        assert_eq!(cfg.palm_angle_smoothing, 0.15);
    }
}
