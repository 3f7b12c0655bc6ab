//! The per-frame hand snapshot.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::landmark::{INDEX_TIP, LANDMARK_COUNT, THUMB_TIP};

/// Palm normal used when the palm triangle is degenerate.
pub const DEFAULT_PALM_NORMAL: Vec3 = Vec3::Y;

// ════════════════════════════════════════════════════════════════════════════
// Pose
// ════════════════════════════════════════════════════════════════════════════

/// Discrete hand pose, classified from thumb and index curl.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pose {
    /// Thumb and index both extended.
    #[default]
    Open,
    /// Thumb and index both curled.
    Fist,
    /// Anything in between.
    Point,
    /// Index extended, thumb not.
    PointOnly,
}

impl Pose {
    pub fn name(&self) -> &'static str {
        match self {
            Pose::Open      => "open",
            Pose::Fist      => "fist",
            Pose::Point     => "point",
            Pose::PointOnly => "point-only",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandState
// ════════════════════════════════════════════════════════════════════════════

/// Smoothed kinematic snapshot of one tracked hand.
///
/// Model-space fields (`joints`, `palm_center`, velocities) are centered on
/// the image, y-up, depth toward the viewer and scaled by 0.3.  The
/// `screen_*` fields are the mirrored image-space positions the effects are
/// laid out in.
#[derive(Clone, Debug, PartialEq)]
pub struct HandState {
    pub joints:        [Vec3; LANDMARK_COUNT],
    pub palm_center:   Vec3,
    /// Unit length, or [`DEFAULT_PALM_NORMAL`] for a degenerate palm.
    pub palm_normal:   Vec3,

    pub velocity:      Vec3,
    pub speed:         f32,
    pub acceleration:  Vec3,
    pub accel_norm:    f32,
    /// Radians per second.
    pub wrist_rotation_rate: f32,

    pub finger_spread_norm: f32,
    pub clench_factor: f32,
    /// Thumb, index, middle, ring, pinky.  0 = extended, 1 = curled.
    pub finger_curl:   [f32; 5],
    pub pose:          Pose,

    pub is_tracked:    bool,
    pub time_since_update_ms: f64,

    pub screen_joints: [Vec2; LANDMARK_COUNT],
    pub screen_palm:   Vec2,
    pub depth_scale:   f32,
    pub smooth_palm_angle: f32,
}

impl Default for HandState {
    fn default() -> Self {
        HandState {
            joints:        [Vec3::ZERO; LANDMARK_COUNT],
            palm_center:   Vec3::ZERO,
            palm_normal:   DEFAULT_PALM_NORMAL,
            velocity:      Vec3::ZERO,
            speed:         0.0,
            acceleration:  Vec3::ZERO,
            accel_norm:    0.0,
            wrist_rotation_rate: 0.0,
            finger_spread_norm: 0.0,
            clench_factor: 0.0,
            finger_curl:   [0.0; 5],
            pose:          Pose::default(),
            is_tracked:    false,
            time_since_update_ms: 0.0,
            screen_joints: [Vec2::splat(0.5); LANDMARK_COUNT],
            screen_palm:   Vec2::splat(0.5),
            depth_scale:   1.0,
            smooth_palm_angle: 0.0,
        }
    }
}

impl HandState {
    pub fn thumb_tip(&self) -> Vec2 { self.screen_joints[THUMB_TIP] }
    pub fn index_tip(&self) -> Vec2 { self.screen_joints[INDEX_TIP] }

    /// Screen-space thumb-tip to index-tip distance.
    pub fn pinch_distance(&self) -> f32 {
        self.thumb_tip().distance(self.index_tip())
    }

    pub fn pinch_midpoint(&self) -> Vec2 {
        (self.thumb_tip() + self.index_tip()) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_untracked_with_up_normal() {
        let s = HandState::default();
        assert!(!s.is_tracked);
        assert_eq!(s.palm_normal, DEFAULT_PALM_NORMAL);
        assert_eq!(s.pose, Pose::Open);
    }

    #[test]
    fn pinch_geometry() {
        let mut s = HandState::default();
        s.screen_joints[THUMB_TIP] = Vec2::new(0.4, 0.5);
        s.screen_joints[INDEX_TIP] = Vec2::new(0.5, 0.5);
        assert!((s.pinch_distance() - 0.1).abs() < 1e-6);
        assert!((s.pinch_midpoint() - Vec2::new(0.45, 0.5)).length() < 1e-6);
    }
}
