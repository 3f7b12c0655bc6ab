//! HUD anchor shared by the orbit, equalizer and pointer layouts.
//!
//! The HUD is centered on the palm, rotates with the smoothed palm angle and
//! scales with pinch opening and hand depth.  It fades in through a summon
//! phase whenever tracking starts.

use glam::Vec2;
use hand_kinematics::HandState;

const MIN_RADIUS:   f32 = 0.03;
const PINCH_TO_HUD: f32 = 0.65;
const SUMMON_RATE:  f32 = 1.5; // per second

pub fn ease_out(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Horizontal squash for a window of the given width/height ratio.
pub fn x_scale_for(aspect: f32) -> f32 {
    1.0 / aspect.max(0.5)
}

// ── Summon ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Summon {
    phase: f32,
}

impl Summon {
    pub fn phase(&self) -> f32 { self.phase }
    pub fn eased(&self) -> f32 { ease_out(self.phase) }

    pub fn advance(&mut self, dt: f32) {
        self.phase = (self.phase + SUMMON_RATE * dt).min(1.0);
    }

    pub fn reset(&mut self) { self.phase = 0.0; }
}

// ── Hud ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hud {
    pub visible:  bool,
    pub center:   Vec2,
    pub radius:   f32,
    pub rotation: f32,
    pub depth:    f32,
    pub x_scale:  f32,
}

impl Default for Hud {
    fn default() -> Self {
        Hud {
            visible:  false,
            center:   Vec2::splat(0.5),
            radius:   0.0,
            rotation: 0.0,
            depth:    1.0,
            x_scale:  1.0,
        }
    }
}

impl Hud {
    pub fn from_hand(hand: &HandState, summon: &Summon, particle_scale: f32, x_scale: f32) -> Self {
        let radius = (hand.pinch_distance() * PINCH_TO_HUD).max(MIN_RADIUS)
            * hand.depth_scale
            * particle_scale
            * summon.eased();
        Hud {
            visible:  true,
            center:   hand.screen_palm,
            radius,
            rotation: hand.smooth_palm_angle,
            depth:    hand.depth_scale,
            x_scale,
        }
    }

    /// Point at `angle`, distance `r` from the center, aspect corrected.
    pub fn at(&self, angle: f32, r: f32) -> Vec2 {
        self.center + Vec2::new(angle.cos() * r * self.x_scale, angle.sin() * r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summon_eases_in_and_caps() {
        let mut s = Summon::default();
        assert_eq!(s.eased(), 0.0);
        s.advance(1.0 / 3.0);
        assert!((s.phase() - 0.5).abs() < 1e-6);
        assert!((s.eased() - 0.75).abs() < 1e-6);
        s.advance(10.0);
        assert_eq!(s.phase(), 1.0);
        assert_eq!(s.eased(), 1.0);
        s.reset();
        assert_eq!(s.phase(), 0.0);
    }

    #[test]
    fn radius_has_a_floor() {
        let mut hand = HandState::default();
        hand.is_tracked = true;
        hand.depth_scale = 2.0;
        let mut s = Summon::default();
        s.advance(1.0);
        // tips coincide → floor 0.03
        let hud = Hud::from_hand(&hand, &s, 1.0, 1.0);
        assert!((hud.radius - 0.06).abs() < 1e-6);
        assert!(hud.visible);
    }

    #[test]
    fn radius_follows_pinch() {
        let mut hand = HandState::default();
        hand.screen_joints[4] = Vec2::new(0.4, 0.5);
        hand.screen_joints[8] = Vec2::new(0.6, 0.5);
        let mut s = Summon::default();
        s.advance(1.0);
        let hud = Hud::from_hand(&hand, &s, 0.5, 1.0);
        assert!((hud.radius - 0.2 * 0.65 * 0.5).abs() < 1e-6);
    }

    #[test]
    fn aspect_squashes_x_only() {
        assert_eq!(x_scale_for(2.0), 0.5);
        assert_eq!(x_scale_for(0.25), 2.0);
        let hud = Hud { x_scale: 0.5, ..Hud::default() };
        let p = hud.at(0.0, 0.2);
        assert!((p - Vec2::new(0.6, 0.5)).length() < 1e-6);
    }
}
