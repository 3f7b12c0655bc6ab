//! Damped spring bodies orbiting the HUD.
//!
//! Each body is a pair of independent harmonic oscillators (angle and radial
//! offset) pulled back toward an equilibrium fixed at construction.  Gesture
//! rates knock them around:
//!
//! * opening the hand quickly scatters them outward,
//! * clenching quickly pulls them in,
//! * rolling the palm spins them like a carousel.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::hud::Hud;
use crate::palette::{hue_to_rgb, scale, Rgb};

const MIN_DT: f32 = 0.001;
const ORBIT_RADIUS: f32 = 1.22;   // × HUD radius
const RADIAL_SPREAD: f32 = 0.015; // equilibrium offsets span ±half this
const BRIGHTNESS: f32 = 0.7;

// ════════════════════════════════════════════════════════════════════════════
// SpringConfig
// ════════════════════════════════════════════════════════════════════════════

/// Spring, damping and impulse constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringConfig {
    pub radial_stiffness:   f32,
    pub angular_stiffness:  f32,
    pub radial_damping:     f32,
    pub angular_damping:    f32,

    /// Open rate (clench units / s) above which bodies scatter.
    pub scatter_threshold:  f32,
    pub scatter_gain:       f32,
    /// Clench rate above which bodies are pulled in.
    pub pull_threshold:     f32,
    pub pull_gain:          f32,
    /// Palm roll rate (rad / s) above which the carousel spins.
    pub carousel_threshold: f32,
    pub carousel_gain:      f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        SpringConfig {
            radial_stiffness:   6.0,
            angular_stiffness:  2.0,
            radial_damping:     4.0,
            angular_damping:    3.0,
            scatter_threshold:  2.0,
            scatter_gain:       0.04,
            pull_threshold:     1.5,
            pull_gain:          0.02,
            carousel_threshold: 0.5,
            carousel_gain:      0.08,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// OrbitBody
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitBody {
    pub angle:            f32,
    pub radial_offset:    f32,
    pub angular_velocity: f32,
    pub radial_velocity:  f32,
    pub eq_angle:         f32,
    pub eq_radial_offset: f32,
    pub size_jitter:      f32,
}

/// One rotated square, ready to fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitSprite {
    /// Counter-clockwise from bottom-left.
    pub corners: [Vec2; 4],
    pub color:   Rgb,
}

// ════════════════════════════════════════════════════════════════════════════
// OrbitSimulator
// ════════════════════════════════════════════════════════════════════════════

pub struct OrbitSimulator {
    config:  SpringConfig,
    bodies:  Vec<OrbitBody>,
    /// (clench, palm angle) from the previous step; `None` until primed.
    prev:    Option<(f32, f32)>,
    sprites: Vec<OrbitSprite>,
}

impl OrbitSimulator {
    pub fn new(count: usize, config: SpringConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bodies = (0..count)
            .map(|i| {
                let eq_angle = i as f32 / count as f32 * TAU;
                let eq_radial_offset = (rng.gen::<f32>() - 0.5) * RADIAL_SPREAD;
                OrbitBody {
                    angle:            eq_angle,
                    radial_offset:    eq_radial_offset,
                    angular_velocity: 0.0,
                    radial_velocity:  0.0,
                    eq_angle,
                    eq_radial_offset,
                    size_jitter:      0.0008 + 0.001 * rng.gen::<f32>(),
                }
            })
            .collect();
        OrbitSimulator {
            config,
            bodies,
            prev:    None,
            sprites: Vec::with_capacity(count),
        }
    }

    pub fn bodies(&self) -> &[OrbitBody] { &self.bodies }
    pub fn sprites(&self) -> &[OrbitSprite] { &self.sprites }

    /// Advance every body one frame.  `clench` and `palm_angle` come from
    /// the current hand snapshot; their rates drive the impulses.
    pub fn step(&mut self, clench: f32, palm_angle: f32, dt: f32) {
        let cfg = self.config;
        let (prev_clench, prev_angle) = self.prev.unwrap_or((clench, palm_angle));
        self.prev = Some((clench, palm_angle));

        let dt = dt.max(MIN_DT);
        let clench_rate = (clench - prev_clench) / dt;
        let open_rate = -clench_rate;
        let rot_rate = (palm_angle - prev_angle) / dt;

        let scatter = if open_rate > cfg.scatter_threshold { open_rate * cfg.scatter_gain } else { 0.0 };
        let pull = if clench_rate > cfg.pull_threshold { -clench_rate * cfg.pull_gain } else { 0.0 };
        let carousel = if rot_rate.abs() > cfg.carousel_threshold { rot_rate * cfg.carousel_gain } else { 0.0 };

        let radial_damp = (-cfg.radial_damping * dt).exp();
        let angular_damp = (-cfg.angular_damping * dt).exp();

        for (i, b) in self.bodies.iter_mut().enumerate() {
            // 1. impulses
            let vary = 0.7 + 0.4 * (i as f32 * 7.3).sin();
            b.radial_velocity += scatter * vary + pull;
            b.angular_velocity += carousel * (0.5 + (i % 4) as f32 * 0.15);

            // 2. springs
            b.radial_velocity -= (b.radial_offset - b.eq_radial_offset) * cfg.radial_stiffness * dt;
            b.angular_velocity -= (b.angle - b.eq_angle) * cfg.angular_stiffness * dt;

            // 3. damping
            b.radial_velocity *= radial_damp;
            b.angular_velocity *= angular_damp;

            // 4. semi-implicit Euler
            b.radial_offset += b.radial_velocity * dt;
            b.angle += b.angular_velocity * dt;
        }
    }

    /// Rebuild the square sprites around `hud`.
    pub fn layout(&mut self, hud: &Hud, spread: f32, clench: f32, particle_scale: f32) {
        let n = self.bodies.len();
        let hand_scale = (0.6 + 0.8 * spread - 0.35 * clench).max(0.15);
        let (sin_r, cos_r) = hud.rotation.sin_cos();

        self.sprites.clear();
        for (i, b) in self.bodies.iter().enumerate() {
            let c = hud.at(b.angle, hud.radius * ORBIT_RADIUS + b.radial_offset);
            let s = b.size_jitter * hud.depth * particle_scale * hand_scale;
            let corner = |dx: f32, dy: f32| {
                c + Vec2::new((dx * cos_r - dy * sin_r) * hud.x_scale, dx * sin_r + dy * cos_r)
            };
            self.sprites.push(OrbitSprite {
                corners: [corner(-s, -s), corner(s, -s), corner(s, s), corner(-s, s)],
                color:   scale(hue_to_rgb(i as f32 / n as f32), BRIGHTNESS),
            });
        }
    }

    /// Forget the rate history and put every body back at rest.  The
    /// equilibria are kept.
    pub fn reset(&mut self) {
        self.prev = None;
        self.sprites.clear();
        for b in self.bodies.iter_mut() {
            b.angle = b.eq_angle;
            b.radial_offset = b.eq_radial_offset;
            b.angular_velocity = 0.0;
            b.radial_velocity = 0.0;
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
