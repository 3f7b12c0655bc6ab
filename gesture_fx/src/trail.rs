//! Orbiting pointers that leave fading dot trails.
//!
//! Pointers are evenly spaced around the HUD center, rotated toward the
//! thumb/index midpoint and pushed outward as the pinch opens.  Each pointer
//! follows its target with a low-pass filter and drops a dot roughly every
//! `MIN_DOT_DIST` of travel, interpolating when it jumps.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use glam::Vec2;

use crate::palette::{hue_to_rgb, scale, Segment, Sprite};

/// Trail dots older than this (seconds) are evicted.
pub const MAX_AGE: f64 = 2.5;
const MIN_DOT_DIST: f32 = 0.004;
const MAX_STEPS:    usize = 5;
const DOT_BRIGHTNESS: f32 = 3.0;
/// Spoke brightness at the HUD rim and at the pointer tip.
const SPOKE_HUB: f32 = 0.8;
const SPOKE_TIP: f32 = 0.15;
/// Pieces per spoke; each carries the gradient color at its midpoint.
pub const SPOKE_SEGMENTS: usize = 4;
const INITIAL_SPREAD: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailPoint {
    pub pos: Vec2,
    /// Seconds, same timeline as `TrailInput::now`.
    pub t:   f64,
}

/// Everything the trails need from one frame.
#[derive(Clone, Copy, Debug)]
pub struct TrailInput {
    pub center:     Vec2,
    pub pinch_mid:  Vec2,
    pub pinch_dist: f32,
    pub hud_radius: f32,
    pub depth:      f32,
    /// Seconds.
    pub now:        f64,
}

// ── one pointer ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Pointer {
    smooth:   Option<Vec2>,
    recorded: Option<Vec2>,
    points:   VecDeque<TrailPoint>,
}

impl Pointer {
    fn new(max_points: usize) -> Self {
        Pointer { smooth: None, recorded: None, points: VecDeque::with_capacity(max_points) }
    }

    /// Low-pass toward `target`; snaps on the first call.
    fn follow(&mut self, target: Vec2, mix: f32) -> Vec2 {
        let pos = match self.smooth {
            Some(s) => s + (target - s) * mix,
            None    => target,
        };
        self.smooth = Some(pos);
        pos
    }

    /// Drop dots along the way from the last recorded position.  Returns how
    /// many were added.
    fn record(&mut self, pos: Vec2, now: f64, max_points: usize) -> usize {
        let Some(prev) = self.recorded else {
            self.recorded = Some(pos);
            return 0;
        };
        let delta = pos - prev;
        let dist = delta.length();
        if dist < MIN_DOT_DIST { return 0; }

        let steps = ((dist / MIN_DOT_DIST) as usize).clamp(1, MAX_STEPS);
        for s in 1..=steps {
            if max_points == 0 { break; }
            if self.points.len() == max_points { self.points.pop_front(); }
            let t = s as f32 / steps as f32;
            self.points.push_back(TrailPoint { pos: prev + delta * t, t: now });
        }
        self.recorded = Some(pos);
        steps
    }

    fn expire(&mut self, now: f64, max_points: usize) {
        while self.points.front().is_some_and(|p| now - p.t > MAX_AGE) {
            self.points.pop_front();
        }
        while self.points.len() > max_points {
            self.points.pop_front();
        }
    }

    fn clear(&mut self) {
        self.smooth = None;
        self.recorded = None;
        self.points.clear();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TrailBuffer
// ════════════════════════════════════════════════════════════════════════════

pub struct TrailBuffer {
    pointers:       Vec<Pointer>,
    max_points:     usize,
    sensitivity:    f32,
    particle_scale: f32,
    x_scale:        f32,

    smooth_dir:     f32,
    smooth_spread:  f32,

    tips:           Vec<Vec2>,
    sprites:        Vec<Sprite>,
    spokes:         Vec<Segment>,
}

impl TrailBuffer {
    pub fn new(
        pointers: usize,
        max_points: usize,
        sensitivity: f32,
        particle_scale: f32,
        x_scale: f32,
    ) -> Self {
        TrailBuffer {
            pointers:      (0..pointers).map(|_| Pointer::new(max_points)).collect(),
            max_points,
            sensitivity:   sensitivity.clamp(0.0, 1.0),
            particle_scale,
            x_scale,
            smooth_dir:    0.0,
            smooth_spread: INITIAL_SPREAD,
            tips:          Vec::with_capacity(pointers),
            sprites:       Vec::with_capacity(pointers * max_points),
            spokes:        Vec::with_capacity(pointers * SPOKE_SEGMENTS),
        }
    }

    pub fn pointer_count(&self) -> usize { self.pointers.len() }

    /// Dots of pointer `p`, oldest first.
    pub fn points(&self, p: usize) -> impl Iterator<Item = &TrailPoint> {
        self.pointers.get(p).into_iter().flat_map(|ptr| ptr.points.iter())
    }

    /// Smoothed pointer positions from the last update.
    pub fn tips(&self) -> &[Vec2] { &self.tips }
    pub fn sprites(&self) -> &[Sprite] { &self.sprites }
    /// Hub-to-tip lines, `SPOKE_SEGMENTS` per pointer, fading toward the tip.
    pub fn spokes(&self) -> &[Segment] { &self.spokes }

    pub fn update(&mut self, input: &TrailInput) {
        let sens = self.sensitivity;

        // ── direction and spread filters ─────────────────────────────────
        let to_mid = input.pinch_mid - input.center;
        let raw_dir = to_mid.y.atan2(to_mid.x);
        let diff = raw_dir - self.smooth_dir;
        let wrapped = diff.sin().atan2(diff.cos());
        self.smooth_dir += wrapped * (0.01 + sens * 0.19);
        self.smooth_spread += (input.pinch_dist - self.smooth_spread) * (0.02 + sens * 0.13);

        let radius = input.hud_radius * (1.2 + 2.0 * self.smooth_spread);
        let follow_mix = 0.01 + sens * 0.17;
        let n = self.pointers.len();

        self.tips.clear();
        self.sprites.clear();
        self.spokes.clear();

        for (p, ptr) in self.pointers.iter_mut().enumerate() {
            let angle = self.smooth_dir + p as f32 / n as f32 * TAU;
            let target = input.center
                + Vec2::new(angle.cos() * radius * self.x_scale, angle.sin() * radius);
            let pos = ptr.follow(target, follow_mix);
            ptr.record(pos, input.now, self.max_points);
            ptr.expire(input.now, self.max_points);
            self.tips.push(pos);

            for dot in ptr.points.iter() {
                let life = (1.0 - (input.now - dot.t) / MAX_AGE) as f32;
                let fade = life * life;
                self.sprites.push(Sprite {
                    pos:   dot.pos,
                    color: [fade * DOT_BRIGHTNESS; 3],
                    size:  (7.0 + 3.0 * fade) * self.particle_scale * (0.6 + 0.4 * input.depth),
                });
            }

            // spoke from the HUD rim to the tip
            let dir = (pos - input.center).try_normalize().unwrap_or(Vec2::X);
            let hub = input.center
                + Vec2::new(dir.x * input.hud_radius * self.x_scale, dir.y * input.hud_radius);
            let hue = hue_to_rgb(p as f32 / n as f32);
            for k in 0..SPOKE_SEGMENTS {
                let t0 = k as f32 / SPOKE_SEGMENTS as f32;
                let t1 = (k + 1) as f32 / SPOKE_SEGMENTS as f32;
                let mid = 0.5 * (t0 + t1);
                self.spokes.push(Segment {
                    a:     hub.lerp(pos, t0),
                    b:     hub.lerp(pos, t1),
                    color: scale(hue, SPOKE_HUB + (SPOKE_TIP - SPOKE_HUB) * mid),
                });
            }
        }
    }

    pub fn reset(&mut self) {
        for ptr in self.pointers.iter_mut() { ptr.clear(); }
        self.smooth_dir = 0.0;
        self.smooth_spread = INITIAL_SPREAD;
        self.tips.clear();
        self.sprites.clear();
        self.spokes.clear();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
