//! Expanding rainbow rings.
//!
//! A handful of slots; when every slot is busy the ring closest to dying is
//! recycled for the new one.

use std::f32::consts::TAU;

use glam::Vec2;
use tracing::debug;

use crate::palette::{hue_to_rgb, scale, Segment};

pub const RIPPLE_SEGMENTS: usize = 48;
const INITIAL_RADIUS: f32 = 0.003;
const PEAK_BRIGHTNESS: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Ripple {
    pub center:   Vec2,
    pub radius:   f32,
    pub growth:   f32,
    pub life:     f32,
    pub max_life: f32,
    pub active:   bool,
}

pub struct RipplePool {
    slots:    Vec<Ripple>,
    segments: Vec<Segment>,
    x_scale:  f32,
}

impl RipplePool {
    /// `x_scale` squashes horizontal offsets so rings stay round on a
    /// non-square window.
    pub fn new(capacity: usize, x_scale: f32) -> Self {
        RipplePool {
            slots:    vec![Ripple::default(); capacity],
            segments: Vec::with_capacity(capacity * RIPPLE_SEGMENTS),
            x_scale,
        }
    }

    pub fn slots(&self) -> &[Ripple] { &self.slots }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|r| r.active).count()
    }

    /// Start a ring.  Returns the slot index it landed in, or `None` for a
    /// zero-capacity pool.
    pub fn spawn(&mut self, center: Vec2, growth: f32, life: f32) -> Option<usize> {
        let idx = match self.slots.iter().position(|r| !r.active) {
            Some(i) => i,
            None => {
                // min_by keeps the first of equal minima
                let (i, _) = self.slots.iter()
                    .enumerate()
                    .min_by(|a, b| a.1.life.total_cmp(&b.1.life))?;
                debug!(slot = i, "ripple pool full, recycling");
                i
            }
        };
        self.slots[idx] = Ripple {
            center,
            radius:   INITIAL_RADIUS,
            growth,
            life,
            max_life: life,
            active:   true,
        };
        Some(idx)
    }

    /// Grow and age every ring, then rebuild the segment snapshot.
    pub fn step(&mut self, dt: f32) {
        let xs = self.x_scale;
        self.segments.clear();
        for r in self.slots.iter_mut().filter(|r| r.active) {
            r.radius += r.growth * dt;
            r.life -= dt;
            if r.life <= 0.0 {
                r.active = false;
                continue;
            }
            let t = r.life / r.max_life;
            let bright = t * t * PEAK_BRIGHTNESS;
            let point = |s: usize| {
                let a = s as f32 / RIPPLE_SEGMENTS as f32 * TAU;
                r.center + Vec2::new(a.cos() * r.radius * xs, a.sin() * r.radius)
            };
            for s in 0..RIPPLE_SEGMENTS {
                self.segments.push(Segment {
                    a:     point(s),
                    b:     point(s + 1),
                    color: scale(hue_to_rgb(s as f32 / RIPPLE_SEGMENTS as f32), bright),
                });
            }
        }
    }

    /// Line segments of every live ring, `RIPPLE_SEGMENTS` per ring.
    pub fn segments(&self) -> &[Segment] { &self.segments }

    pub fn reset(&mut self) {
        for r in self.slots.iter_mut() { r.active = false; }
        self.segments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: Vec2 = Vec2::new(0.5, 0.5);

    #[test]
    fn fills_free_slots_first() {
        let mut pool = RipplePool::new(4, 1.0);
        for i in 0..4 {
            assert_eq!(pool.spawn(C, 0.1, 1.0), Some(i));
        }
        assert_eq!(pool.active_count(), 4);
        assert_eq!(pool.slots()[0].radius, INITIAL_RADIUS);
    }

    #[test]
    fn full_pool_recycles_shortest_life() {
        let mut pool = RipplePool::new(4, 1.0);
        pool.spawn(C, 0.1, 0.9);
        pool.spawn(C, 0.1, 0.4);
        pool.spawn(C, 0.1, 0.7);
        pool.spawn(C, 0.1, 0.6);
        assert_eq!(pool.spawn(Vec2::ZERO, 0.2, 1.0), Some(1));
        assert_eq!(pool.slots()[1].center, Vec2::ZERO);
        assert_eq!(pool.slots()[1].max_life, 1.0);
        assert_eq!(pool.active_count(), 4);
    }

    #[test]
    fn ties_recycle_the_first() {
        let mut pool = RipplePool::new(3, 1.0);
        pool.spawn(C, 0.1, 0.8);
        pool.spawn(C, 0.1, 0.5);
        pool.spawn(C, 0.1, 0.5);
        assert_eq!(pool.spawn(C, 0.1, 1.0), Some(1));
    }

    #[test]
    fn zero_capacity_drops() {
        let mut pool = RipplePool::new(0, 1.0);
        assert_eq!(pool.spawn(C, 0.1, 1.0), None);
    }

    #[test]
    fn grows_fades_and_expires() {
        let mut pool = RipplePool::new(2, 1.0);
        pool.spawn(C, 0.2, 1.0);
        pool.step(0.5);
        let r = pool.slots()[0];
        assert!((r.radius - (INITIAL_RADIUS + 0.1)).abs() < 1e-6);
        assert_eq!(pool.segments().len(), RIPPLE_SEGMENTS);
        // t = 0.5 → 0.25 · 0.5
        let peak = pool.segments()[0].color.iter().cloned().fold(0.0f32, f32::max);
        assert!((peak - 0.125).abs() < 1e-6);
        pool.step(0.6);
        assert_eq!(pool.active_count(), 0);
        assert!(pool.segments().is_empty());
    }

    #[test]
    fn ring_closes_and_respects_aspect() {
        let mut pool = RipplePool::new(1, 0.5);
        pool.spawn(C, 0.0, 1.0);
        pool.step(0.1);
        let segs = pool.segments();
        assert!((segs[0].a - segs[RIPPLE_SEGMENTS - 1].b).length() < 1e-6);
        // angle 0 is squashed horizontally, a quarter turn is not
        assert!((segs[0].a.x - (0.5 + INITIAL_RADIUS * 0.5)).abs() < 1e-6);
        let quarter = segs[RIPPLE_SEGMENTS / 4].a;
        assert!((quarter.y - (0.5 + INITIAL_RADIUS)).abs() < 1e-6);
    }
}
