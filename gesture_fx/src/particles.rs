//! Fixed-capacity pool of short-lived spark and burst particles.
//!
//! Slots are allocated once.  Spawning scans for inactive slots first-fit and
//! silently drops whatever does not fit, so a burst during a busy frame may
//! come out smaller than requested.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::palette::{hue_to_rgb, scale, Sprite};

const DRAG:            f32 = 3.0;   // per second, exponential
const GRAVITY:         f32 = 0.015; // screen units / s²
const SPARK_JITTER:    f32 = 0.005; // full width of the spawn square
const BURST_ANGLE_JIT: f32 = 0.3;   // full width, radians

// ════════════════════════════════════════════════════════════════════════════
// Spawn requests
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnPattern {
    /// Random directions, random hues.  Used for pinch sparks.
    Spark,
    /// Evenly fanned directions, hue wheel.  Used for fist bursts.
    Burst,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    pub count:       usize,
    pub origin:      Vec2,
    pub speed_scale: f32,
    pub life_scale:  f32,
    pub pattern:     SpawnPattern,
}

impl SpawnRequest {
    pub fn spark(count: usize, origin: Vec2, speed_scale: f32, life_scale: f32) -> Self {
        SpawnRequest { count, origin, speed_scale, life_scale, pattern: SpawnPattern::Spark }
    }

    pub fn burst(count: usize, origin: Vec2, speed_scale: f32, life_scale: f32) -> Self {
        SpawnRequest { count, origin, speed_scale, life_scale, pattern: SpawnPattern::Burst }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ParticlePool
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default)]
struct Particle {
    pos:      Vec2,
    vel:      Vec2,
    life:     f32,
    max_life: f32,
    hue:      f32,
    size:     f32,
    active:   bool,
}

pub struct ParticlePool {
    slots:          Vec<Particle>,
    sprites:        Vec<Sprite>,
    rng:            StdRng,
    seed:           u64,
    particle_scale: f32,
}

impl ParticlePool {
    pub fn new(capacity: usize, particle_scale: f32, seed: u64) -> Self {
        ParticlePool {
            slots:   vec![Particle::default(); capacity],
            sprites: Vec::with_capacity(capacity),
            rng:     StdRng::seed_from_u64(seed),
            seed,
            particle_scale,
        }
    }

    pub fn capacity(&self) -> usize { self.slots.len() }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|p| p.active).count()
    }

    /// Activate up to `req.count` particles.  Returns how many were spawned.
    pub fn spawn(&mut self, req: SpawnRequest) -> usize {
        let mut spawned = 0;
        for p in self.slots.iter_mut() {
            if spawned == req.count { break; }
            if p.active { continue; }

            let r = &mut self.rng;
            match req.pattern {
                SpawnPattern::Spark => {
                    let angle = r.gen::<f32>() * TAU;
                    let speed = req.speed_scale * (0.4 + 0.6 * r.gen::<f32>());
                    p.pos = req.origin + Vec2::new(
                        (r.gen::<f32>() - 0.5) * SPARK_JITTER,
                        (r.gen::<f32>() - 0.5) * SPARK_JITTER,
                    );
                    p.vel  = Vec2::from_angle(angle) * speed;
                    p.life = req.life_scale * (0.6 + 0.4 * r.gen::<f32>());
                    p.hue  = r.gen::<f32>();
                    p.size = 3.0 + 4.0 * r.gen::<f32>();
                }
                SpawnPattern::Burst => {
                    let k = spawned as f32 / req.count as f32;
                    let angle = k * TAU + (r.gen::<f32>() - 0.5) * BURST_ANGLE_JIT;
                    let speed = req.speed_scale * (0.5 + 0.5 * r.gen::<f32>());
                    p.pos  = req.origin;
                    p.vel  = Vec2::from_angle(angle) * speed;
                    p.life = req.life_scale * (0.375 + 0.625 * r.gen::<f32>());
                    p.hue  = k;
                    p.size = 4.0 + 5.0 * r.gen::<f32>();
                }
            }
            p.max_life = p.life;
            p.active = true;
            spawned += 1;
        }
        spawned
    }

    /// Integrate every active particle by `dt` seconds and refresh the
    /// sprite snapshot.
    pub fn step(&mut self, dt: f32) {
        let damp = (-DRAG * dt).exp();
        self.sprites.clear();
        for p in self.slots.iter_mut().filter(|p| p.active) {
            p.pos += p.vel * dt;
            p.vel *= damp;
            p.vel.y -= GRAVITY * dt;
            p.life -= dt;
            if p.life <= 0.0 {
                p.active = false;
                continue;
            }
            let t = p.life / p.max_life;
            self.sprites.push(Sprite {
                pos:   p.pos,
                color: scale(hue_to_rgb(p.hue), t * t),
                size:  p.size * (0.3 + 0.7 * t) * self.particle_scale,
            });
        }
    }

    /// Sprites of the particles alive after the last [`step`](Self::step).
    pub fn sprites(&self) -> &[Sprite] { &self.sprites }

    /// Free every slot and rewind the generator to its seed.
    pub fn reset(&mut self) {
        for p in self.slots.iter_mut() { p.active = false; }
        self.sprites.clear();
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
