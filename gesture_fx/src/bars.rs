//! Radial equalizer bars around the HUD.
//!
//! Every channel chases a target computed from hand speed and clench,
//! modulated by a golden-angle phase so neighbouring bars never move in
//! lockstep.  Channels attack fast and release slowly.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::hud::Hud;
use crate::palette::{hue_to_rgb, scale, Rgb};

const GOLDEN_ANGLE: f32 = 2.39996;
const PHASE_RATE:   f32 = 3.0;
const BASE_ENERGY:  f32 = 0.15;
const SPEED_GAIN:   f32 = 8.0;
const CLENCH_GAIN:  f32 = 0.3;

const INNER_RADIUS: f32 = 0.35; // × HUD radius
const MAX_LENGTH:   f32 = 0.55; // × HUD radius

/// Attack and release rates, per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerConfig {
    pub rise_rate:  f32,
    pub decay_rate: f32,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        EqualizerConfig { rise_rate: 12.0, decay_rate: 3.0 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BarChannel {
    pub current: f32,
    pub target:  f32,
}

/// One bar as a line from `inner` to `outer`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarSprite {
    pub inner: Vec2,
    pub outer: Vec2,
    pub color: Rgb,
}

pub struct BarEqualizer {
    config:   EqualizerConfig,
    channels: Vec<BarChannel>,
    sprites:  Vec<BarSprite>,
}

impl BarEqualizer {
    pub fn new(count: usize, config: EqualizerConfig) -> Self {
        BarEqualizer {
            config,
            channels: vec![BarChannel::default(); count],
            sprites:  Vec::with_capacity(count),
        }
    }

    pub fn channels(&self) -> &[BarChannel] { &self.channels }
    pub fn sprites(&self) -> &[BarSprite] { &self.sprites }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.channels.iter().map(|c| c.current)
    }

    /// Advance every channel.  `time` is seconds since start, `speed` and
    /// `clench` come from the hand snapshot.
    pub fn step(&mut self, time: f32, speed: f32, clench: f32, dt: f32) {
        let cfg = self.config;
        for (i, ch) in self.channels.iter_mut().enumerate() {
            let phase = 0.5 + 0.5 * (i as f32 * GOLDEN_ANGLE + time * PHASE_RATE).sin();
            ch.target = (BASE_ENERGY
                + speed * SPEED_GAIN * phase
                + clench * CLENCH_GAIN * (1.0 - phase))
                .clamp(0.0, 1.0);
            let diff = ch.target - ch.current;
            let rate = if diff > 0.0 { cfg.rise_rate } else { cfg.decay_rate };
            ch.current += diff * (rate * dt).clamp(0.0, 1.0);
        }
    }

    pub fn layout(&mut self, hud: &Hud) {
        let n = self.channels.len();
        let inner = hud.radius * INNER_RADIUS;
        let max_len = hud.radius * MAX_LENGTH;

        self.sprites.clear();
        for (i, ch) in self.channels.iter().enumerate() {
            let k = i as f32 / n as f32;
            let angle = hud.rotation + k * TAU;
            self.sprites.push(BarSprite {
                inner: hud.at(angle, inner),
                outer: hud.at(angle, inner + max_len * ch.current),
                color: scale(hue_to_rgb(k), 0.7 + 0.2 * ch.current),
            });
        }
    }

    pub fn reset(&mut self) {
        for ch in self.channels.iter_mut() { *ch = BarChannel::default(); }
        self.sprites.clear();
    }
}
