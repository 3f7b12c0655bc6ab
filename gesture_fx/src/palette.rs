//! Color helpers and the snapshot records shared by every effect.
//!
//! Effects publish linear RGB triples (`[f32; 3]`, may exceed 1.0 for
//! additive glow); the visualizer packs them to ARGB at the very end.

use glam::Vec2;

/// Linear RGB, additive-blend friendly.
pub type Rgb = [f32; 3];

/// One round point: screen position, color, size in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    pub pos:   Vec2,
    pub color: Rgb,
    pub size:  f32,
}

/// One colored line segment in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a:     Vec2,
    pub b:     Vec2,
    pub color: Rgb,
}

/// Fully saturated color for a hue in `[0, 1)` (wraps outside).
pub fn hue_to_rgb(h: f32) -> Rgb {
    let h  = h.rem_euclid(1.0) * 6.0;
    let hi = h as u32;
    let f  = h - hi as f32;
    let q  = 1.0 - f;
    match hi {
        0 => [1.0, f,   0.0],
        1 => [q,   1.0, 0.0],
        2 => [0.0, 1.0, f  ],
        3 => [0.0, q,   1.0],
        4 => [f,   0.0, 1.0],
        _ => [1.0, 0.0, q  ],
    }
}

pub fn scale(c: Rgb, k: f32) -> Rgb {
    [c[0] * k, c[1] * k, c[2] * k]
}

/// Pack to opaque `0xAARRGGBB`, clamping each channel.
pub fn to_argb(c: Rgb) -> u32 {
    let ch = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u32;
    0xFF000000 | (ch(c[0]) << 16) | (ch(c[1]) << 8) | ch(c[2])
}

/// Saturating per-channel add of two packed colors.
pub fn add_argb(a: u32, b: u32) -> u32 {
    let sum = |shift: u32| (((a >> shift) & 0xFF) + ((b >> shift) & 0xFF)).min(0xFF) << shift;
    0xFF000000 | sum(16) | sum(8) | sum(0)
}
