//! Software-rendered preview using `minifb`.
//!
//! Everything is blended additively onto a dark background, so overlapping
//! glow brightens instead of occluding.  Screen space is `[0,1]²` with y up;
//! [`Canvas::to_pixel`] flips it into row-major pixel space.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                                                          │
//! │        trails · ripples · particles                      │
//! │                 ╭── orbit squares ──╮                    │
//! │                 │  HUD ring + bars  │                    │
//! │                 ╰───────────────────╯                    │
//! │  status line                                             │
//! │  key legend                                              │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::f32::consts::TAU;
use std::sync::mpsc::Sender;

use glam::Vec2;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::engine::Snapshot;
use crate::error::FxError;
use crate::orbit::OrbitSprite;
use crate::palette::{add_argb, scale, to_argb, Rgb, Segment, Sprite};
use crate::source::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 960;
pub const WIN_H:     usize = 600;
const STATUS_Y:      usize = WIN_H - 30;
const BG_COLOR:      u32   = 0xFF05060B;
const STATUS_BG:     u32   = 0xFF0F1424;
const TEXT_COLOR:    u32   = 0xFFDDDDDD;
const LEGEND_COLOR:  u32   = 0xFF777777;
const RING_COLOR:    Rgb   = [0.25, 0.75, 1.0];
const JOINT_COLOR:   Rgb   = [0.35, 0.35, 0.35];
const RING_SEGMENTS: usize = 64;

const KEY_LEGEND: &str =
    "arrows=move  space=fist  p=pinch  e/r=roll  h=hide  x=reset  q=quit";

/// Keys held for continuous motion, and the simulated key each one drives.
const HELD_KEYS: [(Key, SimKey); 8] = [
    (Key::Left,  SimKey::Left),
    (Key::Right, SimKey::Right),
    (Key::Up,    SimKey::Up),
    (Key::Down,  SimKey::Down),
    (Key::Space, SimKey::Clench),
    (Key::P,     SimKey::Pinch),
    (Key::E,     SimKey::RollLeft),
    (Key::R,     SimKey::RollRight),
];

// ════════════════════════════════════════════════════════════════════════════
// Canvas: windowless additive framebuffer
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    buf: Vec<u32>,
    w:   usize,
    h:   usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize) -> Self {
        Canvas { buf: vec![BG_COLOR; w * h], w, h }
    }

    pub fn pixels(&self) -> &[u32] { &self.buf }
    pub fn width(&self)  -> usize  { self.w }
    pub fn height(&self) -> usize  { self.h }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.w && y < self.h).then(|| self.buf[y * self.w + x])
    }

    pub fn clear(&mut self) { self.buf.fill(BG_COLOR); }

    /// Screen space (y up) → fractional pixel coordinates (y down).
    pub fn to_pixel(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x * self.w as f32, (1.0 - p.y) * self.h as f32)
    }

    // ── Snapshot ──────────────────────────────────────────────────────────

    pub fn draw_snapshot(&mut self, snap: &Snapshot<'_>, show_joints: bool) {
        if show_joints && snap.hand.is_tracked {
            for &j in snap.hand.screen_joints.iter() {
                self.glow(j, 2.0, JOINT_COLOR);
            }
        }

        for seg in snap.ripples { self.segment(seg); }
        for seg in snap.spokes { self.segment(seg); }
        for s in snap.trails { self.sprite(s); }

        if snap.hud.visible {
            let ring = scale(RING_COLOR, 0.4 + 0.6 * snap.compression);
            for i in 0..RING_SEGMENTS {
                let a0 = snap.hud.rotation + i as f32 / RING_SEGMENTS as f32 * TAU;
                let a1 = a0 + TAU / RING_SEGMENTS as f32;
                let p0 = self.to_pixel(snap.hud.at(a0, snap.hud.radius));
                let p1 = self.to_pixel(snap.hud.at(a1, snap.hud.radius));
                self.line(p0, p1, ring);
            }
            for bar in snap.bars {
                let (a, b) = (self.to_pixel(bar.inner), self.to_pixel(bar.outer));
                self.line(a, b, bar.color);
                self.line(a + Vec2::X, b + Vec2::X, bar.color);
            }
            for sq in snap.orbit { self.quad(sq); }
        }

        for s in snap.particles { self.sprite(s); }
    }

    // ── Primitives ────────────────────────────────────────────────────────

    fn add(&mut self, x: i32, y: i32, color: u32) {
        if x < 0 || y < 0 { return; }
        let (x, y) = (x as usize, y as usize);
        if x < self.w && y < self.h {
            let i = y * self.w + x;
            self.buf[i] = add_argb(self.buf[i], color);
        }
    }

    fn segment(&mut self, seg: &Segment) {
        let (a, b) = (self.to_pixel(seg.a), self.to_pixel(seg.b));
        self.line(a, b, seg.color);
    }

    /// DDA line in pixel space.
    pub fn line(&mut self, a: Vec2, b: Vec2, color: Rgb) {
        let argb = to_argb(color);
        let d = b - a;
        let steps = d.x.abs().max(d.y.abs()).ceil().max(1.0) as usize;
        // skip absurd spans from degenerate geometry
        if steps > 4 * (self.w + self.h) { return; }
        for i in 0..=steps {
            let p = a + d * (i as f32 / steps as f32);
            self.add(p.x.round() as i32, p.y.round() as i32, argb);
        }
    }

    fn sprite(&mut self, s: &Sprite) {
        self.glow(s.pos, s.size * 0.5, s.color);
    }

    /// Soft disk with linear falloff.  `radius` is in pixels.
    pub fn glow(&mut self, center: Vec2, radius: f32, color: Rgb) {
        let c = self.to_pixel(center);
        let r = radius.max(0.5);
        let (x0, x1) = ((c.x - r).floor() as i32, (c.x + r).ceil() as i32);
        let (y0, y1) = ((c.y - r).floor() as i32, (c.y + r).ceil() as i32);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Vec2::new(x as f32 + 0.5, y as f32 + 0.5).distance(c);
                if d > r { continue; }
                self.add(x, y, to_argb(scale(color, 1.0 - d / r)));
            }
        }
    }

    /// Filled convex quad, corners in screen space.
    fn quad(&mut self, sq: &OrbitSprite) {
        let pts = sq.corners.map(|p| self.to_pixel(p));
        let min = pts.iter().fold(Vec2::splat(f32::INFINITY), |m, p| m.min(*p));
        let max = pts.iter().fold(Vec2::splat(f32::NEG_INFINITY), |m, p| m.max(*p));
        if !(min.is_finite() && max.is_finite()) { return; }
        let argb = to_argb(sq.color);

        for y in min.y.floor() as i32..=max.y.ceil() as i32 {
            for x in min.x.floor() as i32..=max.x.ceil() as i32 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if inside_convex(&pts, p) { self.add(x, y, argb); }
            }
        }
    }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.h) {
            for col in x..(x + w).min(self.w) {
                self.buf[row * self.w + col] = color;
            }
        }
    }

    /// Minimal bitmap font, 3×5 glyphs.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch).unwrap_or(MISSING_GLYPH);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    let (px, py) = (cx + col, y + row);
                    if bits & (1 << (2 - col)) != 0 && px < self.w && py < self.h {
                        self.buf[py * self.w + px] = color;
                    }
                }
            }
            cx += 4;
            if cx + 4 > self.w { break; }
        }
    }
}

/// Point-in-convex-polygon by consistent edge sign, either winding.
fn inside_convex(pts: &[Vec2; 4], p: Vec2) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let (a, b) = (pts[i], pts[(i + 1) % 4]);
        let cross = (b - a).perp_dot(p - a);
        if cross == 0.0 { continue; }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer: the window
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
    sim_tx: Sender<SimInput>,
    held:   [bool; HELD_KEYS.len()],
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> Result<Self, FxError> {
        let mut window = Window::new(
            "gesture_fx",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| FxError::Window(e.to_string()))?;

        window.set_target_fps(60);

        Ok(Visualizer {
            window,
            canvas: Canvas::new(WIN_W, WIN_H),
            sim_tx,
            held:   [false; HELD_KEYS.len()],
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Forward key transitions to the simulated hand.  Returns false when
    /// the user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        if one_shot(Key::Q) || one_shot(Key::Escape) {
            let _ = self.sim_tx.send(SimInput::KeyDown(SimKey::Quit));
            return false;
        }
        if one_shot(Key::H) {
            let _ = self.sim_tx.send(SimInput::KeyDown(SimKey::Hide));
        }
        if one_shot(Key::X) {
            let _ = self.sim_tx.send(SimInput::KeyDown(SimKey::Reset));
        }

        for (i, &(key, sim)) in HELD_KEYS.iter().enumerate() {
            let down = self.window.is_key_down(key);
            if down != self.held[i] {
                self.held[i] = down;
                let ev = if down { SimInput::KeyDown(sim) } else { SimInput::KeyUp(sim) };
                let _ = self.sim_tx.send(ev);
            }
        }
        true
    }

    pub fn render(&mut self, snap: &Snapshot<'_>, status: &str) -> Result<(), FxError> {
        let c = &mut self.canvas;
        c.clear();
        c.draw_snapshot(snap, true);

        c.fill_rect(0, STATUS_Y, WIN_W, WIN_H - STATUS_Y, STATUS_BG);
        c.draw_label(status, 10, STATUS_Y + 6, TEXT_COLOR);
        c.draw_label(KEY_LEGEND, 10, WIN_H - 12, LEGEND_COLOR);

        self.window
            .update_with_buffer(c.pixels(), WIN_W, WIN_H)
            .map_err(|e| FxError::Window(e.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

/// Shown for characters the font does not cover.
const MISSING_GLYPH: [u8; 5] = [0b000, 0b000, 0b010, 0b000, 0b000];

/// Lowercase glyphs for the status line and key legend only.
fn char_glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c.to_ascii_lowercase() {
        '0' => [0b010, 0b101, 0b101, 0b101, 0b010],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b110, 0b001, 0b010, 0b100, 0b111],
        '3' => [0b110, 0b001, 0b010, 0b001, 0b110],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b110, 0b001, 0b110],
        '6' => [0b011, 0b100, 0b110, 0b101, 0b010],
        '7' => [0b111, 0b001, 0b010, 0b010, 0b010],
        '8' => [0b010, 0b101, 0b010, 0b101, 0b010],
        '9' => [0b010, 0b101, 0b011, 0b001, 0b110],
        'a' => [0b000, 0b011, 0b101, 0b101, 0b011],
        'c' => [0b000, 0b011, 0b100, 0b100, 0b011],
        'd' => [0b001, 0b011, 0b101, 0b101, 0b011],
        'e' => [0b000, 0b010, 0b111, 0b100, 0b011],
        'f' => [0b011, 0b100, 0b110, 0b100, 0b100],
        'h' => [0b100, 0b110, 0b101, 0b101, 0b101],
        'i' => [0b010, 0b000, 0b010, 0b010, 0b010],
        'j' => [0b001, 0b000, 0b001, 0b101, 0b010],
        'l' => [0b110, 0b010, 0b010, 0b010, 0b111],
        'm' => [0b000, 0b110, 0b111, 0b101, 0b101],
        'n' => [0b000, 0b110, 0b101, 0b101, 0b101],
        'o' => [0b000, 0b010, 0b101, 0b101, 0b010],
        'p' => [0b000, 0b110, 0b101, 0b110, 0b100],
        'q' => [0b000, 0b011, 0b101, 0b011, 0b001],
        'r' => [0b000, 0b101, 0b110, 0b100, 0b100],
        's' => [0b000, 0b011, 0b110, 0b011, 0b110],
        't' => [0b010, 0b111, 0b010, 0b010, 0b001],
        'u' => [0b000, 0b101, 0b101, 0b101, 0b011],
        'v' => [0b000, 0b101, 0b101, 0b101, 0b010],
        'w' => [0b000, 0b101, 0b101, 0b111, 0b111],
        'x' => [0b000, 0b101, 0b010, 0b010, 0b101],
        'y' => [0b000, 0b101, 0b011, 0b001, 0b110],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0b000; 5],
        _   => return None,
    };
    Some(rows)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
