//! Landmark sources: LeapMotion hardware and a keyboard-driven simulated hand.
//!
//! The public interface is [`SourceEvent`] delivered over a `mpsc` channel.
//! The render loop doesn't need to know whether frames came from real
//! hardware or the simulator.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use glam::Vec2;
use hand_kinematics::{Clock, Landmark, SystemClock, LANDMARK_COUNT};
use tracing::{debug, info};

// ════════════════════════════════════════════════════════════════════════════
// SourceEvent
// ════════════════════════════════════════════════════════════════════════════

/// One timestamped hand sample.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkFrame {
    pub landmarks: [Landmark; LANDMARK_COUNT],
    /// Milliseconds on the shared [`SystemClock`] timeline.
    pub time_ms:   f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    Frame(LandmarkFrame),
    /// Clear every effect and forget the hand.
    Reset,
    /// The source gave up; the message says why.
    Failed(String),
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait: unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`SourceEvent`]s over a channel.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S) -> Receiver<SourceEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// SimulatedHand: synthetic 21-landmark generator
// ════════════════════════════════════════════════════════════════════════════

/// Finger directions from the palm (radians, 0 = up, positive = image right).
const FINGER_ANGLES: [f32; 4] = [-0.45, 0.0, 0.45, 0.9];
/// Per-joint extension step of each finger chain.
const FINGER_SEGMENTS: [f32; 4] = [0.035, 0.04, 0.042, 0.038];
/// Thumb root, relative to the palm point.
const THUMB_ROOT: Vec2 = Vec2::new(-0.04, 0.025);
const THUMB_BASE_LEN: f32 = 0.02;
const THUMB_REACH: f32 = 0.07;
const WRIST_DROP: f32 = 0.04;

/// Parametric hand in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulatedHand {
    /// Palm point, image coordinates.
    pub palm:     Vec2,
    /// 0 = fist, 1 = fully open.
    pub openness: f32,
    /// 0 = apart, 1 = thumb tip on index tip.
    pub pinch:    f32,
    /// Image-plane roll about the palm point, radians.
    pub roll:     f32,
}

impl Default for SimulatedHand {
    fn default() -> Self {
        SimulatedHand { palm: Vec2::splat(0.5), openness: 1.0, pinch: 0.0, roll: 0.0 }
    }
}

impl SimulatedHand {
    pub fn landmarks(&self) -> [Landmark; LANDMARK_COUNT] {
        let dir = |a: f32| Vec2::new(a.sin(), -a.cos());
        let o = self.openness.clamp(0.0, 1.0);
        let reach = 0.15 + 0.85 * o;
        let mut pts = [Vec2::ZERO; LANDMARK_COUNT];

        pts[0] = Vec2::new(0.0, WRIST_DROP);

        // thumb: fixed root and base, distal joints retract as the hand closes
        let thumb_dir = dir(-0.9 + 0.2 * o);
        let base = THUMB_ROOT + thumb_dir * THUMB_BASE_LEN;
        pts[1] = THUMB_ROOT;
        pts[2] = base;
        pts[3] = base + thumb_dir * THUMB_REACH * reach * 0.5;
        pts[4] = base + thumb_dir * THUMB_REACH * reach;

        for (f, &angle) in FINGER_ANGLES.iter().enumerate() {
            for (j, &seg) in FINGER_SEGMENTS.iter().enumerate() {
                pts[5 + f * 4 + j] = dir(angle) * (j + 1) as f32 * seg * reach;
            }
        }

        let pinch = self.pinch.clamp(0.0, 1.0);
        pts[4] = pts[4].lerp(pts[8], pinch);

        let rot = Vec2::from_angle(self.roll);
        let mut out = [Landmark::default(); LANDMARK_COUNT];
        for (lm, p) in out.iter_mut().zip(pts.iter()) {
            let q = self.palm + rot.rotate(*p);
            *lm = Landmark::new(q.x, q.y, 0.0);
        }
        out
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    KeyDown(SimKey),
    KeyUp(SimKey),
}

/// Simulated key codes (mapped from minifb Key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    Left,       // ←
    Right,      // →
    Up,         // ↑
    Down,       // ↓
    Clench,     // Space
    Pinch,      // P
    RollLeft,   // E
    RollRight,  // R
    Hide,       // H
    Reset,      // X
    Quit,       // Q / Escape
}

/// Held-key state plus the animated hand it drives.
#[derive(Clone, Debug, Default)]
pub struct SimController {
    pub hand:   SimulatedHand,
    held:       [bool; 8],
    pub hidden: bool,
}

const MOVE_SPEED:  f32 = 0.5; // image units / s
const ROLL_SPEED:  f32 = 1.5; // rad / s
const SHAPE_RATE:  f32 = 8.0; // per second, openness and pinch follow
const PALM_MARGIN: f32 = 0.15;

impl SimController {
    fn slot(key: SimKey) -> Option<usize> {
        match key {
            SimKey::Left      => Some(0),
            SimKey::Right     => Some(1),
            SimKey::Up        => Some(2),
            SimKey::Down      => Some(3),
            SimKey::Clench    => Some(4),
            SimKey::Pinch     => Some(5),
            SimKey::RollLeft  => Some(6),
            SimKey::RollRight => Some(7),
            _ => None,
        }
    }

    fn held(&self, key: SimKey) -> bool {
        Self::slot(key).is_some_and(|i| self.held[i])
    }

    pub fn press(&mut self, key: SimKey) {
        if key == SimKey::Hide { self.hidden = !self.hidden; }
        if let Some(i) = Self::slot(key) { self.held[i] = true; }
    }

    pub fn release(&mut self, key: SimKey) {
        if let Some(i) = Self::slot(key) { self.held[i] = false; }
    }

    /// Animate the hand toward the held keys by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        let axis = |neg: SimKey, pos: SimKey| {
            (self.held(pos) as i32 - self.held(neg) as i32) as f32
        };
        // image x is mirrored on screen
        let mv = Vec2::new(axis(SimKey::Right, SimKey::Left), axis(SimKey::Up, SimKey::Down));
        let spin = axis(SimKey::RollLeft, SimKey::RollRight);
        let open_target = if self.held(SimKey::Clench) { 0.0 } else { 1.0 };
        let pinch_target = if self.held(SimKey::Pinch) { 1.0 } else { 0.0 };

        let h = &mut self.hand;
        h.palm = (h.palm + mv * MOVE_SPEED * dt).clamp(Vec2::splat(PALM_MARGIN), Vec2::splat(1.0 - PALM_MARGIN));
        h.roll += spin * ROLL_SPEED * dt;

        let k = (SHAPE_RATE * dt).min(1.0);
        h.openness += (open_target - h.openness) * k;
        h.pinch += (pinch_target - h.pinch) * k;
    }
}

/// Landmark source driven by [`SimInput`] events (from the visualizer's
/// window).  Emits a frame every `interval` while the hand is visible.
pub struct SimHandSource {
    pub rx:       Receiver<SimInput>,
    pub clock:    SystemClock,
    pub interval: Duration,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>, clock: SystemClock) -> Self {
        SimHandSource { rx, clock, interval: Duration::from_millis(16) }
    }
}

impl LandmarkSource for SimHandSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        let mut ctl = SimController::default();
        let mut last_ms = self.clock.now_ms();
        info!("simulated hand ready");

        loop {
            match self.rx.recv_timeout(self.interval) {
                Ok(SimInput::KeyDown(SimKey::Quit)) => {
                    let _ = tx.send(SourceEvent::Quit);
                    return;
                }
                Ok(SimInput::KeyDown(SimKey::Reset)) => {
                    ctl = SimController::default();
                    if tx.send(SourceEvent::Reset).is_err() { return; }
                }
                Ok(SimInput::KeyDown(key)) => {
                    ctl.press(key);
                    if key == SimKey::Hide {
                        debug!(hidden = ctl.hidden, "simulated hand visibility");
                    }
                }
                Ok(SimInput::KeyUp(key)) => ctl.release(key),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }

            let now = self.clock.now_ms();
            if now - last_ms < self.interval.as_secs_f64() * 1000.0 { continue; }
            ctl.advance(((now - last_ms) / 1000.0) as f32);
            last_ms = now;

            if ctl.hidden { continue; }
            let frame = LandmarkFrame { landmarks: ctl.hand.landmarks(), time_ms: now };
            if tx.send(SourceEvent::Frame(frame)).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Landmark source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// Leap millimetres are mapped onto a virtual 400 mm image looking down at
/// the hand, so the estimator sees the same layout a camera would give.
#[cfg(feature = "leap")]
pub struct LeapLandmarkSource {
    pub clock: SystemClock,
}

#[cfg(feature = "leap")]
impl LandmarkSource for LeapLandmarkSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        use leaprs::*;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                let _ = tx.send(SourceEvent::Failed(format!("LeapC connection: {e:?}")));
                return;
            }
        };
        if let Err(e) = connection.open() {
            let _ = tx.send(SourceEvent::Failed(format!("LeapMotion device: {e:?}")));
            return;
        }
        info!("LeapMotion connected");

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<_> = frame.hands().collect();
                // first hand wins; the engine tracks one
                let Some(hand) = hands.first() else { continue };
                let landmarks = leap_landmarks(hand);
                let frame = LandmarkFrame { landmarks, time_ms: self.clock.now_ms() };
                if tx.send(SourceEvent::Frame(frame)).is_err() { return; }
            }
        }
    }
}

/// Map one Leap hand onto the 21-point layout.  The wrist is taken as the
/// mean of the four finger metacarpal roots.
#[cfg(feature = "leap")]
fn leap_landmarks(hand: &leaprs::Hand) -> [Landmark; LANDMARK_COUNT] {
    const SPAN_MM: f32 = 400.0;
    const FLOOR_MM: f32 = 50.0;

    let to_image = |x: f32, y: f32, z: f32| {
        Landmark::new(0.5 - x / SPAN_MM, (y - FLOOR_MM) / SPAN_MM, -z / SPAN_MM)
    };

    let mut out = [Landmark::default(); LANDMARK_COUNT];
    let digits: Vec<_> = hand.digits().collect();
    let mut wrist = Landmark::default();
    for (d, digit) in digits.iter().enumerate().take(5) {
        let joints = [
            digit.proximal().prev_joint(),
            digit.intermediate().prev_joint(),
            digit.distal().prev_joint(),
            digit.distal().next_joint(),
        ];
        for (j, v) in joints.into_iter().enumerate() {
            out[1 + d * 4 + j] = to_image(v.x, v.y, v.z);
        }
        if d > 0 {
            let r = digit.metacarpal().prev_joint();
            let root = to_image(r.x, r.y, r.z);
            wrist.x += root.x / 4.0;
            wrist.y += root.y / 4.0;
            wrist.z += root.z / 4.0;
        }
    }
    out[0] = wrist;
    out
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
