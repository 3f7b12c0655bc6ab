//! Raw landmark samples and boundary validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of landmarks in one hand frame.
pub const LANDMARK_COUNT: usize = 21;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices
// ════════════════════════════════════════════════════════════════════════════

pub const WRIST:      usize = 0;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_TIP:  usize = 20;

/// Base joint of each digit, thumb first.
pub const FINGER_BASES: [usize; 5] = [THUMB_MCP, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];
/// Tip joint of each digit, thumb first.
pub const FINGER_TIPS:  [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// Joints averaged into the palm center.
pub const PALM_JOINTS: [usize; 5] = [WRIST, INDEX_MCP, MIDDLE_MCP, RING_MCP, PINKY_MCP];

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// One tracked landmark as delivered by the detector.
///
/// `x`, `y` are normalised image coordinates in `[0, 1]` (origin top-left);
/// `z` is depth relative to the wrist, smaller = closer to the camera.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Validation
// ════════════════════════════════════════════════════════════════════════════

/// A landmark frame that violates the input contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LandmarkError {
    #[error("expected {expected} landmarks, got {got}")]
    WrongCount { expected: usize, got: usize },

    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// Check count and finiteness; on success the slice is viewed as a
/// fixed-size frame.
pub fn validate_frame(landmarks: &[Landmark]) -> Result<&[Landmark; LANDMARK_COUNT], LandmarkError> {
    let frame: &[Landmark; LANDMARK_COUNT] = landmarks.try_into().map_err(|_| {
        LandmarkError::WrongCount { expected: LANDMARK_COUNT, got: landmarks.len() }
    })?;
    if let Some(index) = frame.iter().position(|lm| !lm.is_finite()) {
        return Err(LandmarkError::NonFinite { index });
    }
    Ok(frame)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
