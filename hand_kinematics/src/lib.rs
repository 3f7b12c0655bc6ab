//! # hand_kinematics
//!
//! Turns a noisy stream of 21 tracked hand landmarks into a smoothed
//! kinematic description of the hand: palm position, velocity,
//! acceleration, wrist rotation rate, finger curl / spread / clench metrics
//! and a discrete pose classification.
//!
//! The landmark layout is the usual 21-point hand model: wrist at 0, then
//! four joints per digit (thumb 1–4, index 5–8, middle 9–12, ring 13–16,
//! pinky 17–20), tips last.
//!
//! ## Quick start
//!
//! ```rust
//! use hand_kinematics::{KinematicEstimator, EstimatorConfig, Landmark, LANDMARK_COUNT};
//!
//! let mut est = KinematicEstimator::new(EstimatorConfig::default());
//! let frame = [Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
//! let state = est.update(&frame, 0.0).unwrap();
//! assert!(state.is_tracked);
//! ```
//!
//! Time is always injected: [`KinematicEstimator::update`] takes an explicit
//! timestamp and [`KinematicEstimator::tick`] the current time on the same
//! timeline, so a recorded session replays identically.  [`clock`] supplies the host-side
//! time sources.

pub mod clock;
pub mod estimator;
pub mod landmark;
pub mod state;

pub use clock::{Clock, FrameTime, FrameTimer, ManualClock, SystemClock};
pub use estimator::{EstimatorConfig, KinematicEstimator};
pub use landmark::{validate_frame, Landmark, LandmarkError, LANDMARK_COUNT};
pub use state::{HandState, Pose, DEFAULT_PALM_NORMAL};
