//! # gesture_fx
//!
//! A gesture-reactive effect engine: particles, expanding ripples, pointer
//! trails, a ring of spring-driven orbit bodies and a radial equalizer, all
//! steered by one tracked hand.  Hand kinematics come from the sibling
//! [`hand_kinematics`] crate.
//!
//! ## Gesture → Effect mapping
//!
//! | Gesture | Fires | Effect |
//! |---|---|---|
//! | Pinch held | every frame | 2 sparks at the thumb/index midpoint |
//! | Pinch begins | once | 25 sparks + a small ripple |
//! | Fist with high acceleration | every frame | 40-particle radial burst + ripple |
//! | Fist opens | once | 30-particle radial burst + a long ripple |
//! | Clench | continuous | charges compression, brightens the HUD ring, scatters the orbit |
//! | Palm roll | continuous | rotates the HUD, carousels the orbit |
//! | Hand speed | continuous | drives the equalizer bars |
//!
//! ## Frame model
//!
//! The host owns the clock.  Landmark frames go to [`Engine::ingest`] with
//! their capture timestamp; [`Engine::step`] runs once per rendered frame
//! with a [`FrameTime`](hand_kinematics::FrameTime) and leaves a
//! [`Snapshot`] of sprites and segments for the renderer.  Every pool is
//! sized at construction and nothing allocates per frame.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: the keyboard drives a synthetic hand.
//! * `leap`: **Hardware mode**: landmarks from a LeapMotion controller via LeapC.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Hand |
//! |---|---|
//! | Arrows | Move the palm |
//! | `Space` (hold) | Close into a fist |
//! | `P` (hold) | Pinch |
//! | `E` / `R` (hold) | Roll left / right |
//! | `H` | Hide / show the hand |
//! | `X` | Reset everything |
//! | `Q` / `Escape` | Quit |

pub mod palette;
pub mod gesture;
pub mod particles;
pub mod ripple;
pub mod trail;
pub mod hud;
pub mod orbit;
pub mod bars;
pub mod error;
pub mod engine;
pub mod source;
pub mod visualizer;
pub mod app;

pub use engine::{Engine, EngineConfig, FrameStats, Snapshot};
pub use error::{ConfigError, FxError};
pub use gesture::{GestureConfig, GestureDetector, GestureSignal};
pub use source::{LandmarkFrame, LandmarkSource, SimulatedHand, SourceEvent};
