//! Stereo panning with two channel-isolated players
//!
//! A cosine-eased oscillator sweeps the pan position; a linear law turns it
//! into per-player gains.

pub mod controller;
pub mod law;

pub use controller::{IsolatedStream, PanningController, PlaybackBackend, PlaybackHandle};
pub use law::{lerp, linear_gains, PanOscillator};
