//! Audio input decoding and per-segment clip extraction.

pub mod clip;
pub mod wav;

pub use clip::AudioClip;
pub use wav::AudioBuffer;
