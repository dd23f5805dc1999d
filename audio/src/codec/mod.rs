//! Audio codec implementations.
//!
//! - `container`: compressed container decoding (symphonia)
//! - `wav`: WAV encoding/decoding (hound)
//! - `opus`: Opus packet decoding via libopus (feature `opus`)

pub mod container;
pub mod wav;

#[cfg(feature = "opus")]
pub mod opus;

pub use container::DecodeError;
pub use wav::WavError;
