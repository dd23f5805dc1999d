//! Opus packet decoding through libopus.
//!
//! Browsers record webm/ogg with Opus audio, which symphonia can demux but not
//! decode. Packets pulled from the container are handed to [`Decoder`].
//!
//! Only compiled with the `opus` feature; the system libopus must be present.

mod decoder;
mod ffi;

pub use decoder::*;

/// Opus always decodes at this rate for container playback.
pub const OPUS_SAMPLE_RATE: u32 = 48000;
