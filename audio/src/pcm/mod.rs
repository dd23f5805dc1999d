//! PCM (Pulse Code Modulation) audio handling.
//!
//! # Key Types
//!
//! - [`Format`]: sample rate and channel count of an interleaved stream
//! - [`PcmBuffer`]: interleaved float samples with their format
//! - [`NormalizedAudio`]: mono 16 kHz audio ready for transcription
//!
//! # Example
//!
//! ```rust
//! use tolk_audio::pcm::{Format, PcmBuffer};
//!
//! let stereo = PcmBuffer::new(Format::STEREO_48K, vec![0.5, -0.5, 1.0, 0.0]);
//! let mono = stereo.into_mono();
//! assert_eq!(mono.samples(), &[0.0, 0.5]);
//! ```

mod buffer;
mod format;
mod normalized;

pub use buffer::{PcmBuffer, f32_to_i16};
pub use format::Format;
pub use normalized::NormalizedAudio;
