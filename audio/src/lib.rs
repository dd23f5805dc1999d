//! Audio processing for the tolk relay.
//!
//! This crate turns whatever a client recorded into the audio the speech
//! models expect, and back into something a browser can play:
//!
//! - `pcm`: PCM formats, float buffers and [`NormalizedAudio`]
//! - `resampler`: mono downmix and resampling to 16 kHz (rubato)
//! - `codec`: container decoding (symphonia) and WAV encoding (hound)
//!
//! # Example
//!
//! ```rust,ignore
//! use tolk_audio::{codec::container, resampler};
//!
//! let pcm = container::decode(&webm_bytes, Some("webm"))?;
//! let audio = resampler::normalize(pcm)?;
//! assert_eq!(audio.duration().as_secs(), 3);
//! ```

pub mod codec;
pub mod pcm;
pub mod resampler;

pub use pcm::{Format, NormalizedAudio, PcmBuffer};
