//! Speech capabilities for the tolk relay.
//!
//! This crate provides:
//! - [`Transcriber`]: speech recognition on [`NormalizedAudio`](tolk_audio::NormalizedAudio)
//! - [`Translator`]: text translation between a fixed language pair
//! - [`Synthesizer`]: speech synthesis for one text segment with a [`SpeakerEmbedding`]
//! - [`TextChunker`]: word-boundary segmentation to keep synthesis inputs bounded
//! - [`http`]: providers that reach each capability over HTTP
//!
//! Capabilities are synchronous and may block for seconds. Callers in async
//! code run them on a blocking worker.
//!
//! # Example
//!
//! ```rust,ignore
//! use tolk_speech::{TextChunker, Translator};
//!
//! let text = translator.translate("namaste duniya")?;
//! for segment in TextChunker::default().segments(&text) {
//!     let clip = synthesizer.synthesize(&segment, &speaker)?;
//! }
//! ```

mod asr;
mod segment;
mod translate;
mod tts;

pub mod http;

pub use asr::*;
pub use segment::*;
pub use translate::*;
pub use tts::*;

#[cfg(test)]
mod tests;
