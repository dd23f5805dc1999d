//! Speech-to-speech translation relay.
//!
//! A client streams audio fragments for an utterance, signals its end, and
//! gets back the utterance spoken in the target language:
//!
//! ```text
//! fragments -> AudioFrameBuffer -> UtteranceDecoder -> Transcriber
//!           -> Translator -> TextChunker -> Synthesizer (per segment)
//!           -> AudioAssembler -> WAV
//! ```
//!
//! [`SessionPipeline`] runs the stages. [`session`] keeps per-client buffers
//! and ordering, and [`server`] puts both behind a WebSocket and a one-shot
//! HTTP endpoint.

mod assembler;
mod buffer;
mod decoder;
mod error;
mod pipeline;
mod state;

pub mod config;
pub mod event;
pub mod server;
pub mod session;

pub use assembler::AudioAssembler;
pub use buffer::{AudioFrameBuffer, Utterance};
pub use config::{ConfigError, RelayConfig};
pub use decoder::{ContainerDecoder, RawPcmDecoder, UtteranceDecoder, UtteranceError};
pub use error::{Failure, PipelineError, Stage};
pub use event::{ClientEvent, ServerEvent};
pub use pipeline::{
    Capabilities, PipelineOptions, SerializePolicy, SessionPipeline, StageTimeouts, TranslatedUtterance,
};
pub use server::{AppState, ServerError};
pub use session::{SessionHandle, SessionId, SessionOptions, SessionRegistry, spawn_session};
pub use state::PipelineState;
