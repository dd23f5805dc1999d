//! Text-to-speech synthesis.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tolk_audio::{Format, PcmBuffer};

/// Error type for TTS operations.
#[derive(Debug, thiserror::Error)]
pub enum TTSError {
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("other error: {0}")]
    Other(String),
}

/// Error type for loading a speaker embedding.
#[derive(Debug, thiserror::Error)]
pub enum SpeakerEmbeddingError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid embedding json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("speaker embedding is empty")]
    Empty,
}

/// Fixed voice conditioning vector shared by every synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerEmbedding(Arc<[f32]>);

impl SpeakerEmbedding {
    /// Wraps a non-empty vector.
    pub fn new(values: Vec<f32>) -> Result<Self, SpeakerEmbeddingError> {
        if values.is_empty() {
            return Err(SpeakerEmbeddingError::Empty);
        }
        Ok(Self(values.into()))
    }

    /// Loads a JSON array of floats, e.g. `[0.01, -0.03, ...]`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SpeakerEmbeddingError> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, SpeakerEmbeddingError> {
        let values: Vec<f32> = serde_json::from_slice(data)?;
        Self::new(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn dims(&self) -> usize {
        self.0.len()
    }
}

impl serde::Serialize for SpeakerEmbedding {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// PCM for one synthesized text segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedClip {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl SynthesizedClip {
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self { sample_rate, samples }
    }

    /// Converts decoded PCM to a clip, averaging channels if needed.
    pub fn from_pcm(pcm: PcmBuffer) -> Self {
        let mono = pcm.into_mono();
        let sample_rate = mono.format().sample_rate;
        Self::new(sample_rate, mono.into_samples())
    }

    pub fn format(&self) -> Format {
        Format::mono(self.sample_rate)
    }

    pub fn duration(&self) -> Duration {
        self.format().duration(self.samples.len())
    }
}

/// Interface for a text-to-speech synthesizer.
pub trait Synthesizer: Send + Sync {
    /// Synthesizes one text segment in the voice described by `speaker`.
    fn synthesize(&self, text: &str, speaker: &SpeakerEmbedding) -> Result<SynthesizedClip, TTSError>;
}

impl<T: Synthesizer + ?Sized> Synthesizer for Arc<T> {
    fn synthesize(&self, text: &str, speaker: &SpeakerEmbedding) -> Result<SynthesizedClip, TTSError> {
        (**self).synthesize(text, speaker)
    }
}
