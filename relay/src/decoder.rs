//! Utterance decoding: container bytes to 16 kHz mono.

use tolk_audio::codec::{DecodeError, container};
use tolk_audio::resampler::{self, ResamplerError};
use tolk_audio::{Format, NormalizedAudio, PcmBuffer};

/// Error type for utterance decoding.
#[derive(Debug, thiserror::Error)]
pub enum UtteranceError {
    #[error(transparent)]
    Container(#[from] DecodeError),
    #[error("resample failed: {0}")]
    Resample(#[from] ResamplerError),
    #[error("utterance exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Turns the joined fragments of one utterance into model input.
///
/// Implementations are CPU-bound and run on a blocking worker.
pub trait UtteranceDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<NormalizedAudio, UtteranceError>;
}

/// Decodes any container symphonia can probe (webm, ogg, wav, ...).
#[derive(Debug, Clone, Default)]
pub struct ContainerDecoder {
    /// Probe hint such as `"webm"`.
    pub hint: Option<String>,
}

impl ContainerDecoder {
    pub fn new(hint: Option<String>) -> Self {
        Self { hint }
    }
}

impl UtteranceDecoder for ContainerDecoder {
    fn decode(&self, data: &[u8]) -> Result<NormalizedAudio, UtteranceError> {
        let pcm = container::decode(data, self.hint.as_deref())?;
        Ok(resampler::normalize(pcm)?)
    }
}

/// Treats the utterance as headerless little-endian 16-bit PCM.
#[derive(Debug, Clone, Copy)]
pub struct RawPcmDecoder {
    pub format: Format,
}

impl RawPcmDecoder {
    pub fn new(format: Format) -> Self {
        Self { format }
    }
}

impl UtteranceDecoder for RawPcmDecoder {
    fn decode(&self, data: &[u8]) -> Result<NormalizedAudio, UtteranceError> {
        let pcm = PcmBuffer::from_i16_le(self.format, data);
        if pcm.is_empty() {
            return Err(DecodeError::Empty.into());
        }
        Ok(resampler::normalize(pcm)?)
    }
}
