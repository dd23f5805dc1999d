//! Automatic speech recognition.

use tolk_audio::NormalizedAudio;

/// Error type for ASR operations.
#[derive(Debug, thiserror::Error)]
pub enum ASRError {
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("other error: {0}")]
    Other(String),
}

/// Interface for complete (non-streaming) speech recognition.
///
/// One call per utterance; implementations do not retry.
pub trait Transcriber: Send + Sync {
    /// Transcribes 16 kHz mono audio to source-language text.
    ///
    /// Silence may legitimately produce an empty string.
    fn transcribe(&self, audio: &NormalizedAudio) -> Result<String, ASRError>;
}

impl<T: Transcriber + ?Sized> Transcriber for std::sync::Arc<T> {
    fn transcribe(&self, audio: &NormalizedAudio) -> Result<String, ASRError> {
        (**self).transcribe(audio)
    }
}
