//! Pipeline error taxonomy.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tolk_audio::codec::WavError;
use tolk_speech::{ASRError, TTSError, TranslateError};

use crate::decoder::UtteranceError;

/// A step of the utterance pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Buffer,
    Decode,
    Transcribe,
    Translate,
    Synthesize,
    Assemble,
}

impl Stage {
    /// Returns the string representation of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Buffer => "buffer",
            Stage::Decode => "decode",
            Stage::Transcribe => "transcribe",
            Stage::Translate => "translate",
            Stage::Synthesize => "synthesize",
            Stage::Assemble => "assemble",
        }
    }

    /// Progress label sent to clients while the stage runs.
    pub fn progress(&self) -> &'static str {
        match self {
            Stage::Buffer => "buffering",
            Stage::Decode => "decoding",
            Stage::Transcribe => "transcribing",
            Stage::Translate => "translating",
            Stage::Synthesize => "synthesizing",
            Stage::Assemble => "encoding",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Error type for one pipeline run. Every variant ends the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("nothing to translate: no audio received since the last request")]
    EmptyInput,
    #[error("decode failed: {0}")]
    Decode(#[from] UtteranceError),
    #[error("{0}")]
    Transcription(#[from] ASRError),
    #[error("{0}")]
    Translation(#[from] TranslateError),
    #[error("segment {index}: {source}")]
    Synthesis {
        index: usize,
        #[source]
        source: TTSError,
    },
    #[error("sample rate mismatch: segment {index} is {actual} Hz, expected {expected} Hz")]
    RateMismatch { index: usize, expected: u32, actual: u32 },
    #[error("encode failed: {0}")]
    Encode(#[from] WavError),
    #[error("{stage} timed out after {}ms", .after.as_millis())]
    Timeout { stage: Stage, after: Duration },
    #[error("{stage} worker panicked")]
    WorkerPanicked { stage: Stage },
}

impl PipelineError {
    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::EmptyInput => Stage::Buffer,
            PipelineError::Decode(_) => Stage::Decode,
            PipelineError::Transcription(_) => Stage::Transcribe,
            PipelineError::Translation(_) => Stage::Translate,
            PipelineError::Synthesis { .. } => Stage::Synthesize,
            PipelineError::RateMismatch { .. } | PipelineError::Encode(_) => Stage::Assemble,
            PipelineError::Timeout { stage, .. } | PipelineError::WorkerPanicked { stage } => *stage,
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::EmptyInput => "empty_input",
            PipelineError::Decode(_) => "decode_error",
            PipelineError::Transcription(_) => "transcription_error",
            PipelineError::Translation(_) => "translation_error",
            PipelineError::Synthesis { .. } => "synthesis_error",
            PipelineError::RateMismatch { .. } => "rate_mismatch",
            PipelineError::Encode(_) => "encode_error",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::WorkerPanicked { .. } => "worker_panicked",
        }
    }

    /// True when the client sent something unusable, as opposed to a
    /// capability or server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::EmptyInput | PipelineError::Decode(_))
    }
}

/// Structured failure notification for one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub stage: Stage,
    pub kind: &'static str,
    pub message: String,
}

impl From<&PipelineError> for Failure {
    fn from(err: &PipelineError) -> Self {
        Failure {
            stage: err.stage(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_stage_strings() {
        assert_eq!(Stage::Translate.as_str(), "translate");
        assert_eq!(Stage::Synthesize.to_string(), "synthesize");
        assert_eq!(Stage::Transcribe.progress(), "transcribing");
        assert_eq!(serde_json::to_string(&Stage::Decode).unwrap(), r#""decode""#);
    }

    #[test]
    fn test_kind_and_stage() {
        let err = PipelineError::from(TranslateError::TranslationFailed("boom".to_string()));
        assert_eq!(err.stage(), Stage::Translate);
        assert_eq!(err.kind(), "translation_error");
        assert_eq!(err.to_string(), "translation failed: boom");

        let err = PipelineError::Timeout {
            stage: Stage::Transcribe,
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.stage(), Stage::Transcribe);
        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.to_string(), "transcribe timed out after 1500ms");

        let err = PipelineError::RateMismatch { index: 2, expected: 16000, actual: 22050 };
        assert_eq!(err.stage(), Stage::Assemble);
        assert_eq!(err.kind(), "rate_mismatch");
    }

    #[test]
    fn test_failure_json() {
        let failure = Failure::from(&PipelineError::EmptyInput);
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["stage"], "buffer");
        assert_eq!(json["kind"], "empty_input");
        assert!(PipelineError::EmptyInput.is_client_error());
    }
}
