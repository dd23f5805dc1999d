//! Wire events exchanged with clients over the WebSocket.
//!
//! Inbound binary frames are audio fragments. Inbound text frames and every
//! outbound notice are JSON objects tagged by `type`. A successful utterance
//! is a `translated_audio` notice followed by one binary frame with the WAV.

use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Failure, PipelineError, Stage};
use crate::pipeline::TranslatedUtterance;

/// Text-frame events sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A base64 fragment, for clients that cannot send binary frames.
    AudioChunk { data: String },
    /// End of the current utterance.
    EndAudio,
}

impl ClientEvent {
    /// Parses a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Json(e.to_string()))
    }
}

/// Decodes the payload of an `audio_chunk` text event.
pub fn decode_chunk(data: &str) -> Result<Vec<u8>, ProtocolError> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| ProtocolError::Base64(e.to_string()))
}

/// Error type for malformed client frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid event: {0}")]
    Json(String),
    #[error("invalid base64 audio chunk: {0}")]
    Base64(String),
}

/// Events sent to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First event on every connection.
    Session { session_id: String },
    /// Informational progress for a running utterance.
    Status { utterance_id: u64, status: &'static str },
    /// Success. The WAV goes out as the following binary frame.
    TranslatedAudio {
        utterance_id: u64,
        bytes: usize,
        duration_ms: u64,
        transcript: String,
        translation: String,
        #[serde(skip)]
        wav: Bytes,
    },
    /// Failure of one utterance, or a protocol error when `utterance_id` is absent.
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        utterance_id: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
        kind: &'static str,
        message: String,
    },
}

impl ServerEvent {
    pub fn status(utterance_id: u64, stage: Stage) -> Self {
        ServerEvent::Status {
            utterance_id,
            status: stage.progress(),
        }
    }

    pub fn translated(utterance_id: u64, result: TranslatedUtterance) -> Self {
        ServerEvent::TranslatedAudio {
            utterance_id,
            bytes: result.wav.len(),
            duration_ms: result.duration.as_millis() as u64,
            transcript: result.transcript,
            translation: result.translation,
            wav: result.wav,
        }
    }

    pub fn failed(utterance_id: u64, err: &PipelineError) -> Self {
        let failure = Failure::from(err);
        ServerEvent::Error {
            utterance_id: Some(utterance_id),
            stage: Some(failure.stage),
            kind: failure.kind,
            message: failure.message,
        }
    }

    pub fn protocol_error(err: &ProtocolError) -> Self {
        ServerEvent::Error {
            utterance_id: None,
            stage: None,
            kind: "protocol_error",
            message: err.to_string(),
        }
    }

    /// True for the events that close out an utterance.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServerEvent::TranslatedAudio { .. } | ServerEvent::Error { utterance_id: Some(_), .. }
        )
    }

    /// JSON text of the event.
    pub fn to_json(&self) -> String {
        // Every field is a plain string or number.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","kind":"internal","message":"{}"}}"#, e)
        })
    }

    /// Binary payload that follows the JSON notice, if any.
    pub fn audio(&self) -> Option<&Bytes> {
        match self {
            ServerEvent::TranslatedAudio { wav, .. } => Some(wav),
            _ => None,
        }
    }
}

#[cfg(test)]
mod event_tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_client_events() {
        assert_eq!(ClientEvent::parse(r#"{"type":"end_audio"}"#).unwrap(), ClientEvent::EndAudio);
        assert_eq!(
            ClientEvent::parse(r#"{"type":"audio_chunk","data":"AAE="}"#).unwrap(),
            ClientEvent::AudioChunk { data: "AAE=".to_string() }
        );
        assert!(ClientEvent::parse(r#"{"type":"dance"}"#).is_err());
        assert!(ClientEvent::parse("not json").is_err());
    }

    #[test]
    fn test_decode_chunk() {
        assert_eq!(decode_chunk("AAE=").unwrap(), vec![0, 1]);
        assert!(matches!(decode_chunk("%%%"), Err(ProtocolError::Base64(_))));
    }

    #[test]
    fn test_translated_event_json() {
        let event = ServerEvent::translated(
            3,
            TranslatedUtterance {
                transcript: "namaste".to_string(),
                translation: "hello".to_string(),
                segments: 1,
                wav: Bytes::from_static(b"RIFF...."),
                duration: Duration::from_millis(250),
            },
        );
        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["type"], "translated_audio");
        assert_eq!(json["utterance_id"], 3);
        assert_eq!(json["bytes"], 8);
        assert_eq!(json["duration_ms"], 250);
        assert_eq!(json["translation"], "hello");
        assert!(json.get("wav").is_none());
        assert_eq!(event.audio().map(|b| b.len()), Some(8));
        assert!(event.is_terminal());
    }

    #[test]
    fn test_failure_event_json() {
        let event = ServerEvent::failed(7, &PipelineError::EmptyInput);
        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["utterance_id"], 7);
        assert_eq!(json["stage"], "buffer");
        assert_eq!(json["kind"], "empty_input");
        assert!(event.is_terminal());
        assert!(event.audio().is_none());
    }

    #[test]
    fn test_protocol_error_has_no_utterance() {
        let err = ClientEvent::parse("{").unwrap_err();
        let event = ServerEvent::protocol_error(&err);
        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["kind"], "protocol_error");
        assert!(json.get("utterance_id").is_none());
        assert!(json.get("stage").is_none());
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_status_event() {
        let event = ServerEvent::status(1, Stage::Translate);
        assert_eq!(event.to_json(), r#"{"type":"status","utterance_id":1,"status":"translating"}"#);
        assert!(!event.is_terminal());
    }
}
