//! HTTP-backed capability providers.
//!
//! Each provider posts to one inference endpoint:
//!
//! - [`HttpTranscriber`]: `audio/wav` body, `?language=<source>`, replies `{"text": ...}`
//! - [`HttpTranslator`]: `{"text","source","target"}`, replies `{"text": ...}`
//! - [`HttpSynthesizer`]: `{"text","speaker_embedding"}`, replies with a WAV body
//!
//! Requests are blocking (ureq); run them on a blocking worker.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tolk_audio::NormalizedAudio;
use tolk_audio::codec::wav;
use tracing::debug;
use ureq::Body;
use ureq::http::Response;

use crate::{
    ASRError, LanguagePair, SpeakerEmbedding, SynthesizedClip, Synthesizer, TTSError,
    Transcriber, TranslateError, Translator,
};

/// Synthesized WAV bodies larger than this are rejected.
const MAX_AUDIO_BODY: u64 = 64 * 1024 * 1024;

/// Connection settings for one inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoint {
    /// Full URL to POST to.
    pub url: String,
    /// Sent as `Authorization: Bearer <api_key>` when set.
    pub api_key: Option<String>,
    /// Whole-request timeout.
    pub timeout_secs: u64,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl Endpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Shared request plumbing for the providers.
struct Client {
    agent: ureq::Agent,
    endpoint: Endpoint,
}

impl Client {
    fn new(endpoint: Endpoint) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(endpoint.timeout_secs)))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            endpoint,
        }
    }

    fn post(&self) -> ureq::RequestBuilder<ureq::typestate::WithBody> {
        let req = self.agent.post(&self.endpoint.url);
        match &self.endpoint.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {}", key)),
            None => req,
        }
    }
}

/// JSON reply carrying text.
#[derive(Debug, Deserialize)]
struct TextResponse {
    #[serde(alias = "transcript", alias = "translation")]
    text: String,
}

/// Turns a non-2xx reply into a message with the status and a body excerpt.
fn check_status(resp: &mut Response<Body>) -> Result<(), String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.body_mut().read_to_string().unwrap_or_default();
    Err(format!("status {}: {}", status.as_u16(), excerpt(&body, 200)))
}

fn excerpt(s: &str, max_chars: usize) -> String {
    let trimmed = s.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

// ============================================================================
// Transcriber
// ============================================================================

/// Speech recognition over HTTP.
pub struct HttpTranscriber {
    client: Client,
    language: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: Endpoint, language: impl Into<String>) -> Self {
        Self {
            client: Client::new(endpoint),
            language: language.into(),
        }
    }
}

impl Transcriber for HttpTranscriber {
    fn transcribe(&self, audio: &NormalizedAudio) -> Result<String, ASRError> {
        let body = wav::encode(&audio.to_pcm()).map_err(|e| ASRError::Other(e.to_string()))?;

        let mut resp = self
            .client
            .post()
            .query("language", &self.language)
            .header("Content-Type", "audio/wav")
            .send(&body[..])
            .map_err(|e| ASRError::Http(e.to_string()))?;
        check_status(&mut resp).map_err(ASRError::TranscriptionFailed)?;

        let reply: TextResponse = resp
            .body_mut()
            .read_json()
            .map_err(|e| ASRError::InvalidResponse(e.to_string()))?;
        debug!(chars = reply.text.len(), "asr: transcribed");
        Ok(reply.text.trim().to_string())
    }
}

// ============================================================================
// Translator
// ============================================================================

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    source: &'a str,
    target: &'a str,
}

/// Machine translation over HTTP.
pub struct HttpTranslator {
    client: Client,
    languages: LanguagePair,
}

impl HttpTranslator {
    pub fn new(endpoint: Endpoint, languages: LanguagePair) -> Self {
        Self {
            client: Client::new(endpoint),
            languages,
        }
    }
}

impl Translator for HttpTranslator {
    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(String::new());
        }

        let mut resp = self
            .client
            .post()
            .send_json(&TranslateRequest {
                text,
                source: &self.languages.source,
                target: &self.languages.target,
            })
            .map_err(|e| TranslateError::Http(e.to_string()))?;
        check_status(&mut resp).map_err(TranslateError::TranslationFailed)?;

        let reply: TextResponse = resp
            .body_mut()
            .read_json()
            .map_err(|e| TranslateError::InvalidResponse(e.to_string()))?;
        debug!(pair = %self.languages, chars = reply.text.len(), "mt: translated");
        Ok(reply.text.trim().to_string())
    }
}

// ============================================================================
// Synthesizer
// ============================================================================

#[derive(Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    speaker_embedding: &'a SpeakerEmbedding,
}

/// Speech synthesis over HTTP. The reply body is a WAV file.
pub struct HttpSynthesizer {
    client: Client,
}

impl HttpSynthesizer {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            client: Client::new(endpoint),
        }
    }
}

impl Synthesizer for HttpSynthesizer {
    fn synthesize(&self, text: &str, speaker: &SpeakerEmbedding) -> Result<SynthesizedClip, TTSError> {
        let mut resp = self
            .client
            .post()
            .send_json(&SynthesizeRequest {
                text,
                speaker_embedding: speaker,
            })
            .map_err(|e| TTSError::Http(e.to_string()))?;
        check_status(&mut resp).map_err(TTSError::SynthesisFailed)?;

        let body = resp
            .body_mut()
            .with_config()
            .limit(MAX_AUDIO_BODY)
            .read_to_vec()
            .map_err(|e| TTSError::Http(e.to_string()))?;
        let pcm = wav::decode(&body).map_err(|e| TTSError::InvalidResponse(e.to_string()))?;
        let clip = SynthesizedClip::from_pcm(pcm);
        debug!(rate = clip.sample_rate, samples = clip.samples.len(), "tts: synthesized");
        Ok(clip)
    }
}
