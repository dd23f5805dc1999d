//! Relay configuration.
//!
//! Loaded from YAML (or JSON by extension). Every section has defaults, so a
//! file only needs the endpoints it wants to change:
//!
//! ```yaml
//! listen: ":5000"
//! languages: { source: hi, target: en }
//! transcriber: { url: http://localhost:9000/asr }
//! translator: { url: http://localhost:9001/translate }
//! synthesizer:
//!   url: http://localhost:9002/tts
//!   speaker_embedding: { file: ./speaker.json }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tolk_audio::Format;
use tolk_audio::resampler::MAX_SAMPLE_RATE;
use tolk_speech::http::{Endpoint, HttpSynthesizer, HttpTranscriber, HttpTranslator};
use tolk_speech::{LanguagePair, SpeakerEmbedding, SpeakerEmbeddingError, TextChunker};

use crate::decoder::{ContainerDecoder, RawPcmDecoder, UtteranceDecoder};
use crate::pipeline::{Capabilities, PipelineOptions, SerializePolicy, SessionPipeline, StageTimeouts};
use crate::session::SessionOptions;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field}: {message}")]
    Invalid { field: &'static str, message: String },
    #[error("speaker embedding: {0}")]
    Speaker(#[from] SpeakerEmbeddingError),
}

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listen address; `:5000` binds all interfaces.
    pub listen: String,
    /// Directory served for non-API paths.
    pub static_dir: Option<PathBuf>,
    /// Pipeline runs in flight across all sessions.
    pub max_concurrent_pipelines: usize,
    /// Triggered utterances queued per session.
    pub session_queue: usize,
    /// Byte cap per utterance; 0 disables it.
    pub max_utterance_bytes: usize,
    pub notify_progress: bool,
    pub languages: LanguagePair,
    pub chunker: ChunkerConfig,
    pub decoder: DecoderConfig,
    pub synthesis: SynthesisConfig,
    pub timeouts: TimeoutConfig,
    pub transcriber: ProviderConfig,
    pub translator: ProviderConfig,
    pub synthesizer: SynthesizerConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen: ":5000".to_string(),
            static_dir: None,
            max_concurrent_pipelines: 4,
            session_queue: 8,
            max_utterance_bytes: 32 * 1024 * 1024,
            notify_progress: true,
            languages: LanguagePair::default(),
            chunker: ChunkerConfig::default(),
            decoder: DecoderConfig::default(),
            synthesis: SynthesisConfig::default(),
            timeouts: TimeoutConfig::default(),
            transcriber: ProviderConfig::default(),
            translator: ProviderConfig::default(),
            synthesizer: SynthesizerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: tolk_speech::DEFAULT_MAX_CHARS,
        }
    }
}

/// How inbound utterance bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderFormat {
    /// Probe the container (webm, ogg, wav, ...).
    #[default]
    Auto,
    /// Headerless little-endian 16-bit PCM.
    RawPcm16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub format: DecoderFormat,
    /// Probe hint for `auto`, e.g. `webm`.
    pub hint: Option<String>,
    /// Stream layout for `raw_pcm16`.
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            format: DecoderFormat::Auto,
            hint: None,
            sample_rate: 16000,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Segments synthesized at once; 1 keeps it sequential.
    pub concurrency: usize,
    /// Rate the synthesizer produces and the output WAV uses.
    pub sample_rate: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            sample_rate: 16000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub decode_secs: u64,
    pub transcribe_secs: u64,
    pub translate_secs: u64,
    /// Per segment.
    pub synthesize_secs: u64,
    pub assemble_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let d = StageTimeouts::default();
        Self {
            decode_secs: d.decode.as_secs(),
            transcribe_secs: d.transcribe.as_secs(),
            translate_secs: d.translate.as_secs(),
            synthesize_secs: d.synthesize.as_secs(),
            assemble_secs: d.assemble.as_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn to_stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts {
            decode: Duration::from_secs(self.decode_secs),
            transcribe: Duration::from_secs(self.transcribe_secs),
            translate: Duration::from_secs(self.translate_secs),
            synthesize: Duration::from_secs(self.synthesize_secs),
            assemble: Duration::from_secs(self.assemble_secs),
        }
    }
}

/// One HTTP capability endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    /// Call the capability from one worker at a time.
    pub serialize: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            serialize: true,
        }
    }
}

impl ProviderConfig {
    /// Endpoint with `$VAR` / `${VAR}` api keys resolved from the environment.
    pub fn resolved_endpoint(&self) -> Endpoint {
        let mut endpoint = self.endpoint.clone();
        endpoint.api_key = endpoint.api_key.as_deref().and_then(expand_env);
        endpoint
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    pub speaker_embedding: SpeakerSource,
}

/// Where the fixed speaker embedding comes from. `file` wins over `values`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerSource {
    pub file: Option<PathBuf>,
    pub values: Option<Vec<f32>>,
}

impl SpeakerSource {
    pub fn load(&self) -> Result<SpeakerEmbedding, ConfigError> {
        match (&self.file, &self.values) {
            (Some(path), _) => Ok(SpeakerEmbedding::from_json_file(path)?),
            (None, Some(values)) => Ok(SpeakerEmbedding::new(values.clone())?),
            (None, None) => Err(ConfigError::Invalid {
                field: "synthesizer.speaker_embedding",
                message: "set `file` or `values`".to_string(),
            }),
        }
    }
}

/// Expands a whole-value `$VAR` or `${VAR}` reference. Unset variables
/// resolve to `None`; other strings are returned as-is.
fn expand_env(value: &str) -> Option<String> {
    let name = if let Some(inner) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        inner
    } else if let Some(inner) = value.strip_prefix('$') {
        inner
    } else {
        return Some(value.to_string());
    };
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl RelayConfig {
    /// Loads a config file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&data)?)
        } else {
            Self::from_yaml(&data)
        }
    }

    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// Checks values that would make the relay unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, message: &str) -> ConfigError {
            ConfigError::Invalid {
                field,
                message: message.to_string(),
            }
        }

        if self.chunker.max_chars == 0 {
            return Err(invalid("chunker.max_chars", "must be positive"));
        }
        if self.synthesis.concurrency == 0 {
            return Err(invalid("synthesis.concurrency", "must be positive"));
        }
        if self.synthesis.sample_rate == 0 {
            return Err(invalid("synthesis.sample_rate", "must be positive"));
        }
        if self.max_concurrent_pipelines == 0 {
            return Err(invalid("max_concurrent_pipelines", "must be positive"));
        }
        if self.session_queue == 0 {
            return Err(invalid("session_queue", "must be positive"));
        }
        if self.decoder.format == DecoderFormat::RawPcm16 {
            if !(1..=MAX_SAMPLE_RATE).contains(&self.decoder.sample_rate) {
                return Err(invalid("decoder.sample_rate", "must be between 1 and 384000"));
            }
            if self.decoder.channels == 0 {
                return Err(invalid("decoder.channels", "must be positive"));
            }
        }
        let t = &self.timeouts;
        if [t.decode_secs, t.transcribe_secs, t.translate_secs, t.synthesize_secs, t.assemble_secs].contains(&0) {
            return Err(invalid("timeouts", "every stage timeout must be positive"));
        }
        for (field, provider) in [
            ("transcriber.url", &self.transcriber),
            ("translator.url", &self.translator),
            ("synthesizer.url", &self.synthesizer.provider),
        ] {
            if provider.endpoint.url.trim().is_empty() {
                return Err(invalid(field, "endpoint url is required"));
            }
        }
        Ok(())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            chunker: TextChunker::new(self.chunker.max_chars),
            synthesis_concurrency: self.synthesis.concurrency,
            output_sample_rate: self.synthesis.sample_rate,
            max_concurrent_runs: self.max_concurrent_pipelines,
            timeouts: self.timeouts.to_stage_timeouts(),
            serialize: SerializePolicy {
                transcriber: self.transcriber.serialize,
                translator: self.translator.serialize,
                synthesizer: self.synthesizer.provider.serialize,
            },
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            max_utterance_bytes: (self.max_utterance_bytes > 0).then_some(self.max_utterance_bytes),
            queue_depth: self.session_queue,
            notify_progress: self.notify_progress,
            ..SessionOptions::default()
        }
    }

    pub fn utterance_decoder(&self) -> Arc<dyn UtteranceDecoder> {
        match self.decoder.format {
            DecoderFormat::Auto => Arc::new(ContainerDecoder::new(self.decoder.hint.clone())),
            DecoderFormat::RawPcm16 => Arc::new(RawPcmDecoder::new(Format {
                sample_rate: self.decoder.sample_rate,
                channels: self.decoder.channels,
            })),
        }
    }

    /// Builds the HTTP-backed pipeline described by this config.
    pub fn build_pipeline(&self) -> Result<SessionPipeline, ConfigError> {
        self.validate()?;
        let speaker = self.synthesizer.speaker_embedding.load()?;
        tracing::debug!(dims = speaker.dims(), "config: speaker embedding loaded");
        let capabilities = Capabilities {
            transcriber: Arc::new(HttpTranscriber::new(
                self.transcriber.resolved_endpoint(),
                self.languages.source.clone(),
            )),
            translator: Arc::new(HttpTranslator::new(
                self.translator.resolved_endpoint(),
                self.languages.clone(),
            )),
            synthesizer: Arc::new(HttpSynthesizer::new(self.synthesizer.provider.resolved_endpoint())),
        };
        Ok(SessionPipeline::new(
            self.utterance_decoder(),
            capabilities,
            speaker,
            self.pipeline_options(),
        ))
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    const FULL: &str = r#"
listen: "127.0.0.1:8080"
max_concurrent_pipelines: 2
languages: { source: hi, target: en }
chunker: { max_chars: 300 }
decoder: { format: raw_pcm16, sample_rate: 48000, channels: 2 }
synthesis: { concurrency: 3 }
timeouts: { transcribe_secs: 5 }
transcriber: { url: "http://asr/v1", serialize: false }
translator: { url: "http://mt/v1", api_key: "plain-key", timeout_secs: 10 }
synthesizer:
  url: "http://tts/v1"
  speaker_embedding: { values: [0.1, 0.2] }
"#;

    #[test]
    fn test_defaults_from_empty() {
        let cfg = RelayConfig::from_yaml("").unwrap();
        assert_eq!(cfg, RelayConfig::default());
        assert_eq!(cfg.listen, ":5000");
        assert_eq!(cfg.chunker.max_chars, 600);
        assert!(cfg.transcriber.serialize);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = RelayConfig::from_yaml(FULL).unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:8080");
        assert_eq!(cfg.session_queue, 8);
        assert_eq!(cfg.decoder.format, DecoderFormat::RawPcm16);
        assert_eq!(cfg.timeouts.transcribe_secs, 5);
        assert_eq!(cfg.timeouts.translate_secs, 60);
        assert_eq!(cfg.translator.endpoint.timeout_secs, 10);
        assert_eq!(cfg.transcriber.endpoint.timeout_secs, 60);
        assert!(!cfg.transcriber.serialize);
        assert!(cfg.translator.serialize);
        assert_eq!(cfg.synthesizer.provider.endpoint.url, "http://tts/v1");
        cfg.validate().unwrap();

        let opts = cfg.pipeline_options();
        assert_eq!(opts.chunker.max_chars_per_segment, 300);
        assert_eq!(opts.synthesis_concurrency, 3);
        assert_eq!(opts.timeouts.transcribe, Duration::from_secs(5));
        assert!(!opts.serialize.transcriber);
    }

    #[test]
    fn test_build_pipeline() {
        let cfg = RelayConfig::from_yaml(FULL).unwrap();
        let pipeline = cfg.build_pipeline().unwrap();
        assert_eq!(pipeline.options().max_concurrent_runs, 2);
    }

    #[test]
    fn test_validate_rejects() {
        let mut cfg = RelayConfig::from_yaml(FULL).unwrap();
        cfg.chunker.max_chars = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "chunker.max_chars", .. })
        ));

        let mut cfg = RelayConfig::from_yaml(FULL).unwrap();
        cfg.translator.endpoint.url.clear();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "translator.url", .. })
        ));

        let mut cfg = RelayConfig::from_yaml(FULL).unwrap();
        cfg.decoder.sample_rate = 1_000_000;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "decoder.sample_rate", .. })
        ));

        let mut cfg = RelayConfig::from_yaml(FULL).unwrap();
        cfg.timeouts.decode_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_speaker_source() {
        assert!(SpeakerSource::default().load().is_err());
        let src = SpeakerSource {
            file: None,
            values: Some(vec![0.5]),
        };
        assert_eq!(src.load().unwrap().dims(), 1);
        let src = SpeakerSource {
            file: Some(PathBuf::from("/nonexistent/speaker.json")),
            values: Some(vec![0.5]),
        };
        assert!(matches!(src.load(), Err(ConfigError::Speaker(_))));
    }

    #[test]
    fn test_expand_env() {
        assert_eq!(expand_env("literal"), Some("literal".to_string()));
        assert_eq!(expand_env("$TOLK_TEST_SURELY_UNSET_VAR"), None);
        assert_eq!(expand_env("${PATH}"), std::env::var("PATH").ok().filter(|v| !v.is_empty()));
    }

    #[test]
    fn test_session_options() {
        let mut cfg = RelayConfig::default();
        assert_eq!(cfg.session_options().max_utterance_bytes, Some(32 * 1024 * 1024));
        cfg.max_utterance_bytes = 0;
        assert_eq!(cfg.session_options().max_utterance_bytes, None);
    }

    #[test]
    fn test_load_json_by_extension() {
        let path = std::env::temp_dir().join(format!("tolk-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"listen": ":7000", "synthesis": {"concurrency": 2}}"#).unwrap();
        let cfg = RelayConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.listen, ":7000");
        assert_eq!(cfg.synthesis.concurrency, 2);

        assert!(matches!(
            RelayConfig::load("/nonexistent/tolk.yaml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
