//! Integration tests for speech module.

use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tolk_audio::{Format, NormalizedAudio, PcmBuffer};

// ============================================================================
// Test Error Types
// ============================================================================

#[test]
fn test_all_error_types() {
    // ASR errors
    assert_eq!(
        ASRError::TranscriptionFailed("test".to_string()).to_string(),
        "transcription failed: test"
    );
    assert_eq!(ASRError::Http("test".to_string()).to_string(), "http error: test");
    assert_eq!(
        ASRError::InvalidResponse("test".to_string()).to_string(),
        "invalid response: test"
    );
    assert_eq!(ASRError::Other("test".to_string()).to_string(), "other error: test");

    // Translation errors
    assert_eq!(
        TranslateError::TranslationFailed("test".to_string()).to_string(),
        "translation failed: test"
    );
    assert_eq!(TranslateError::Http("test".to_string()).to_string(), "http error: test");
    assert_eq!(
        TranslateError::InvalidResponse("test".to_string()).to_string(),
        "invalid response: test"
    );
    assert_eq!(TranslateError::Other("test".to_string()).to_string(), "other error: test");

    // TTS errors
    assert_eq!(
        TTSError::SynthesisFailed("test".to_string()).to_string(),
        "synthesis failed: test"
    );
    assert_eq!(TTSError::Http("test".to_string()).to_string(), "http error: test");
    assert_eq!(
        TTSError::InvalidResponse("test".to_string()).to_string(),
        "invalid response: test"
    );
    assert_eq!(TTSError::Other("test".to_string()).to_string(), "other error: test");

    // Embedding errors
    assert_eq!(SpeakerEmbeddingError::Empty.to_string(), "speaker embedding is empty");
}

// ============================================================================
// Mock Implementations
// ============================================================================

struct MockTranscriber {
    call_count: Arc<AtomicUsize>,
    text: String,
}

impl MockTranscriber {
    fn new(text: &str) -> Self {
        Self {
            call_count: Arc::new(AtomicUsize::new(0)),
            text: text.to_string(),
        }
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, audio: &NormalizedAudio) -> Result<String, ASRError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if audio.is_empty() {
            return Err(ASRError::TranscriptionFailed("no audio".to_string()));
        }
        Ok(self.text.clone())
    }
}

struct UppercaseTranslator;

impl Translator for UppercaseTranslator {
    fn translate(&self, text: &str) -> Result<String, TranslateError> {
        Ok(text.to_uppercase())
    }
}

struct MockSynthesizer {
    call_count: Arc<AtomicUsize>,
}

impl Synthesizer for MockSynthesizer {
    fn synthesize(&self, text: &str, speaker: &SpeakerEmbedding) -> Result<SynthesizedClip, TTSError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let level = speaker.values()[0];
        Ok(SynthesizedClip::new(16000, vec![level; text.chars().count()]))
    }
}

// ============================================================================
// Capability Tests
// ============================================================================

#[test]
fn test_transcriber_through_arc() {
    let mock = Arc::new(MockTranscriber::new("namaste"));
    let counter = mock.call_count.clone();
    let shared: Arc<dyn Transcriber> = mock;

    let audio = NormalizedAudio::from_mono_16k(vec![0.0; 1600]);
    assert_eq!(shared.transcribe(&audio).unwrap(), "namaste");
    assert!(shared.transcribe(&NormalizedAudio::default()).is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_translator_trait_object() {
    let translator: Arc<dyn Translator> = Arc::new(UppercaseTranslator);
    assert_eq!(translator.translate("hello").unwrap(), "HELLO");
    assert_eq!(translator.translate("").unwrap(), "");
}

#[test]
fn test_chunk_then_synthesize() {
    let synth = MockSynthesizer {
        call_count: Arc::new(AtomicUsize::new(0)),
    };
    let speaker = SpeakerEmbedding::new(vec![0.5, 0.1]).unwrap();
    let chunker = TextChunker::new(10);

    let clips: Vec<_> = chunker
        .segments("ab cd efg hijk")
        .map(|seg| synth.synthesize(&seg, &speaker).unwrap())
        .collect();

    assert_eq!(synth.call_count.load(Ordering::SeqCst), 2);
    assert_eq!(clips[0].samples.len(), 9);
    assert_eq!(clips[1].samples.len(), 4);
    assert!(clips.iter().all(|c| c.samples.iter().all(|&s| s == 0.5)));
}

// ============================================================================
// Speaker Embedding Tests
// ============================================================================

#[test]
fn test_speaker_embedding_from_json() {
    let emb = SpeakerEmbedding::from_json(b"[0.5, -0.25, 0.125]").unwrap();
    assert_eq!(emb.dims(), 3);
    assert_eq!(emb.values(), &[0.5, -0.25, 0.125]);
    assert_eq!(serde_json::to_string(&emb).unwrap(), "[0.5,-0.25,0.125]");
}

#[test]
fn test_speaker_embedding_rejects_empty() {
    assert!(matches!(SpeakerEmbedding::from_json(b"[]"), Err(SpeakerEmbeddingError::Empty)));
    assert!(matches!(SpeakerEmbedding::from_json(b"{}"), Err(SpeakerEmbeddingError::Json(_))));
}

#[test]
fn test_speaker_embedding_from_file() {
    let path = std::env::temp_dir().join(format!("tolk-speaker-{}.json", std::process::id()));
    std::fs::write(&path, "[0.1, 0.2]").unwrap();
    let emb = SpeakerEmbedding::from_json_file(&path).unwrap();
    assert_eq!(emb.dims(), 2);
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(
        SpeakerEmbedding::from_json_file(&path),
        Err(SpeakerEmbeddingError::Io(_))
    ));
}

// ============================================================================
// Clip Tests
// ============================================================================

#[test]
fn test_clip_from_stereo_pcm() {
    let pcm = PcmBuffer::new(Format::stereo(22050), vec![1.0, 0.0, 0.5, 0.5]);
    let clip = SynthesizedClip::from_pcm(pcm);
    assert_eq!(clip.sample_rate, 22050);
    assert_eq!(clip.samples, vec![0.5, 0.5]);
}

#[test]
fn test_clip_duration() {
    let clip = SynthesizedClip::new(16000, vec![0.0; 8000]);
    assert_eq!(clip.duration(), std::time::Duration::from_millis(500));
    assert_eq!(clip.format(), Format::MONO_16K);
}

#[test]
fn test_language_pair_display() {
    assert_eq!(LanguagePair::default().to_string(), "hi-en");
}
