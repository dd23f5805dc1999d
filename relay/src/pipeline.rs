//! Utterance pipeline: decode, transcribe, translate, chunk, synthesize, assemble.
//!
//! One [`SessionPipeline`] is shared by every session. Each run moves through
//! the stages strictly in order. Blocking work goes to tokio's blocking pool
//! under a per-stage timeout, so the tasks that receive audio never stall.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tolk_speech::{SpeakerEmbedding, SynthesizedClip, Synthesizer, TextChunker, Transcriber, Translator};
use tracing::{debug, info, warn};

use crate::assembler::AudioAssembler;
use crate::buffer::Utterance;
use crate::decoder::{UtteranceDecoder, UtteranceError};
use crate::error::{PipelineError, Stage};

/// The three model capabilities, shared process-wide.
#[derive(Clone)]
pub struct Capabilities {
    pub transcriber: Arc<dyn Transcriber>,
    pub translator: Arc<dyn Translator>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Per-stage time limits. Synthesis applies per segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub decode: Duration,
    pub transcribe: Duration,
    pub translate: Duration,
    pub synthesize: Duration,
    pub assemble: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            decode: Duration::from_secs(30),
            transcribe: Duration::from_secs(120),
            translate: Duration::from_secs(60),
            synthesize: Duration::from_secs(120),
            assemble: Duration::from_secs(30),
        }
    }
}

impl StageTimeouts {
    pub fn for_stage(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Buffer | Stage::Decode => self.decode,
            Stage::Transcribe => self.transcribe,
            Stage::Translate => self.translate,
            Stage::Synthesize => self.synthesize,
            Stage::Assemble => self.assemble,
        }
    }
}

/// Which capabilities must not be called concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializePolicy {
    pub transcriber: bool,
    pub translator: bool,
    pub synthesizer: bool,
}

impl Default for SerializePolicy {
    fn default() -> Self {
        Self {
            transcriber: true,
            translator: true,
            synthesizer: true,
        }
    }
}

/// Tuning knobs for [`SessionPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunker: TextChunker,
    /// Segments synthesized at once within one utterance.
    pub synthesis_concurrency: usize,
    /// Rate every synthesized clip must have; also the output WAV rate.
    pub output_sample_rate: u32,
    /// Pipeline runs allowed in flight across all sessions.
    pub max_concurrent_runs: usize,
    pub timeouts: StageTimeouts,
    pub serialize: SerializePolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunker: TextChunker::default(),
            synthesis_concurrency: 1,
            output_sample_rate: 16000,
            max_concurrent_runs: 4,
            timeouts: StageTimeouts::default(),
            serialize: SerializePolicy::default(),
        }
    }
}

/// Serializes calls into a capability when it is not safe to share.
struct Gate(Option<Mutex<()>>);

impl Gate {
    fn new(exclusive: bool) -> Self {
        Gate(exclusive.then(|| Mutex::new(())))
    }

    fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.0 {
            Some(lock) => {
                let _guard = lock.lock();
                f()
            }
            None => f(),
        }
    }
}

struct Gates {
    transcriber: Gate,
    translator: Gate,
    synthesizer: Gate,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct TranslatedUtterance {
    pub transcript: String,
    pub translation: String,
    pub segments: usize,
    /// Output WAV (16-bit mono).
    pub wav: Bytes,
    pub duration: Duration,
}

struct Inner {
    decoder: Arc<dyn UtteranceDecoder>,
    capabilities: Capabilities,
    gates: Gates,
    speaker: SpeakerEmbedding,
    assembler: AudioAssembler,
    pool: Semaphore,
    options: PipelineOptions,
}

/// Shared, cloneable pipeline.
#[derive(Clone)]
pub struct SessionPipeline {
    inner: Arc<Inner>,
}

impl SessionPipeline {
    pub fn new(
        decoder: Arc<dyn UtteranceDecoder>,
        capabilities: Capabilities,
        speaker: SpeakerEmbedding,
        options: PipelineOptions,
    ) -> Self {
        let gates = Gates {
            transcriber: Gate::new(options.serialize.transcriber),
            translator: Gate::new(options.serialize.translator),
            synthesizer: Gate::new(options.serialize.synthesizer),
        };
        Self {
            inner: Arc::new(Inner {
                decoder,
                capabilities,
                gates,
                speaker,
                assembler: AudioAssembler::new(options.output_sample_rate),
                pool: Semaphore::new(options.max_concurrent_runs.max(1)),
                options,
            }),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.inner.options
    }

    /// Runs one utterance through every stage.
    ///
    /// `progress` is called as each stage starts. An empty utterance returns
    /// [`PipelineError::EmptyInput`] without touching any capability.
    pub async fn run<P>(&self, utterance: Utterance, progress: P) -> Result<TranslatedUtterance, PipelineError>
    where
        P: Fn(Stage) + Send + Sync,
    {
        if let Some(limit) = utterance.overflow_limit {
            return Err(UtteranceError::TooLarge { limit }.into());
        }
        if utterance.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let _permit = self
            .inner
            .pool
            .acquire()
            .await
            .map_err(|_| PipelineError::WorkerPanicked { stage: Stage::Buffer })?;
        let started = Instant::now();

        // decode
        progress(Stage::Decode);
        let decoder = self.inner.decoder.clone();
        let data = utterance.data;
        let audio = self
            .blocking(Stage::Decode, move || Ok(decoder.decode(&data)?))
            .await?;
        debug!(samples = audio.len(), ms = audio.duration().as_millis() as u64, "pipeline: decoded");

        // transcribe
        progress(Stage::Transcribe);
        let this = self.inner.clone();
        let transcript = self
            .blocking(Stage::Transcribe, move || {
                let transcriber = &this.capabilities.transcriber;
                Ok(this.gates.transcriber.run(|| transcriber.transcribe(&audio))?)
            })
            .await?;
        debug!(transcript = %transcript, "pipeline: transcribed");

        // translate
        progress(Stage::Translate);
        let this = self.inner.clone();
        let source = transcript.clone();
        let translation = self
            .blocking(Stage::Translate, move || {
                let translator = &this.capabilities.translator;
                Ok(this.gates.translator.run(|| translator.translate(&source))?)
            })
            .await?;
        debug!(translation = %translation, "pipeline: translated");

        // chunk + synthesize
        let segments = self.inner.options.chunker.split(&translation);
        let segment_count = segments.len();
        if !segments.is_empty() {
            progress(Stage::Synthesize);
        }
        let clips = self.synthesize_all(segments).await?;

        // assemble
        progress(Stage::Assemble);
        let assembler = self.inner.assembler;
        let (wav, duration) = self
            .blocking(Stage::Assemble, move || {
                let waveform = assembler.assemble(clips)?;
                let duration = waveform.duration();
                Ok((assembler.encode(&waveform)?, duration))
            })
            .await?;

        info!(
            segments = segment_count,
            audio_ms = duration.as_millis() as u64,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline: utterance translated"
        );

        Ok(TranslatedUtterance {
            transcript,
            translation,
            segments: segment_count,
            wav,
            duration,
        })
    }

    /// Synthesizes every segment, keeping the segment index with each clip.
    async fn synthesize_all(&self, segments: Vec<String>) -> Result<Vec<(usize, SynthesizedClip)>, PipelineError> {
        let concurrency = self.inner.options.synthesis_concurrency.max(1);

        if concurrency == 1 || segments.len() <= 1 {
            let mut clips = Vec::with_capacity(segments.len());
            for (index, text) in segments.into_iter().enumerate() {
                clips.push((index, self.synthesize_one(index, text).await?));
            }
            return Ok(clips);
        }

        let limit = Arc::new(Semaphore::new(concurrency));
        let mut set = JoinSet::new();
        for (index, text) in segments.into_iter().enumerate() {
            let this = self.clone();
            let limit = limit.clone();
            set.spawn(async move {
                let _permit = limit
                    .acquire_owned()
                    .await
                    .map_err(|_| PipelineError::WorkerPanicked { stage: Stage::Synthesize })?;
                let clip = this.synthesize_one(index, text).await?;
                Ok::<_, PipelineError>((index, clip))
            });
        }

        let mut clips = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            let result = joined.unwrap_or_else(|e| {
                warn!(error = %e, "pipeline: synthesis task failed");
                Err(PipelineError::WorkerPanicked { stage: Stage::Synthesize })
            });
            match result {
                Ok(clip) => clips.push(clip),
                Err(e) => {
                    set.abort_all();
                    return Err(e);
                }
            }
        }
        Ok(clips)
    }

    async fn synthesize_one(&self, index: usize, text: String) -> Result<SynthesizedClip, PipelineError> {
        let this = self.inner.clone();
        self.blocking(Stage::Synthesize, move || {
            let synthesizer = &this.capabilities.synthesizer;
            this.gates
                .synthesizer
                .run(|| synthesizer.synthesize(&text, &this.speaker))
                .map_err(|source| PipelineError::Synthesis { index, source })
        })
        .await
    }

    /// Runs `f` on the blocking pool under the stage's time limit.
    ///
    /// A timed-out call keeps running in the background; its result is dropped.
    async fn blocking<T, F>(&self, stage: Stage, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
        T: Send + 'static,
    {
        let limit = self.inner.options.timeouts.for_stage(stage);
        let handle = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(stage = %stage, error = %e, "pipeline: worker panicked");
                Err(PipelineError::WorkerPanicked { stage })
            }
            Err(_) => {
                warn!(stage = %stage, limit_ms = limit.as_millis() as u64, "pipeline: stage timed out");
                Err(PipelineError::Timeout { stage, after: limit })
            }
        }
    }
}
