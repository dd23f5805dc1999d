//! Speech-model input audio.

use std::time::Duration;

use super::{Format, PcmBuffer};

/// Mono PCM at 16 kHz, the only input the transcription stage accepts.
///
/// The format is fixed by construction: values can only be built from
/// samples already at that rate or through [`crate::resampler::normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedAudio {
    samples: Vec<f32>,
}

impl NormalizedAudio {
    pub const SAMPLE_RATE: u32 = 16000;
    pub const FORMAT: Format = Format::MONO_16K;

    /// Wraps samples that are already mono at 16 kHz.
    pub fn from_mono_16k(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Self::FORMAT.duration(self.samples.len())
    }

    /// Returns a copy as a generic PCM buffer.
    pub fn to_pcm(&self) -> PcmBuffer {
        PcmBuffer::new(Self::FORMAT, self.samples.clone())
    }
}
