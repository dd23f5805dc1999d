//! Output assembly: ordered clips to one WAV payload.

use bytes::Bytes;
use tolk_audio::codec::wav;
use tolk_audio::{Format, PcmBuffer};
use tolk_speech::SynthesizedClip;

use crate::error::PipelineError;

/// Joins synthesized clips in segment order and encodes the result.
#[derive(Debug, Clone, Copy)]
pub struct AudioAssembler {
    sample_rate: u32,
}

impl Default for AudioAssembler {
    fn default() -> Self {
        Self::new(16000)
    }
}

impl AudioAssembler {
    /// Creates an assembler that expects every clip at `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Concatenates `(segment index, clip)` pairs in index order, whatever
    /// order they arrive in.
    pub fn assemble(&self, mut clips: Vec<(usize, SynthesizedClip)>) -> Result<PcmBuffer, PipelineError> {
        clips.sort_by_key(|(index, _)| *index);

        for (index, clip) in &clips {
            if clip.sample_rate != self.sample_rate {
                return Err(PipelineError::RateMismatch {
                    index: *index,
                    expected: self.sample_rate,
                    actual: clip.sample_rate,
                });
            }
        }

        let total = clips.iter().map(|(_, c)| c.samples.len()).sum();
        let mut samples = Vec::with_capacity(total);
        for (_, clip) in clips {
            samples.extend(clip.samples);
        }
        Ok(PcmBuffer::new(Format::mono(self.sample_rate), samples))
    }

    /// Encodes a waveform as 16-bit mono WAV.
    pub fn encode(&self, waveform: &PcmBuffer) -> Result<Bytes, PipelineError> {
        Ok(Bytes::from(wav::encode(waveform)?))
    }
}
