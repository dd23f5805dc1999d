//! Rubato-based resampler implementation.
//!
//! Whole-utterance sample rate conversion using rubato's FFT resampler, a
//! pure Rust implementation without any FFI dependencies.

use rubato::{FftFixedInOut, Resampler as RubatoResampler};

/// Error type for resampling operations.
#[derive(Debug, thiserror::Error)]
pub enum ResamplerError {
    #[error("rubato error: {0}")]
    Rubato(String),
    #[error("invalid sample rate: {0}")]
    InvalidRate(u32),
}

impl From<rubato::ResamplerConstructionError> for ResamplerError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        ResamplerError::Rubato(e.to_string())
    }
}

impl From<rubato::ResampleError> for ResamplerError {
    fn from(e: rubato::ResampleError) -> Self {
        ResamplerError::Rubato(e.to_string())
    }
}

/// Frames per processing block.
const CHUNK_SIZE: usize = 1024;

/// Highest rate accepted on either side. FFT sizes grow with the reduced
/// rate ratio, so header rates must be bounded before the filter is built.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Mono resampler that converts a complete signal from one rate to another.
///
/// Output is deterministic: the filter delay is trimmed and the result holds
/// exactly `ceil(len * dst_rate / src_rate)` samples.
pub struct Resampler {
    src_rate: u32,
    dst_rate: u32,
    inner: FftFixedInOut<f32>,
}

impl Resampler {
    /// Creates a resampler from `src_rate` to `dst_rate` (Hz).
    pub fn new(src_rate: u32, dst_rate: u32) -> Result<Self, ResamplerError> {
        for rate in [src_rate, dst_rate] {
            if !(1..=MAX_SAMPLE_RATE).contains(&rate) {
                return Err(ResamplerError::InvalidRate(rate));
            }
        }
        let inner = FftFixedInOut::<f32>::new(src_rate as usize, dst_rate as usize, CHUNK_SIZE, 1)?;
        Ok(Self { src_rate, dst_rate, inner })
    }

    pub fn src_rate(&self) -> u32 {
        self.src_rate
    }

    pub fn dst_rate(&self) -> u32 {
        self.dst_rate
    }

    /// Resamples the full mono signal `input`.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>, ResamplerError> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let expected = output_len(input.len(), self.src_rate, self.dst_rate);
        let delay = self.inner.output_delay();

        let mut input_buf = vec![Vec::with_capacity(self.inner.input_frames_max())];
        let mut output_buf = vec![vec![0.0f32; self.inner.output_frames_max()]];
        let mut output = Vec::with_capacity(expected + delay + self.inner.output_frames_max());

        let mut pos = 0;
        // Keep feeding (zero padded past the end) until the delayed tail is out.
        while output.len() < expected + delay {
            let frames_needed = self.inner.input_frames_next();
            let start = pos.min(input.len());
            let end = (pos + frames_needed).min(input.len());
            input_buf[0].clear();
            input_buf[0].extend_from_slice(&input[start..end]);
            input_buf[0].resize(frames_needed, 0.0);
            pos += frames_needed;

            let (_, written) = self.inner.process_into_buffer(&input_buf, &mut output_buf, None)?;
            output.extend_from_slice(&output_buf[0][..written]);
        }

        output.drain(..delay);
        output.truncate(expected);
        Ok(output)
    }
}

/// Number of output samples for `len` input samples.
pub fn output_len(len: usize, src_rate: u32, dst_rate: u32) -> usize {
    (len as u64 * dst_rate as u64).div_ceil(src_rate as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_output_len() {
        assert_eq!(output_len(4800, 48000, 16000), 1600);
        assert_eq!(output_len(4801, 48000, 16000), 1601);
        assert_eq!(output_len(441, 44100, 16000), 160);
        assert_eq!(output_len(100, 8000, 16000), 200);
    }

    #[test]
    fn test_downsample_length() {
        let mut r = Resampler::new(48000, 16000).unwrap();
        let out = r.process(&sine(48000, 440.0, 48000)).unwrap();
        assert_eq!(out.len(), 16000);
    }

    #[test]
    fn test_upsample_length() {
        let mut r = Resampler::new(8000, 16000).unwrap();
        let out = r.process(&sine(8000, 440.0, 8000)).unwrap();
        assert_eq!(out.len(), 16000);
    }

    #[test]
    fn test_odd_ratio_length() {
        let mut r = Resampler::new(44100, 16000).unwrap();
        let out = r.process(&sine(44100, 440.0, 10000)).unwrap();
        assert_eq!(out.len(), output_len(10000, 44100, 16000));
    }

    #[test]
    fn test_energy_preserved() {
        let input = sine(48000, 440.0, 48000);
        let mut r = Resampler::new(48000, 16000).unwrap();
        let out = r.process(&input).unwrap();
        // Ignore edges where the filter ramps.
        let body = &out[1000..15000];
        let ratio = rms(body) / rms(&input);
        assert!((ratio - 1.0).abs() < 0.1, "rms ratio {}", ratio);
    }

    #[test]
    fn test_empty_input() {
        let mut r = Resampler::new(48000, 16000).unwrap();
        assert!(r.process(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_rate() {
        assert!(matches!(Resampler::new(0, 16000), Err(ResamplerError::InvalidRate(0))));
        assert!(matches!(Resampler::new(16000, 0), Err(ResamplerError::InvalidRate(0))));
        assert!(matches!(
            Resampler::new(2_147_483_647, 16000),
            Err(ResamplerError::InvalidRate(2_147_483_647))
        ));
        assert!(matches!(
            Resampler::new(MAX_SAMPLE_RATE + 1, 16000),
            Err(ResamplerError::InvalidRate(_))
        ));
        assert!(Resampler::new(MAX_SAMPLE_RATE, 16000).is_ok());
    }

    #[test]
    fn test_deterministic() {
        let input = sine(22050, 300.0, 5000);
        let a = Resampler::new(22050, 16000).unwrap().process(&input).unwrap();
        let b = Resampler::new(22050, 16000).unwrap().process(&input).unwrap();
        assert_eq!(a, b);
    }
}
