//! Audio resampling using rubato.
//!
//! # Example
//!
//! ```rust
//! use tolk_audio::pcm::{Format, PcmBuffer};
//! use tolk_audio::resampler::normalize;
//!
//! let pcm = PcmBuffer::new(Format::STEREO_48K, vec![0.0; 9600]);
//! let audio = normalize(pcm).unwrap();
//! assert_eq!(audio.len(), 1600);
//! ```

mod rubato_impl;

pub use rubato_impl::*;

use crate::pcm::{NormalizedAudio, PcmBuffer};

/// Collapses `pcm` to mono and resamples it to 16 kHz.
///
/// Input already at 16 kHz is passed through without filtering.
pub fn normalize(pcm: PcmBuffer) -> Result<NormalizedAudio, ResamplerError> {
    let mono = pcm.into_mono();
    let rate = mono.format().sample_rate;
    if rate == NormalizedAudio::SAMPLE_RATE {
        return Ok(NormalizedAudio::from_mono_16k(mono.into_samples()));
    }
    let mut resampler = Resampler::new(rate, NormalizedAudio::SAMPLE_RATE)?;
    let samples = resampler.process(mono.samples())?;
    tracing::debug!(from = rate, frames = samples.len(), "resampler: normalized to 16kHz mono");
    Ok(NormalizedAudio::from_mono_16k(samples))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcm::Format;

    #[test]
    fn test_normalize_passthrough() {
        let pcm = PcmBuffer::new(Format::MONO_16K, vec![0.1, 0.2, 0.3]);
        let audio = normalize(pcm).unwrap();
        assert_eq!(audio.samples(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_normalize_stereo_16k_averages() {
        let pcm = PcmBuffer::new(Format::stereo(16000), vec![0.2, 0.4, -1.0, 1.0]);
        let audio = normalize(pcm).unwrap();
        assert_eq!(audio.len(), 2);
        assert!((audio.samples()[0] - 0.3).abs() < 1e-6);
        assert_eq!(audio.samples()[1], 0.0);
    }

    #[test]
    fn test_normalize_resamples() {
        let pcm = PcmBuffer::new(Format::MONO_48K, vec![0.0; 4800]);
        let audio = normalize(pcm).unwrap();
        assert_eq!(audio.len(), 1600);
    }

    #[test]
    fn test_normalize_rejects_zero_rate() {
        let pcm = PcmBuffer::new(Format::mono(0), vec![0.0; 10]);
        assert!(normalize(pcm).is_err());
    }

    #[test]
    fn test_normalize_rejects_header_rate_out_of_range() {
        let pcm = PcmBuffer::new(Format::mono(u32::MAX), vec![0.0; 64]);
        assert!(matches!(normalize(pcm), Err(ResamplerError::InvalidRate(u32::MAX))));
    }
}
