//! Interleaved float PCM buffers.

use std::time::Duration;

use super::Format;

/// Interleaved `f32` samples in `[-1.0, 1.0]` with their format.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    format: Format,
    samples: Vec<f32>,
}

impl PcmBuffer {
    /// Creates a buffer from interleaved samples.
    ///
    /// Trailing samples that do not fill a whole frame are dropped.
    pub fn new(format: Format, mut samples: Vec<f32>) -> Self {
        let channels = format.channels.max(1) as usize;
        let whole = samples.len() - samples.len() % channels;
        samples.truncate(whole);
        Self { format, samples }
    }

    /// Interprets `data` as little-endian signed 16-bit interleaved samples.
    ///
    /// A trailing odd byte is ignored.
    pub fn from_i16_le(format: Format, data: &[u8]) -> Self {
        let samples = data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        Self::new(format, samples)
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels.max(1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.format.duration(self.frames())
    }

    /// Collapses all channels into one by averaging each frame.
    pub fn into_mono(self) -> PcmBuffer {
        if self.format.channels <= 1 {
            return PcmBuffer {
                format: Format::mono(self.format.sample_rate),
                samples: self.samples,
            };
        }
        let channels = self.format.channels as usize;
        let samples = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        PcmBuffer {
            format: Format::mono(self.format.sample_rate),
            samples,
        }
    }
}

/// Quantizes a float sample to 16-bit, clamping out-of-range values.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_i16_le() {
        let data = [0x00, 0x40, 0x00, 0xc0, 0x7f];
        let buf = PcmBuffer::from_i16_le(Format::MONO_16K, &data);
        assert_eq!(buf.samples(), &[0.5, -0.5]);
    }

    #[test]
    fn test_partial_frame_dropped() {
        let buf = PcmBuffer::new(Format::stereo(8000), vec![0.1, 0.2, 0.3]);
        assert_eq!(buf.frames(), 1);
        assert_eq!(buf.samples().len(), 2);
    }

    #[test]
    fn test_into_mono_averages() {
        let buf = PcmBuffer::new(Format::STEREO_48K, vec![1.0, 0.0, -0.5, -0.5, 0.25, 0.75]);
        let mono = buf.into_mono();
        assert_eq!(mono.format(), Format::MONO_48K);
        assert_eq!(mono.samples(), &[0.5, -0.5, 0.5]);
    }

    #[test]
    fn test_into_mono_passthrough() {
        let buf = PcmBuffer::new(Format::MONO_16K, vec![0.1, 0.2]);
        assert_eq!(buf.clone().into_mono(), buf);
    }

    #[test]
    fn test_f32_to_i16_clamps() {
        assert_eq!(f32_to_i16(2.0), 32767);
        assert_eq!(f32_to_i16(-2.0), -32767);
        assert_eq!(f32_to_i16(0.0), 0);
    }
}
