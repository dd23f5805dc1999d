//! PCM audio format definitions.

use std::time::Duration;

/// Describes an interleaved PCM stream: sample rate and channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Format {
    /// Sample rate in Hz (e.g., 16000, 48000).
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl Format {
    /// Creates a mono format with the given sample rate.
    pub const fn mono(sample_rate: u32) -> Self {
        Self { sample_rate, channels: 1 }
    }

    /// Creates a stereo format with the given sample rate.
    pub const fn stereo(sample_rate: u32) -> Self {
        Self { sample_rate, channels: 2 }
    }

    /// Returns true if the format has exactly one channel.
    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    /// Returns the number of bytes per frame for 16-bit samples.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * 2
    }

    /// Returns the playback duration of `frames` frames.
    pub fn duration(&self, frames: usize) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }
}

// Common format presets
impl Format {
    /// 16kHz mono (speech models)
    pub const MONO_16K: Format = Format::mono(16000);
    /// 24kHz mono
    pub const MONO_24K: Format = Format::mono(24000);
    /// 48kHz mono (Opus native rate)
    pub const MONO_48K: Format = Format::mono(48000);
    /// 44.1kHz stereo (CD quality)
    pub const STEREO_44K: Format = Format::stereo(44100);
    /// 48kHz stereo
    pub const STEREO_48K: Format = Format::stereo(48000);
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Hz/{}ch", self.sample_rate, self.channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_presets() {
        assert_eq!(Format::MONO_16K.sample_rate, 16000);
        assert!(Format::MONO_16K.is_mono());
        assert_eq!(Format::STEREO_48K.channels, 2);
        assert!(!Format::STEREO_44K.is_mono());
    }

    #[test]
    fn test_frame_bytes() {
        assert_eq!(Format::mono(16000).frame_bytes(), 2);
        assert_eq!(Format::stereo(48000).frame_bytes(), 4);
    }

    #[test]
    fn test_duration() {
        assert_eq!(Format::MONO_16K.duration(16000), Duration::from_secs(1));
        assert_eq!(Format::MONO_16K.duration(1600), Duration::from_millis(100));
        assert_eq!(Format::mono(0).duration(10), Duration::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(Format::STEREO_48K.to_string(), "48000Hz/2ch");
    }
}
