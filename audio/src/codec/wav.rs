//! WAV encoding and decoding via hound.

use std::io::Cursor;

use crate::pcm::{Format, PcmBuffer, f32_to_i16};

/// Error type for WAV operations.
#[derive(Debug, thiserror::Error)]
pub enum WavError {
    #[error("wav: {0}")]
    Hound(#[from] hound::Error),
    #[error("wav: unsupported bit depth {0}")]
    UnsupportedDepth(u16),
}

/// Encodes `pcm` as a 16-bit integer WAV file.
pub fn encode(pcm: &PcmBuffer) -> Result<Vec<u8>, WavError> {
    let format = pcm.format();
    let spec = hound::WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + pcm.samples().len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in pcm.samples() {
            writer.write_sample(f32_to_i16(s))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Decodes a WAV file of any integer depth up to 32 bits or 32-bit float.
pub fn decode(data: &[u8]) -> Result<PcmBuffer, WavError> {
    let mut reader = hound::WavReader::new(Cursor::new(data))?;
    let spec = reader.spec();
    let format = Format {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    };

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(WavError::UnsupportedDepth(spec.bits_per_sample));
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(PcmBuffer::new(format, samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header() {
        let pcm = PcmBuffer::new(Format::MONO_16K, vec![0.0, 0.5, -0.5]);
        let wav = encode(&pcm).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 6);

        let reader = hound::WavReader::new(Cursor::new(&wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
    }

    #[test]
    fn test_encode_empty() {
        let pcm = PcmBuffer::new(Format::MONO_16K, Vec::new());
        let wav = encode(&pcm).unwrap();
        let decoded = decode(&wav).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.format(), Format::MONO_16K);
    }

    #[test]
    fn test_decode_float_wav() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in [0.25f32, -0.25, 0.5, -0.5] {
                w.write_sample(s).unwrap();
            }
            w.finalize().unwrap();
        }
        let pcm = decode(cursor.get_ref()).unwrap();
        assert_eq!(pcm.format(), Format::stereo(22050));
        assert_eq!(pcm.samples(), &[0.25, -0.25, 0.5, -0.5]);
    }

    #[test]
    fn test_decode_int16_scale() {
        let pcm = PcmBuffer::new(Format::MONO_24K, vec![0.5, -1.0]);
        let back = decode(&encode(&pcm).unwrap()).unwrap();
        assert_eq!(back.format(), Format::MONO_24K);
        assert!((back.samples()[0] - 0.5).abs() < 1e-3);
        assert!((back.samples()[1] + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode(b"definitely not a wav file").is_err());
    }
}
