//! Opus decoder.

use std::ptr;

use super::ffi::{self, OpusDecoder as OpusDecoderHandle};

/// Opus decoder error.
#[derive(Debug, thiserror::Error)]
pub enum OpusError {
    #[error("opus: decoder create failed: {0}")]
    CreateFailed(String),
    #[error("opus: decode failed: {0}")]
    DecodeFailed(String),
}

/// Max frame size: 120ms at 48kHz.
const MAX_FRAME_SAMPLES: i32 = 5760;

/// Opus decoder producing interleaved i16 PCM.
pub struct Decoder {
    sample_rate: i32,
    channels: i32,
    handle: *mut OpusDecoderHandle,
}

// Safety: the decoder handle is owned and only used through &mut self.
unsafe impl Send for Decoder {}

impl Drop for Decoder {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe { ffi::opus_decoder_destroy(self.handle) };
            self.handle = ptr::null_mut();
        }
    }
}

impl Decoder {
    /// Creates a new Opus decoder.
    ///
    /// `sample_rate` is one of 8000, 12000, 16000, 24000 or 48000 and
    /// `channels` is 1 or 2.
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, OpusError> {
        let sample_rate = sample_rate as i32;
        let channels = channels as i32;
        let mut error: i32 = 0;
        let handle = unsafe { ffi::opus_decoder_create(sample_rate, channels, &mut error) };

        if handle.is_null() || error != ffi::OPUS_OK {
            return Err(OpusError::CreateFailed(ffi::error_string(error)));
        }

        Ok(Self {
            sample_rate,
            channels,
            handle,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate as u32
    }

    pub fn channels(&self) -> u16 {
        self.channels as u16
    }

    /// Decodes one Opus packet to interleaved PCM samples.
    pub fn decode(&mut self, packet: &[u8]) -> Result<Vec<i16>, OpusError> {
        let mut buf = vec![0i16; (MAX_FRAME_SAMPLES * self.channels) as usize];

        let (data_ptr, data_len) = if packet.is_empty() {
            (ptr::null(), 0)
        } else {
            (packet.as_ptr(), packet.len() as i32)
        };

        let n = unsafe {
            ffi::opus_decode(
                self.handle,
                data_ptr,
                data_len,
                buf.as_mut_ptr(),
                MAX_FRAME_SAMPLES,
                0, // decode_fec
            )
        };

        if n < 0 {
            return Err(OpusError::DecodeFailed(ffi::error_string(n)));
        }

        buf.truncate(n as usize * self.channels as usize);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_create() {
        let dec = Decoder::new(48000, 1).unwrap();
        assert_eq!(dec.sample_rate(), 48000);
        assert_eq!(dec.channels(), 1);
    }

    #[test]
    fn test_decoder_invalid_rate() {
        assert!(Decoder::new(44100, 1).is_err());
    }
}
