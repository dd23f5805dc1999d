//! Compressed container decoding via symphonia.
//!
//! Accepts anything symphonia can probe (webm/mkv, ogg, wav, flac, mp3, mp4)
//! and returns interleaved float PCM at the stream's native rate.

use std::io::{self, Cursor};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, CODEC_TYPE_OPUS, CodecParameters, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::pcm::{Format, PcmBuffer};

/// Error type for container decoding.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unrecognized container: {0}")]
    Unrecognized(String),
    #[error("no audio track found")]
    NoTrack,
    #[error("unsupported codec: {0}")]
    UnsupportedCodec(String),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("no audio samples decoded")]
    Empty,
}

/// Decodes a complete in-memory container to PCM.
///
/// `extension` is an optional probe hint such as `"webm"` or `"wav"`.
pub fn decode(data: &[u8], extension: Option<&str>) -> Result<PcmBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::Unrecognized(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let pcm = if params.codec == CODEC_TYPE_OPUS {
        decode_opus(format.as_mut(), track_id, &params)?
    } else {
        decode_native(format.as_mut(), track_id, &params)?
    };

    if pcm.is_empty() {
        return Err(DecodeError::Empty);
    }
    debug!(format = %pcm.format(), frames = pcm.frames(), "container: decoded");
    Ok(pcm)
}

/// Pulls the next packet of `track_id`. `Ok(None)` marks the end of stream.
///
/// Streamed recordings are often cut mid-cluster, so a read error after
/// some audio has been decoded is treated as the end of the stream.
fn next_packet(
    format: &mut dyn FormatReader,
    track_id: u32,
    have_audio: bool,
) -> Result<Option<symphonia::core::formats::Packet>, DecodeError> {
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => return Ok(Some(packet)),
            Ok(_) => continue,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            Err(SymphoniaError::ResetRequired) => return Ok(None),
            Err(e) if have_audio => {
                warn!(error = %e, "container: truncated stream, keeping decoded audio");
                return Ok(None);
            }
            Err(e) => return Err(DecodeError::Unrecognized(e.to_string())),
        }
    }
}

fn decode_native(
    format: &mut dyn FormatReader,
    track_id: u32,
    params: &CodecParameters,
) -> Result<PcmBuffer, DecodeError> {
    let mut decoder = symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedCodec(e.to_string()))?;

    let mut stream_format: Option<Format> = None;
    let mut samples: Vec<f32> = Vec::new();

    while let Some(packet) = next_packet(format, track_id, !samples.is_empty())? {
        match decoder.decode(&packet) {
            Ok(decoded) => {
                if decoded.frames() == 0 {
                    continue;
                }
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                stream_format.get_or_insert(Format {
                    sample_rate: spec.rate,
                    channels: spec.channels.count() as u16,
                });
                samples.extend_from_slice(buf.samples());
            }
            // A corrupt packet is skipped, the rest of the stream is still usable.
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(error = msg, "container: skipping undecodable packet");
            }
            Err(e) => return Err(DecodeError::Codec(e.to_string())),
        }
    }

    let format = match stream_format {
        Some(f) => f,
        None => return Err(DecodeError::Empty),
    };
    Ok(PcmBuffer::new(format, samples))
}

/// Reads the pre-skip field of an `OpusHead` identification header.
#[cfg_attr(not(feature = "opus"), allow(dead_code))]
fn opus_pre_skip(extra_data: Option<&[u8]>) -> usize {
    match extra_data {
        Some(head) if head.len() >= 12 && &head[..8] == b"OpusHead" => {
            u16::from_le_bytes([head[10], head[11]]) as usize
        }
        _ => 0,
    }
}

#[cfg(feature = "opus")]
fn decode_opus(
    format: &mut dyn FormatReader,
    track_id: u32,
    params: &CodecParameters,
) -> Result<PcmBuffer, DecodeError> {
    use super::opus::{Decoder, OPUS_SAMPLE_RATE};

    // Matroska only carries a channel layout.
    let channels = params
        .channels
        .or(params.channel_layout.map(|layout| layout.into_channels()))
        .map(|c| c.count() as u16)
        .unwrap_or(1)
        .clamp(1, 2);
    let mut decoder = Decoder::new(OPUS_SAMPLE_RATE, channels)
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    while let Some(packet) = next_packet(format, track_id, !samples.is_empty())? {
        match decoder.decode(packet.buf()) {
            Ok(pcm) => samples.extend(pcm.iter().map(|&s| s as f32 / 32768.0)),
            Err(e) => warn!(error = %e, "container: skipping undecodable opus packet"),
        }
    }

    let skip = opus_pre_skip(params.extra_data.as_deref()) * channels as usize;
    samples.drain(..skip.min(samples.len()));

    Ok(PcmBuffer::new(
        Format {
            sample_rate: OPUS_SAMPLE_RATE,
            channels,
        },
        samples,
    ))
}

#[cfg(not(feature = "opus"))]
fn decode_opus(
    _format: &mut dyn FormatReader,
    _track_id: u32,
    _params: &CodecParameters,
) -> Result<PcmBuffer, DecodeError> {
    Err(DecodeError::UnsupportedCodec(
        "opus (tolk-audio built without the `opus` feature)".to_string(),
    ))
}
