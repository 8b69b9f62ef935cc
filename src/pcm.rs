use base64::Engine as _;
use log::{debug, warn};

use crate::{audio_source::AudioBuffer, error::AudioError};

pub const BYTES_PER_SAMPLE: usize = 2;

pub fn decode_base64(payload: &str) -> Result<Vec<u8>, AudioError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
    Ok(bytes)
}

/// Interprets `bytes` as interleaved s16le PCM.
///
/// Odd-length input is rejected. Samples that do not fill a whole frame at the
/// end of the payload are dropped.
pub fn decode_pcm(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<AudioBuffer, AudioError> {
    if sample_rate == 0 {
        return Err(AudioError::InvalidFormat("sample rate must be positive".into()));
    }
    if channels == 0 {
        return Err(AudioError::InvalidFormat("channel count must be at least 1".into()));
    }
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        return Err(AudioError::Misaligned { len: bytes.len() });
    }

    let channel_count = channels as usize;
    let sample_count = bytes.len() / BYTES_PER_SAMPLE;
    let frame_count = sample_count / channel_count;

    let dropped = sample_count - frame_count * channel_count;
    if dropped > 0 {
        warn!(
            "dropping {} trailing samples that do not fill a {}-channel frame",
            dropped, channel_count
        );
    }

    let length = u32::try_from(frame_count)
        .map_err(|_| AudioError::Allocation(format!("{} frames is too many", frame_count)))?;

    let mut samples = Vec::new();
    samples
        .try_reserve_exact(channel_count)
        .map_err(|e| AudioError::Allocation(e.to_string()))?;
    for _channel_i in 0..channel_count {
        let mut channel_samples = Vec::new();
        channel_samples
            .try_reserve_exact(frame_count)
            .map_err(|e| AudioError::Allocation(e.to_string()))?;
        channel_samples.resize(frame_count, 0.0);
        samples.push(channel_samples);
    }

    for (i, chunk) in bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .take(frame_count * channel_count)
        .enumerate()
    {
        samples[i % channel_count][i / channel_count] = normalize(i16::from_le_bytes([chunk[0], chunk[1]]));
    }

    debug!(
        "decoded {} bytes into {} frames x {} channels at {} Hz",
        bytes.len(),
        frame_count,
        channel_count,
        sample_rate
    );

    Ok(AudioBuffer {
        samples,
        sample_rate,
        length,
    })
}

pub fn decode_base64_pcm(payload: &str, sample_rate: u32, channels: u16) -> Result<AudioBuffer, AudioError> {
    let bytes = decode_base64(payload)?;
    decode_pcm(&bytes, sample_rate, channels)
}

#[inline]
pub fn normalize(sample: i16) -> f32 {
    sample as f32 / 32768.0
}
