use std::f32::consts::PI;

/// Renders a mono sine tone as s16le PCM bytes.
pub fn tone_pcm(freq: f32, seconds: f32, sample_rate: u32) -> Vec<u8> {
    let amplitude = 0.1;
    let frame_count = (seconds * sample_rate as f32).round() as usize;
    let mut pcm = Vec::with_capacity(frame_count * 2);
    for i in 0..frame_count {
        let t = i as f32 / sample_rate as f32;
        let sample = amplitude * (2.0 * PI * freq * t).sin();
        pcm.extend_from_slice(&((sample * 32767.0) as i16).to_le_bytes());
    }
    pcm
}
