use std::sync::Arc;

use crate::{audio_source::AudioBuffer, error::AudioError, player::AudioOutput};

/// Read position into a buffer, advanced `step` source frames per device frame.
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    buffer: Arc<AudioBuffer>,
    position: f64,
    step: f64,
}

impl PlaybackCursor {
    pub fn new(buffer: Arc<AudioBuffer>, device_rate: u32) -> PlaybackCursor {
        let step = if device_rate == 0 {
            1.0
        } else {
            buffer.sample_rate as f64 / device_rate as f64
        };
        PlaybackCursor {
            buffer,
            position: 0.0,
            step,
        }
    }

    pub fn frame(&self) -> usize {
        self.position as usize
    }

    pub fn is_finished(&self) -> bool {
        self.buffer.samples.is_empty() || self.frame() >= self.buffer.length as usize
    }
}

/// Fills interleaved device frames from `cursor`. Output channels beyond the
/// buffer's wrap around its channels; once the buffer runs out the cursor is
/// cleared and the rest is silence.
pub fn render_interleaved(cursor: &mut Option<PlaybackCursor>, data: &mut [f32], channels: usize) {
    for frame in data.chunks_mut(channels.max(1)) {
        if cursor.as_ref().map_or(true, PlaybackCursor::is_finished) {
            *cursor = None;
            frame.fill(0.0);
            continue;
        }

        if let Some(current) = cursor.as_mut() {
            let index = current.frame();
            let source = &current.buffer.samples;
            for (channel_index, sample) in frame.iter_mut().enumerate() {
                *sample = source[channel_index % source.len()].get(index).copied().unwrap_or(0.0);
            }
            current.position += current.step;
        }
    }
}

/// The system's default speaker.
#[cfg(feature = "playback")]
pub fn default_output() -> Result<Box<dyn AudioOutput>, AudioError> {
    Ok(Box::new(crate::cpal_output::CpalOutput::new()))
}

#[cfg(not(feature = "playback"))]
pub fn default_output() -> Result<Box<dyn AudioOutput>, AudioError> {
    Err(AudioError::Output(
        "built without the playback feature, rebuild with --features playback".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(channels: usize, length: u32, sample_rate: u32) -> Arc<AudioBuffer> {
        let samples = (0..channels)
            .map(|c| (0..length).map(|i| (c * 100) as f32 + i as f32).collect())
            .collect();
        Arc::new(AudioBuffer {
            samples,
            sample_rate,
            length,
        })
    }

    #[test]
    fn mono_fans_out_to_every_device_channel() {
        let mut cursor = Some(PlaybackCursor::new(ramp(1, 4, 24000), 24000));
        let mut data = [9.0f32; 6];

        render_interleaved(&mut cursor, &mut data, 2);

        assert_eq!(data, [0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        assert_eq!(cursor.unwrap().frame(), 3);
    }

    #[test]
    fn stereo_keeps_channels_apart() {
        let mut cursor = Some(PlaybackCursor::new(ramp(2, 2, 24000), 24000));
        let mut data = [0.0f32; 4];

        render_interleaved(&mut cursor, &mut data, 2);

        assert_eq!(data, [0.0, 100.0, 1.0, 101.0]);
    }

    #[test]
    fn steps_through_source_at_the_device_rate() {
        // 24 kHz source on a 48 kHz device repeats each frame twice
        let mut cursor = Some(PlaybackCursor::new(ramp(1, 3, 24000), 48000));
        let mut data = [0.0f32; 6];

        render_interleaved(&mut cursor, &mut data, 1);

        assert_eq!(data, [0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn silence_and_cleared_cursor_after_the_end() {
        let mut cursor = Some(PlaybackCursor::new(ramp(1, 2, 24000), 24000));
        let mut data = [7.0f32; 4];

        render_interleaved(&mut cursor, &mut data, 1);

        assert_eq!(data, [0.0, 1.0, 0.0, 0.0]);
        assert!(cursor.is_none());

        let mut data = [7.0f32; 2];
        render_interleaved(&mut cursor, &mut data, 1);
        assert_eq!(data, [0.0, 0.0]);
    }

    #[cfg(not(feature = "playback"))]
    #[test]
    fn default_output_needs_the_playback_feature() {
        assert!(matches!(default_output(), Err(AudioError::Output(_))));
    }
}
