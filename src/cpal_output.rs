use std::sync::{Arc, Mutex, MutexGuard};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};

use crate::{
    audio_source::AudioBuffer,
    error::AudioError,
    output::{render_interleaved, PlaybackCursor},
    player::AudioOutput,
};

struct SendStream {
    _stream: cpal::Stream,
}
unsafe impl Send for SendStream {}
unsafe impl Sync for SendStream {}

fn output_error(err: impl std::fmt::Display) -> AudioError {
    AudioError::Output(err.to_string())
}

fn lock(cursor: &Mutex<Option<PlaybackCursor>>) -> MutexGuard<'_, Option<PlaybackCursor>> {
    cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Default output device through cpal. The stream runs from `open` to
/// `close`; `start` and `halt` only swap what the callback reads.
pub struct CpalOutput {
    cursor: Arc<Mutex<Option<PlaybackCursor>>>,
    stream: Option<SendStream>,
    device_rate: u32,
}

impl CpalOutput {
    pub fn new() -> Self {
        CpalOutput {
            cursor: Arc::new(Mutex::new(None)),
            stream: None,
            device_rate: 0,
        }
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn open(&mut self, sample_rate: u32) -> Result<(), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::Output("no output device".into()))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let config = device.default_output_config().map_err(output_error)?;
        let device_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        info!(
            "opened {} ({} channels at {} Hz) for {} Hz audio",
            name, channels, device_rate, sample_rate
        );

        let cursor = self.cursor.clone();
        let err_fn = |err| error!("cpal output error: {}", err);
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device
                .build_output_stream(
                    &config.into(),
                    move |data: &mut [f32], _| match cursor.try_lock() {
                        Ok(mut guard) => render_interleaved(&mut guard, data, channels),
                        Err(_) => data.fill(0.0),
                    },
                    err_fn,
                    None,
                )
                .map_err(output_error)?,
            other => {
                return Err(AudioError::Output(format!("unsupported sample format {:?}", other)))
            }
        };
        stream.play().map_err(output_error)?;

        self.device_rate = device_rate;
        self.stream = Some(SendStream { _stream: stream });
        Ok(())
    }

    fn start(&mut self, buffer: Arc<AudioBuffer>) -> Result<(), AudioError> {
        if self.stream.is_none() {
            return Err(AudioError::Output("output is not open".into()));
        }
        *lock(&self.cursor) = Some(PlaybackCursor::new(buffer, self.device_rate));
        Ok(())
    }

    fn halt(&mut self) {
        *lock(&self.cursor) = None;
    }

    fn close(&mut self) {
        self.halt();
        self.stream = None;
    }
}
