use std::time::Duration;

/// Decoded, non-interleaved audio. Each entry of `samples` is one channel
/// holding `length` normalized samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<Vec<f32>>,
    pub sample_rate: u32,
    pub length: u32,
}

impl AudioBuffer {
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.samples.get(index).map(|c| c.as_slice())
    }

    /// Length in seconds, `length / sample_rate`.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.length as f64 / self.sample_rate as f64
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }
}

#[cfg(test)]
impl AudioBuffer {
    pub(crate) fn silent(channels: usize, length: u32, sample_rate: u32) -> AudioBuffer {
        AudioBuffer {
            samples: vec![vec![0.0; length as usize]; channels],
            sample_rate,
            length,
        }
    }
}
