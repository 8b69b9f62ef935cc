use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::audio_source::AudioBuffer;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Playing,
    Stopped,
}

/// What the player currently holds. Position is derived from a monotonic
/// clock rather than from the output device.
pub struct PlayerState {
    pub state: PlaybackState,
    pub current: Option<Arc<AudioBuffer>>,
    started_at: Option<Instant>,
}

/// Snapshot published to progress subscribers.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub state: PlaybackState,
    pub position: Duration,
    pub duration: Duration,
}

impl Progress {
    pub fn stopped() -> Progress {
        Progress {
            state: PlaybackState::Stopped,
            position: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Fraction played, in [0, 1].
    pub fn fraction(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        (self.position.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }
}

impl PlayerState {
    pub fn new() -> Self {
        PlayerState {
            state: PlaybackState::Stopped,
            current: None,
            started_at: None,
        }
    }

    pub fn play(&mut self, buffer: Arc<AudioBuffer>, now: Instant) -> &mut Self {
        self.current = Some(buffer);
        self.started_at = Some(now);
        self.state = PlaybackState::Playing;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.started_at = None;
        self.state = PlaybackState::Stopped;
        self
    }

    pub fn duration(&self) -> Duration {
        self.current
            .as_ref()
            .map(|b| b.duration())
            .unwrap_or(Duration::ZERO)
    }

    /// Progress at `now`. Flips to `Stopped` once the buffer has played out.
    pub fn advance(&mut self, now: Instant) -> Progress {
        let duration = self.duration();
        let position = match (self.state, self.started_at) {
            (PlaybackState::Playing, Some(started_at)) => now.saturating_duration_since(started_at).min(duration),
            _ => Duration::ZERO,
        };

        if self.state == PlaybackState::Playing && position >= duration {
            self.stop();
            return Progress {
                state: PlaybackState::Stopped,
                position: duration,
                duration,
            };
        }

        Progress {
            state: self.state,
            position,
            duration,
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}
