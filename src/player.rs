use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::{
    audio_source::AudioBuffer,
    error::AudioError,
    player_state::{PlaybackState, PlayerState, Progress},
};

pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// A device that can render decoded buffers.
pub trait AudioOutput: Send {
    fn open(&mut self, sample_rate: u32) -> Result<(), AudioError>;
    fn start(&mut self, buffer: Arc<AudioBuffer>) -> Result<(), AudioError>;
    fn halt(&mut self);
    fn close(&mut self);
}

/// An opened output. Closed exactly once, by `close` or on drop.
pub struct AudioEngine {
    output: Box<dyn AudioOutput>,
    sample_rate: u32,
    running: bool,
    open: bool,
}

impl AudioEngine {
    pub fn open(mut output: Box<dyn AudioOutput>, sample_rate: u32) -> Result<AudioEngine, AudioError> {
        output.open(sample_rate)?;
        info!("audio engine opened at {} Hz", sample_rate);
        Ok(AudioEngine {
            output,
            sample_rate,
            running: false,
            open: true,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self, buffer: Arc<AudioBuffer>) -> Result<(), AudioError> {
        self.halt();
        self.output.start(buffer)?;
        self.running = true;
        Ok(())
    }

    fn halt(&mut self) {
        if self.running {
            self.output.halt();
            self.running = false;
        }
    }

    fn shutdown(&mut self) {
        if self.open {
            self.halt();
            self.output.close();
            self.open = false;
            info!("audio engine closed");
        }
    }

    pub fn close(mut self) {
        self.shutdown();
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(state: &Mutex<PlayerState>) -> MutexGuard<'_, PlayerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Plays one buffer at a time and publishes progress from a tick task.
///
/// Must be used from within a tokio runtime.
pub struct Player {
    engine: AudioEngine,
    state: Arc<Mutex<PlayerState>>,
    progress: Arc<watch::Sender<Progress>>,
    ticker: Option<JoinHandle<()>>,
    tick: Duration,
}

impl Player {
    pub fn new(engine: AudioEngine) -> Player {
        let (progress, _) = watch::channel(Progress::stopped());
        Player {
            engine,
            state: Arc::new(Mutex::new(PlayerState::new())),
            progress: Arc::new(progress),
            ticker: None,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).state == PlaybackState::Playing
    }

    /// Starts `buffer` from the beginning, superseding anything playing.
    /// A zero-length buffer is a no-op.
    pub fn play(&mut self, buffer: Arc<AudioBuffer>) -> Result<(), AudioError> {
        self.stop();

        if buffer.is_empty() {
            debug!("ignoring zero-length buffer");
            return Ok(());
        }
        if buffer.sample_rate != self.engine.sample_rate() {
            warn!(
                "buffer is {} Hz but the engine runs at {} Hz",
                buffer.sample_rate,
                self.engine.sample_rate()
            );
        }

        self.engine.start(buffer.clone())?;
        {
            let mut state = lock(&self.state);
            let now = Instant::now();
            state.play(buffer, now);
            self.progress.send_replace(state.advance(now));
        }

        self.ticker = Some(spawn_ticker(self.state.clone(), self.progress.clone(), self.tick));
        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.engine.halt();

        let mut state = lock(&self.state);
        state.stop();
        self.progress.send_replace(Progress {
            state: PlaybackState::Stopped,
            position: Duration::ZERO,
            duration: state.duration(),
        });
    }

    /// Stops if playing, otherwise replays the last buffer.
    pub fn toggle(&mut self) -> Result<(), AudioError> {
        let current = {
            let state = lock(&self.state);
            match state.state {
                PlaybackState::Playing => None,
                PlaybackState::Stopped => state.current.clone(),
            }
        };
        match current {
            Some(buffer) => self.play(buffer),
            None => {
                self.stop();
                Ok(())
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_ticker(state: Arc<Mutex<PlayerState>>, progress: Arc<watch::Sender<Progress>>, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            // send under the lock so a concurrent stop() always publishes last
            let mut guard = lock(&state);
            let p = guard.advance(Instant::now());
            progress.send_replace(p);
            if !p.is_playing() {
                debug!("playback finished after {:?}", p.position);
                break;
            }
        }
    })
}
