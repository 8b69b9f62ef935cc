use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{
    audio_source::AudioBuffer,
    error::{AudioError, GenerationError, NarratorError},
    pcm,
    wav::{self, WavBlob},
};

/// Sample rate of the PCM returned by the speech capability.
pub const SPEECH_SAMPLE_RATE: u32 = 24000;
pub const SPEECH_CHANNELS: u16 = 1;

/// Prebuilt voice name understood by the speech service, e.g. `Kore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Voice(pub String);

impl Voice {
    pub const PREBUILT: &'static [&'static str] = &["Kore", "Puck", "Charon", "Fenrir", "Aoede", "Leda", "Orus", "Zephyr"];

    pub fn new(name: impl Into<String>) -> Voice {
        Voice(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_prebuilt(&self) -> bool {
        Self::PREBUILT.contains(&self.0.as_str())
    }
}

impl Default for Voice {
    fn default() -> Self {
        Voice::new("Kore")
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechPayload {
    pub audio_base64: Option<String>,
}

/// Rewrites raw news text into a narration script.
pub trait ScriptGenerator: Send + Sync {
    fn generate<'a>(&'a self, raw_text: &'a str) -> BoxFuture<'a, Result<String, GenerationError>>;
}

/// Synthesizes speech for a script. The payload is base64 s16le PCM at
/// [`SPEECH_SAMPLE_RATE`].
pub trait SpeechGenerator: Send + Sync {
    fn generate<'a>(&'a self, text: &'a str, voice: &'a Voice) -> BoxFuture<'a, Result<SpeechPayload, GenerationError>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    WritingScript,
    Synthesizing,
    Ready,
    Failed { message: String },
}

impl WorkflowState {
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowState::WritingScript | WorkflowState::Synthesizing)
    }
}

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct Narration {
    pub script: String,
    pub voice: Voice,
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
    pub buffer: Arc<AudioBuffer>,
}

impl Narration {
    pub fn to_wav(&self) -> Result<WavBlob, AudioError> {
        wav::encode_wav(&self.pcm, self.sample_rate)
    }
}

/// Runs script generation then speech generation, one request at a time.
pub struct Narrator {
    script: Arc<dyn ScriptGenerator>,
    speech: Arc<dyn SpeechGenerator>,
    in_flight: AtomicBool,
    state: watch::Sender<WorkflowState>,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Narrator {
    pub fn new(script: Arc<dyn ScriptGenerator>, speech: Arc<dyn SpeechGenerator>) -> Narrator {
        let (state, _) = watch::channel(WorkflowState::Idle);
        Narrator {
            script,
            speech,
            in_flight: AtomicBool::new(false),
            state,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// Back to `Idle`. Ignored while a request is in flight.
    pub fn reset(&self) {
        if !self.in_flight.load(Ordering::Acquire) {
            self.state.send_replace(WorkflowState::Idle);
        }
    }

    pub async fn generate(&self, raw_text: &str, voice: &Voice) -> Result<Narration, NarratorError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(NarratorError::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        match self.run(raw_text, voice).await {
            Ok(narration) => {
                self.state.send_replace(WorkflowState::Ready);
                Ok(narration)
            }
            Err(err) => {
                error!("narration failed: {}", err);
                self.state.send_replace(WorkflowState::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run(&self, raw_text: &str, voice: &Voice) -> Result<Narration, NarratorError> {
        let raw_text = raw_text.trim();
        if raw_text.is_empty() {
            return Err(NarratorError::EmptyInput);
        }

        self.state.send_replace(WorkflowState::WritingScript);
        info!("writing script for {} chars of news text", raw_text.chars().count());
        let script = self.script.generate(raw_text).await?;

        self.state.send_replace(WorkflowState::Synthesizing);
        info!("synthesizing {} chars with voice {}", script.chars().count(), voice);
        let payload = self.speech.generate(&script, voice).await?;
        let audio_base64 = payload.audio_base64.ok_or(NarratorError::MissingAudio)?;

        let pcm = pcm::decode_base64(&audio_base64)?;
        let buffer = pcm::decode_pcm(&pcm, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)?;
        info!("received {:.2}s of audio", buffer.duration_secs());

        Ok(Narration {
            script,
            voice: voice.clone(),
            pcm,
            sample_rate: SPEECH_SAMPLE_RATE,
            buffer: Arc::new(buffer),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use futures::FutureExt;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeScript {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ScriptGenerator for FakeScript {
        fn generate<'a>(&'a self, raw_text: &'a str) -> BoxFuture<'a, Result<String, GenerationError>> {
            async move {
                self.calls.lock().unwrap().push(raw_text.to_string());
                if self.fail {
                    return Err(GenerationError::Service("quota exceeded".into()));
                }
                Ok(format!("script: {}", raw_text))
            }
            .boxed()
        }
    }

    struct FakeSpeech {
        calls: Mutex<Vec<(String, Voice)>>,
        payload: Option<String>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeSpeech {
        fn returning(payload: Option<&str>) -> FakeSpeech {
            FakeSpeech {
                calls: Mutex::new(vec![]),
                payload: payload.map(str::to_string),
                gate: None,
            }
        }
    }

    impl SpeechGenerator for FakeSpeech {
        fn generate<'a>(&'a self, text: &'a str, voice: &'a Voice) -> BoxFuture<'a, Result<SpeechPayload, GenerationError>> {
            async move {
                self.calls.lock().unwrap().push((text.to_string(), voice.clone()));
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                Ok(SpeechPayload {
                    audio_base64: self.payload.clone(),
                })
            }
            .boxed()
        }
    }

    fn half_second_tone() -> String {
        base64::engine::general_purpose::STANDARD.encode(crate::sine::tone_pcm(440.0, 0.5, 24000))
    }

    #[tokio::test]
    async fn generates_script_then_speech() {
        let script = Arc::new(FakeScript::default());
        let speech = Arc::new(FakeSpeech::returning(Some(half_second_tone().as_str())));
        let narrator = Narrator::new(script.clone(), speech.clone());

        let narration = narrator.generate("  पुण्यात पाऊस  ", &Voice::new("Puck")).await.unwrap();

        assert_eq!(*script.calls.lock().unwrap(), vec!["पुण्यात पाऊस".to_string()]);
        assert_eq!(
            *speech.calls.lock().unwrap(),
            vec![("script: पुण्यात पाऊस".to_string(), Voice::new("Puck"))]
        );
        assert_eq!(narration.script, "script: पुण्यात पाऊस");
        assert_eq!(narration.buffer.length, 12000);
        assert!((narration.buffer.duration_secs() - 0.5).abs() < 1e-9);
        assert_eq!(narration.to_wav().unwrap().len(), 44 + narration.pcm.len());
        assert_eq!(narrator.state(), WorkflowState::Ready);
    }

    #[tokio::test]
    async fn missing_audio_is_distinct_error() {
        let narrator = Narrator::new(Arc::new(FakeScript::default()), Arc::new(FakeSpeech::returning(None)));

        let err = narrator.generate("news", &Voice::default()).await.unwrap_err();
        assert!(matches!(err, NarratorError::MissingAudio));
        assert_eq!(err.to_string(), "no audio data received");
        assert_eq!(
            narrator.state(),
            WorkflowState::Failed {
                message: "no audio data received".into()
            }
        );
    }

    #[tokio::test]
    async fn script_failure_skips_speech_and_allows_retry() {
        let script = Arc::new(FakeScript {
            calls: Mutex::new(vec![]),
            fail: true,
        });
        let speech = Arc::new(FakeSpeech::returning(Some("AAAAAA==")));
        let narrator = Narrator::new(script.clone(), speech.clone());

        let err = narrator.generate("news", &Voice::default()).await.unwrap_err();
        assert!(matches!(err, NarratorError::Remote(GenerationError::Service(_))));
        assert!(speech.calls.lock().unwrap().is_empty());

        // not stuck busy
        let err = narrator.generate("news", &Voice::default()).await.unwrap_err();
        assert!(matches!(err, NarratorError::Remote(_)));
        assert_eq!(script.calls.lock().unwrap().len(), 2);

        narrator.reset();
        assert_eq!(narrator.state(), WorkflowState::Idle);
    }

    #[tokio::test]
    async fn rejects_empty_text_without_calling_out() {
        let script = Arc::new(FakeScript::default());
        let narrator = Narrator::new(script.clone(), Arc::new(FakeSpeech::returning(None)));

        let err = narrator.generate(" \n\t", &Voice::default()).await.unwrap_err();
        assert!(matches!(err, NarratorError::EmptyInput));
        assert!(script.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_propagates() {
        let narrator = Narrator::new(
            Arc::new(FakeScript::default()),
            Arc::new(FakeSpeech::returning(Some("AA=="))),
        );

        let err = narrator.generate("news", &Voice::default()).await.unwrap_err();
        assert!(matches!(err, NarratorError::Audio(crate::error::AudioError::Misaligned { len: 1 })));
    }

    #[tokio::test]
    async fn second_request_while_in_flight_is_busy() {
        let gate = Arc::new(Notify::new());
        let speech = Arc::new(FakeSpeech {
            calls: Mutex::new(vec![]),
            payload: Some("AAAAAA==".into()),
            gate: Some(gate.clone()),
        });
        let narrator = Arc::new(Narrator::new(Arc::new(FakeScript::default()), speech.clone()));
        let mut states = narrator.subscribe();

        let first = {
            let narrator = narrator.clone();
            tokio::spawn(async move { narrator.generate("first", &Voice::default()).await })
        };

        states
            .wait_for(|s| *s == WorkflowState::Synthesizing)
            .await
            .unwrap();
        assert!(narrator.state().is_busy());
        assert!(matches!(
            narrator.generate("second", &Voice::default()).await,
            Err(NarratorError::Busy)
        ));

        narrator.reset();
        assert_eq!(narrator.state(), WorkflowState::Synthesizing);

        gate.notify_one();
        let narration = first.await.unwrap().unwrap();
        assert_eq!(narration.pcm, vec![0, 0, 0, 0]);
        assert_eq!(speech.calls.lock().unwrap().len(), 1);
    }
}
