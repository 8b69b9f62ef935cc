//! Narrated Marathi news clips: decode TTS PCM payloads into playable
//! buffers and wrap them in WAV containers for saving and sharing.

pub mod audio_source;
#[cfg(feature = "playback")]
pub mod cpal_output;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod output;
pub mod pcm;
pub mod player;
pub mod player_state;
pub mod share;
pub mod sine;
pub mod storage;
pub mod wav;
pub mod wav_header;

pub use audio_source::AudioBuffer;
pub use error::{AudioError, GenerationError, NarratorError};
pub use generation::{Narration, Narrator, ScriptGenerator, SpeechGenerator, SpeechPayload, Voice, WorkflowState};
pub use wav::{encode_wav, WavBlob};
