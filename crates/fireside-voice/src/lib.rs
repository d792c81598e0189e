//! # Fireside Voice
//!
//! Speech input for the Fireside story companion: endpointed microphone
//! capture, speech-engine adapters (cloud, and optional offline Vosk and
//! Whisper backends), spoken control phrases, and the hybrid recognizer that
//! runs engines in preference order with fallback.
//!
//! The optional offline engines are gated behind the `vosk` and `whisper`
//! features since both need native libraries and pre-downloaded models.

pub mod audio;
pub mod command;
pub mod engine;
pub mod error;
pub mod gate;
pub mod hybrid;
pub mod listener;

pub use audio::{AudioDevice, AudioFormat, AudioStream, CpalDevice, ScriptedDevice};
pub use command::{CommandInterpreter, ControlCommand};
pub use engine::{CloudEngine, EngineOutcome, ScriptedEngine, SpeechEngine};
#[cfg(feature = "vosk")]
pub use engine::VoskEngine;
#[cfg(feature = "whisper")]
pub use engine::WhisperEngine;
pub use error::{DeviceError, EngineError, EngineFailure, ListenError, VoiceError};
pub use gate::{EnergyGate, GateFactory, SpeechGate, WebRtcGate};
pub use hybrid::{EnginePreference, HybridRecognizer, Recognition};
pub use listener::{AudioClip, Heard, ListenWindow, Microphone, SilencePolicy};
