//! Speech-engine adapters.
//!
//! Each adapter owns the full capture-and-transcribe cycle for one backend.
//! Fallback therefore re-records through the shared [`Microphone`] rather
//! than replaying a clip, since the user is being asked to speak again
//! anyway after a failed attempt.

use crate::error::EngineError;
use crate::listener::{ListenWindow, Microphone};
use async_trait::async_trait;

mod cloud;
mod scripted;
#[cfg(feature = "vosk")]
mod vosk;
#[cfg(feature = "whisper")]
mod whisper;

pub use cloud::CloudEngine;
pub use scripted::ScriptedEngine;
#[cfg(feature = "vosk")]
pub use self::vosk::VoskEngine;
#[cfg(feature = "whisper")]
pub use self::whisper::WhisperEngine;

/// What one engine attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// A transcript, possibly empty if the backend heard only noise.
    Text(String),
    /// The listen window elapsed without speech. Not an error and never a
    /// reason to fall back to another engine.
    NoSpeech,
}

/// One speech-to-text backend.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Stable identifier used in logs and status reports.
    fn id(&self) -> &str;

    /// Whether the engine works without network access.
    fn is_offline(&self) -> bool;

    /// Cheap availability check, run before a session starts.
    async fn probe(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Record one utterance through `microphone` and transcribe it.
    async fn transcribe(
        &self,
        microphone: &Microphone,
        window: ListenWindow,
    ) -> Result<EngineOutcome, EngineError>;
}
