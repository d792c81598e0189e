//! Error types for the voice input subsystem.

use thiserror::Error;

/// Microphone-level failures. Fatal to the current session; never retried
/// silently and never absorbed by engine fallback.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("audio device unavailable: {0}")]
    Unavailable(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("audio device closed")]
    Closed,
}

impl From<cpal::DevicesError> for DeviceError {
    fn from(err: cpal::DevicesError) -> Self {
        DeviceError::Unavailable(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for DeviceError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        DeviceError::Unavailable(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for DeviceError {
    fn from(err: cpal::BuildStreamError) -> Self {
        DeviceError::Stream(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for DeviceError {
    fn from(err: cpal::PlayStreamError) -> Self {
        DeviceError::Stream(err.to_string())
    }
}

/// Failures from one speech-engine adapter. `Unavailable` and `Decode` are
/// absorbed by the hybrid recognizer's fallback; `Device` is not.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Backend could not be reached or loaded (no network, model missing).
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Backend ran but could not produce a transcript.
    #[error("transcription failed: {0}")]
    Decode(String),

    /// Microphone failure; surfaced to the operator, no fallback.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// One recorded fallback attempt.
#[derive(Debug, Clone)]
pub struct EngineFailure {
    pub engine: String,
    pub reason: String,
}

/// Aggregate outcome when a whole listen attempt fails.
#[derive(Debug, Error)]
pub enum ListenError {
    #[error("no speech engines registered")]
    NoEngines,

    #[error("all speech engines failed: {}", describe_failures(.0))]
    AllEnginesFailed(Vec<EngineFailure>),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

fn describe_failures(failures: &[EngineFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.engine, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration problems caught at construction time.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Device(#[from] DeviceError),
}
