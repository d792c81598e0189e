//! Deterministic engine used in tests and wiring checks. Plays back a queue
//! of pre-scripted outcomes without touching the microphone.

use crate::engine::{EngineOutcome, SpeechEngine};
use crate::error::EngineError;
use crate::listener::{ListenWindow, Microphone};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct ScriptedEngine {
    id: String,
    offline: bool,
    script: Mutex<VecDeque<Result<EngineOutcome, EngineError>>>,
    /// Outcome replayed once the script is exhausted.
    repeat: Option<Result<EngineOutcome, EngineError>>,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn with_script(id: &str, script: Vec<Result<EngineOutcome, EngineError>>) -> Self {
        Self {
            id: id.to_string(),
            offline: false,
            script: Mutex::new(script.into_iter().collect()),
            repeat: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// An engine that transcribes the same text forever.
    pub fn text(id: &str, transcript: &str) -> Self {
        let mut engine = Self::with_script(id, Vec::new());
        engine.repeat = Some(Ok(EngineOutcome::Text(transcript.to_string())));
        engine
    }

    /// An engine that always fails with the given reason.
    pub fn failing(id: &str, reason: &str) -> Self {
        let mut engine = Self::with_script(id, Vec::new());
        engine.repeat = Some(Err(EngineError::Unavailable(reason.to_string())));
        engine
    }

    /// An engine that always hears nothing.
    pub fn hears_nothing(id: &str) -> Self {
        let mut engine = Self::with_script(id, Vec::new());
        engine.repeat = Some(Ok(EngineOutcome::NoSpeech));
        engine
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SpeechEngine for ScriptedEngine {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_offline(&self) -> bool {
        self.offline
    }

    async fn transcribe(
        &self,
        _microphone: &Microphone,
        _window: ListenWindow,
    ) -> Result<EngineOutcome, EngineError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(next) = self.script.lock().map(|mut s| s.pop_front()).ok().flatten() {
            return next;
        }
        match &self.repeat {
            Some(Ok(outcome)) => Ok(outcome.clone()),
            Some(Err(EngineError::Unavailable(reason))) => {
                Err(EngineError::Unavailable(reason.clone()))
            }
            Some(Err(EngineError::Decode(reason))) => Err(EngineError::Decode(reason.clone())),
            Some(Err(EngineError::Device(_))) | None => {
                Err(EngineError::Unavailable("script exhausted".to_string()))
            }
        }
    }
}
