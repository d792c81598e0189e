//! Hybrid recognizer: ordered engine fallback with a runtime offline/online
//! preference and spoken-command interpretation.

use crate::command::{CommandInterpreter, ControlCommand};
use crate::engine::{EngineOutcome, SpeechEngine};
use crate::error::{EngineError, EngineFailure, ListenError};
use crate::listener::{ListenWindow, Microphone};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// What one listen attempt resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// The user answered with this text.
    Transcript(String),
    /// The user spoke a session control phrase.
    Command(ControlCommand),
    /// Speech was heard (or the window elapsed) but nothing usable came out.
    Empty,
}

/// Which family of engines to try first. Read fresh on every listen, so a
/// preference change applies to the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePreference {
    OnlineFirst,
    OfflineFirst,
}

/// Runs engines in preference order until one produces a result.
///
/// Recognition failures (`Unavailable`, `Decode`) advance to the next
/// engine; an empty window or a microphone failure ends the attempt
/// immediately, since re-recording would not change either.
pub struct HybridRecognizer {
    engines: Vec<Arc<dyn SpeechEngine>>,
    preference: RwLock<EnginePreference>,
    health: RwLock<HashMap<String, bool>>,
    commands: CommandInterpreter,
}

impl HybridRecognizer {
    pub fn new(
        engines: Vec<Arc<dyn SpeechEngine>>,
        preference: EnginePreference,
        commands: CommandInterpreter,
    ) -> Self {
        Self {
            engines,
            preference: RwLock::new(preference),
            health: RwLock::new(HashMap::new()),
            commands,
        }
    }

    pub async fn set_preference(&self, preference: EnginePreference) {
        *self.preference.write().await = preference;
        info!(?preference, "engine preference updated");
    }

    pub async fn preference(&self) -> EnginePreference {
        *self.preference.read().await
    }

    /// Last observed availability per engine id, from the most recent
    /// attempt or probe. Engines that have not run yet are absent.
    pub async fn status(&self) -> HashMap<String, bool> {
        self.health.read().await.clone()
    }

    /// Probe every engine and record the results.
    pub async fn probe_all(&self) -> HashMap<String, bool> {
        for engine in &self.engines {
            let healthy = engine.probe().await.is_ok();
            self.mark(engine.id(), healthy).await;
        }
        self.status().await
    }

    async fn mark(&self, id: &str, healthy: bool) {
        self.health.write().await.insert(id.to_string(), healthy);
    }

    fn ordered(&self, preference: EnginePreference) -> Vec<Arc<dyn SpeechEngine>> {
        let offline_first = matches!(preference, EnginePreference::OfflineFirst);
        let (preferred, rest): (Vec<_>, Vec<_>) = self
            .engines
            .iter()
            .cloned()
            .partition(|e| e.is_offline() == offline_first);
        preferred.into_iter().chain(rest).collect()
    }

    /// Record one utterance and resolve it to a [`Recognition`].
    pub async fn listen(
        &self,
        microphone: &Microphone,
        window: ListenWindow,
    ) -> Result<Recognition, ListenError> {
        if self.engines.is_empty() {
            return Err(ListenError::NoEngines);
        }
        let preference = self.preference().await;
        let mut failures = Vec::new();
        let mut undecodable = false;

        for engine in self.ordered(preference) {
            match engine.transcribe(microphone, window).await {
                Ok(EngineOutcome::Text(text)) => {
                    self.mark(engine.id(), true).await;
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        info!(engine = engine.id(), "speech decoded to nothing, trying next");
                        undecodable = true;
                        continue;
                    }
                    if let Some(command) = self.commands.interpret(&text) {
                        info!(engine = engine.id(), ?command, "control phrase recognized");
                        return Ok(Recognition::Command(command));
                    }
                    info!(engine = engine.id(), chars = text.len(), "transcript accepted");
                    return Ok(Recognition::Transcript(text));
                }
                Ok(EngineOutcome::NoSpeech) => {
                    self.mark(engine.id(), true).await;
                    info!(engine = engine.id(), "nothing heard");
                    return Ok(Recognition::Empty);
                }
                Err(EngineError::Device(e)) => {
                    return Err(ListenError::Device(e));
                }
                Err(e) => {
                    warn!(engine = engine.id(), error = %e, "engine failed, trying next");
                    self.mark(engine.id(), false).await;
                    failures.push(EngineFailure {
                        engine: engine.id().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        if undecodable {
            // The user spoke but no backend could decode it; behaves like
            // silence so the caller takes the no-reply path.
            return Ok(Recognition::Empty);
        }
        Err(ListenError::AllEnginesFailed(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ScriptedDevice;
    use crate::engine::ScriptedEngine;
    use crate::error::DeviceError;
    use crate::gate::EnergyGate;
    use crate::listener::SilencePolicy;
    use std::time::Duration;

    fn recognizer(engines: Vec<Arc<dyn SpeechEngine>>) -> HybridRecognizer {
        HybridRecognizer::new(
            engines,
            EnginePreference::OnlineFirst,
            CommandInterpreter::default(),
        )
    }

    fn idle_microphone() -> Microphone {
        Microphone::new(
            Arc::new(ScriptedDevice::silent(Duration::from_millis(1))),
            EnergyGate::factory(1_000),
            SilencePolicy::default(),
        )
    }

    fn tight_window() -> ListenWindow {
        ListenWindow {
            max_wait_for_start: Duration::from_millis(50),
            max_listen_duration: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn first_healthy_engine_wins_and_later_ones_are_not_tried() {
        let broken = Arc::new(ScriptedEngine::failing("cloud", "dns failure"));
        let working = Arc::new(ScriptedEngine::text("vosk", "tell me about your day"));
        let spare = Arc::new(ScriptedEngine::text("whisper", "unused"));
        let recognizer = recognizer(vec![broken.clone(), working.clone(), spare.clone()]);

        let result = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap();

        assert_eq!(
            result,
            Recognition::Transcript("tell me about your day".to_string())
        );
        assert_eq!(broken.calls(), 1);
        assert_eq!(working.calls(), 1);
        assert_eq!(spare.calls(), 0);
    }

    #[tokio::test]
    async fn no_speech_does_not_fall_back() {
        let silent = Arc::new(ScriptedEngine::hears_nothing("cloud"));
        let spare = Arc::new(ScriptedEngine::text("vosk", "unused"));
        let recognizer = recognizer(vec![silent.clone(), spare.clone()]);

        let result = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap();

        assert_eq!(result, Recognition::Empty);
        assert_eq!(spare.calls(), 0);
    }

    #[tokio::test]
    async fn exhausting_all_engines_reports_every_failure() {
        let recognizer = recognizer(vec![
            Arc::new(ScriptedEngine::failing("cloud", "dns failure")),
            Arc::new(ScriptedEngine::failing("vosk", "model corrupt")),
        ]);

        let err = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap_err();

        match err {
            ListenError::AllEnginesFailed(failures) => {
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].engine, "cloud");
                assert_eq!(failures[1].engine, "vosk");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn no_engines_is_its_own_error() {
        let recognizer = recognizer(Vec::new());
        let err = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap_err();
        assert!(matches!(err, ListenError::NoEngines));
    }

    #[tokio::test]
    async fn offline_preference_reorders_engines() {
        let cloud = Arc::new(ScriptedEngine::text("cloud", "from the cloud"));
        let local = Arc::new(ScriptedEngine::text("vosk", "from the local model").offline(true));
        let recognizer = recognizer(vec![cloud.clone(), local.clone()]);

        let online = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap();
        assert_eq!(online, Recognition::Transcript("from the cloud".to_string()));

        recognizer.set_preference(EnginePreference::OfflineFirst).await;
        let offline = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap();
        assert_eq!(
            offline,
            Recognition::Transcript("from the local model".to_string())
        );
    }

    #[tokio::test]
    async fn control_phrases_take_precedence_over_transcripts() {
        let engine = Arc::new(ScriptedEngine::text("cloud", "please repeat that"));
        let recognizer = recognizer(vec![engine]);

        let result = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap();

        assert_eq!(result, Recognition::Command(ControlCommand::Repeat));
    }

    #[tokio::test]
    async fn status_reflects_the_last_attempt() {
        let recognizer = recognizer(vec![
            Arc::new(ScriptedEngine::failing("cloud", "dns failure")),
            Arc::new(ScriptedEngine::text("vosk", "an answer")),
        ]);

        let _ = recognizer.listen(&idle_microphone(), tight_window()).await;
        let status = recognizer.status().await;
        assert_eq!(status.get("cloud"), Some(&false));
        assert_eq!(status.get("vosk"), Some(&true));
    }

    #[tokio::test]
    async fn empty_transcript_falls_back_before_resolving_to_empty() {
        let mute = Arc::new(ScriptedEngine::text("cloud", "   "));
        let recognizer = recognizer(vec![
            mute.clone(),
            Arc::new(ScriptedEngine::text("vosk", "a real answer")),
        ]);
        let result = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap();
        assert_eq!(result, Recognition::Transcript("a real answer".to_string()));
        assert_eq!(mute.calls(), 1);
    }

    #[tokio::test]
    async fn microphone_loss_aborts_without_trying_another_engine() {
        let unplugged = Arc::new(ScriptedEngine::with_script(
            "cloud",
            vec![Err(EngineError::Device(DeviceError::Unavailable(
                "microphone unplugged".to_string(),
            )))],
        ));
        let spare = Arc::new(ScriptedEngine::text("vosk", "unused"));
        let recognizer = recognizer(vec![unplugged.clone(), spare.clone()]);

        let err = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap_err();

        // Re-recording on another engine cannot help without a microphone.
        assert!(matches!(err, ListenError::Device(DeviceError::Unavailable(_))));
        assert_eq!(spare.calls(), 0);
    }

    #[tokio::test]
    async fn all_empty_transcripts_resolve_to_empty() {
        let recognizer = recognizer(vec![Arc::new(ScriptedEngine::text("cloud", "   "))]);
        let result = recognizer
            .listen(&idle_microphone(), tight_window())
            .await
            .unwrap();
        assert_eq!(result, Recognition::Empty);
    }
}
