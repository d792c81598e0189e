//! Offline transcription through a Vosk model directory.

use crate::engine::{EngineOutcome, SpeechEngine};
use crate::error::EngineError;
use crate::listener::{AudioClip, Heard, ListenWindow, Microphone};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vosk::{CompleteResult, Model, Recognizer};

pub struct VoskEngine {
    model: Model,
    model_dir: PathBuf,
}

impl VoskEngine {
    pub fn new(model_dir: &Path) -> Result<Self, EngineError> {
        if !model_dir.is_dir() {
            return Err(EngineError::Unavailable(format!(
                "model directory not found: {}",
                model_dir.display()
            )));
        }
        let model = Model::new(model_dir.to_string_lossy().as_ref()).ok_or_else(|| {
            EngineError::Unavailable(format!(
                "failed to load model from {}",
                model_dir.display()
            ))
        })?;
        info!(model_dir = %model_dir.display(), "statistical model loaded");
        Ok(Self {
            model,
            model_dir: model_dir.to_path_buf(),
        })
    }

    fn decode(&self, clip: &AudioClip) -> Result<String, EngineError> {
        let mut recognizer = Recognizer::new(&self.model, clip.sample_rate as f32)
            .ok_or_else(|| EngineError::Decode("failed to create recognizer".to_string()))?;
        recognizer
            .accept_waveform(&clip.samples)
            .map_err(|e| EngineError::Decode(format!("waveform rejected: {e}")))?;
        let text = match recognizer.final_result() {
            CompleteResult::Single(result) => result.text.to_string(),
            CompleteResult::Multiple(results) => results
                .alternatives
                .first()
                .map(|a| a.text.to_string())
                .unwrap_or_default(),
        };
        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl SpeechEngine for VoskEngine {
    fn id(&self) -> &str {
        "vosk"
    }

    fn is_offline(&self) -> bool {
        true
    }

    async fn probe(&self) -> Result<(), EngineError> {
        if self.model_dir.is_dir() {
            Ok(())
        } else {
            Err(EngineError::Unavailable(format!(
                "model directory missing: {}",
                self.model_dir.display()
            )))
        }
    }

    async fn transcribe(
        &self,
        microphone: &Microphone,
        window: ListenWindow,
    ) -> Result<EngineOutcome, EngineError> {
        let clip = match microphone.capture(window).await? {
            Heard::Speech(clip) => clip,
            Heard::Nothing => return Ok(EngineOutcome::NoSpeech),
        };
        debug!(duration = ?clip.duration, "decoding clip offline");
        // The recognizer is synchronous and stays on this task; no await
        // happens while it is alive.
        let text = self.decode(&clip)?;
        Ok(EngineOutcome::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_directory_is_unavailable() {
        let err = VoskEngine::new(Path::new("/nonexistent/vosk-model")).unwrap_err();
        assert!(matches!(err, EngineError::Unavailable(_)));
    }
}
