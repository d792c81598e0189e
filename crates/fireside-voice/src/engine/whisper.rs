//! Offline transcription through a local Whisper checkpoint.

use crate::engine::{EngineOutcome, SpeechEngine};
use crate::error::EngineError;
use crate::listener::{AudioClip, Heard, ListenWindow, Microphone};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState};

pub struct WhisperEngine {
    // Keeps the model weights alive for the state below.
    #[allow(dead_code)]
    context: WhisperContext,
    state: Mutex<WhisperState>,
    model_path: PathBuf,
}

impl WhisperEngine {
    pub fn new(model_path: &Path) -> Result<Self, EngineError> {
        if !model_path.is_file() {
            return Err(EngineError::Unavailable(format!(
                "model checkpoint not found: {}",
                model_path.display()
            )));
        }
        let context = WhisperContext::new_with_params(
            model_path.to_string_lossy().as_ref(),
            WhisperContextParameters::default(),
        )
        .map_err(|e| EngineError::Unavailable(format!("failed to load model: {e}")))?;
        let state = context
            .create_state()
            .map_err(|e| EngineError::Unavailable(format!("failed to create state: {e}")))?;
        info!(model = %model_path.display(), "neural model loaded");
        Ok(Self {
            context,
            state: Mutex::new(state),
            model_path: model_path.to_path_buf(),
        })
    }

    fn decode(&self, clip: &AudioClip) -> Result<String, EngineError> {
        if clip.sample_rate != 16_000 {
            return Err(EngineError::Decode(format!(
                "expected 16kHz audio, got {}Hz",
                clip.sample_rate
            )));
        }
        let samples: Vec<f32> = clip.samples.iter().map(|&s| f32::from(s) / 32768.0).collect();

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_no_timestamps(true);
        params.set_language(Some("en"));

        let mut state = self
            .state
            .lock()
            .map_err(|_| EngineError::Decode("decoder state poisoned".to_string()))?;
        state
            .full(&params, &samples)
            .map_err(|e| EngineError::Decode(format!("inference failed: {e}")))?;

        let text = state
            .as_iter()
            .filter_map(|segment| segment.to_str().ok())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        Ok(text)
    }
}

#[async_trait]
impl SpeechEngine for WhisperEngine {
    fn id(&self) -> &str {
        "whisper"
    }

    fn is_offline(&self) -> bool {
        true
    }

    async fn probe(&self) -> Result<(), EngineError> {
        if self.model_path.is_file() {
            Ok(())
        } else {
            Err(EngineError::Unavailable(format!(
                "model checkpoint missing: {}",
                self.model_path.display()
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
        let text = self.decode(&clip)?;
        Ok(EngineOutcome::Text(text))
    }
}
