//! End-to-end recognition over a scripted audio device: capture through the
//! microphone, endpointing through the energy gate, then hybrid fallback.

use async_trait::async_trait;
use fireside_voice::{
    CommandInterpreter, EngineError, EngineOutcome, EnginePreference, EnergyGate, Heard,
    HybridRecognizer, ListenWindow, Microphone, Recognition, ScriptedDevice, SilencePolicy,
    SpeechEngine,
};
use std::sync::Arc;
use std::time::Duration;

/// A fake backend that really records through the microphone, then "decodes"
/// the clip to a canned transcript.
struct EchoEngine {
    transcript: String,
}

#[async_trait]
impl SpeechEngine for EchoEngine {
    fn id(&self) -> &str {
        "echo"
    }

    fn is_offline(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        microphone: &Microphone,
        window: ListenWindow,
    ) -> Result<EngineOutcome, EngineError> {
        match microphone.capture(window).await? {
            Heard::Speech(clip) => {
                assert!(!clip.samples.is_empty());
                Ok(EngineOutcome::Text(self.transcript.clone()))
            }
            Heard::Nothing => Ok(EngineOutcome::NoSpeech),
        }
    }
}

fn microphone(device: ScriptedDevice) -> Microphone {
    let silence = SilencePolicy {
        gap: Duration::from_millis(60),
        min_speech: Duration::from_millis(20),
    };
    Microphone::new(Arc::new(device), EnergyGate::factory(1_000), silence)
}

fn window() -> ListenWindow {
    ListenWindow {
        max_wait_for_start: Duration::from_millis(200),
        max_listen_duration: Duration::from_secs(5),
    }
}

fn recognizer(engines: Vec<Arc<dyn SpeechEngine>>) -> HybridRecognizer {
    HybridRecognizer::new(
        engines,
        EnginePreference::OnlineFirst,
        CommandInterpreter::default(),
    )
}

#[tokio::test]
async fn spoken_answer_flows_through_the_whole_pipeline() {
    let mic = microphone(ScriptedDevice::speaking(20, Duration::from_millis(1)));
    let recognizer = recognizer(vec![Arc::new(EchoEngine {
        transcript: "it was the summer my sister moved away".to_string(),
    })]);

    let result = recognizer.listen(&mic, window()).await.unwrap();
    assert_eq!(
        result,
        Recognition::Transcript("it was the summer my sister moved away".to_string())
    );
}

#[tokio::test]
async fn silence_resolves_to_empty_without_engine_fallback() {
    let mic = microphone(ScriptedDevice::silent(Duration::from_millis(2)));
    let recognizer = recognizer(vec![
        Arc::new(EchoEngine {
            transcript: "never produced".to_string(),
        }),
        Arc::new(EchoEngine {
            transcript: "never produced either".to_string(),
        }),
    ]);

    let result = recognizer.listen(&mic, window()).await.unwrap();
    assert_eq!(result, Recognition::Empty);
}

#[tokio::test]
async fn spoken_command_is_interpreted_before_being_treated_as_an_answer() {
    let mic = microphone(ScriptedDevice::speaking(20, Duration::from_millis(1)));
    let recognizer = recognizer(vec![Arc::new(EchoEngine {
        transcript: "could you repeat that question".to_string(),
    })]);

    let result = recognizer.listen(&mic, window()).await.unwrap();
    assert_eq!(
        result,
        Recognition::Command(fireside_voice::ControlCommand::Repeat)
    );
}

#[tokio::test]
async fn device_is_released_between_fallback_attempts() {
    // A failing engine records first; the next engine must be able to reopen
    // the device for its own attempt.
    struct FailAfterCapture;

    #[async_trait]
    impl SpeechEngine for FailAfterCapture {
        fn id(&self) -> &str {
            "flaky"
        }
        fn is_offline(&self) -> bool {
            false
        }
        async fn transcribe(
            &self,
            microphone: &Microphone,
            window: ListenWindow,
        ) -> Result<EngineOutcome, EngineError> {
            let _ = microphone.capture(window).await?;
            Err(EngineError::Unavailable("backend offline".to_string()))
        }
    }

    let device = Arc::new(ScriptedDevice::speaking(20, Duration::from_millis(1)));
    let silence = SilencePolicy {
        gap: Duration::from_millis(60),
        min_speech: Duration::from_millis(20),
    };
    let mic = Microphone::new(
        Arc::clone(&device) as Arc<dyn fireside_voice::AudioDevice>,
        EnergyGate::factory(1_000),
        silence,
    );
    let recognizer = recognizer(vec![
        Arc::new(FailAfterCapture),
        Arc::new(EchoEngine {
            transcript: "second try worked".to_string(),
        }),
    ]);

    let result = recognizer.listen(&mic, window()).await.unwrap();
    assert_eq!(
        result,
        Recognition::Transcript("second try worked".to_string())
    );
    assert_eq!(device.opens(), 2);
}
