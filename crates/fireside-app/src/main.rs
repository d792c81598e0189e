//! The `fireside` binary: assemble engines, microphone, gateway and session
//! from the environment, then run one full conversation.

use anyhow::{bail, Context};
use fireside_app::{ConsoleSink, SessionRunner, TurnController};
use fireside_core::config::SessionConfig;
use fireside_core::llm::{DialogueLlm, OllamaGateway};
use fireside_voice::audio::{AudioFormat, CpalDevice};
use fireside_voice::command::CommandInterpreter;
use fireside_voice::engine::{CloudEngine, SpeechEngine};
use fireside_voice::gate::WebRtcGate;
use fireside_voice::hybrid::{EnginePreference, HybridRecognizer};
use fireside_voice::listener::{ListenWindow, Microphone, SilencePolicy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SessionConfig::from_env();
    info!(model = %config.llm.model, themes = config.themes.len(), "starting fireside");

    let engines = build_engines(&config);
    if engines.is_empty() {
        bail!(
            "no speech engines configured; set FIRESIDE_STT_URL and FIRESIDE_STT_KEY, \
             or enable an offline engine feature with its model path"
        );
    }

    let format = AudioFormat::default();
    let device = CpalDevice::new(format).context("audio input device")?;
    let gate = WebRtcGate::factory(format.sample_rate, 2).context("speech gate")?;
    let microphone = Arc::new(Microphone::new(
        Arc::new(device),
        gate,
        SilencePolicy {
            gap: Duration::from_millis(config.listen.silence_gap_ms),
            min_speech: Duration::from_millis(config.listen.min_speech_ms),
        },
    ));
    let window = ListenWindow {
        max_wait_for_start: Duration::from_millis(config.listen.wait_for_start_ms),
        max_listen_duration: Duration::from_millis(config.listen.max_listen_ms),
    };

    let preference = if config.prefer_offline {
        EnginePreference::OfflineFirst
    } else {
        EnginePreference::OnlineFirst
    };
    let recognizer = Arc::new(HybridRecognizer::new(
        engines,
        preference,
        CommandInterpreter::default(),
    ));
    for (engine, healthy) in recognizer.probe_all().await {
        info!(engine, healthy, "engine probed");
    }

    let gateway: Arc<dyn DialogueLlm> =
        Arc::new(OllamaGateway::new(config.llm.clone()).context("ollama gateway")?);

    let controller = TurnController::new(
        recognizer,
        microphone,
        Arc::clone(&gateway),
        window,
        config.retries,
    );
    let mut runner = SessionRunner::new(controller, gateway, config);
    let mut sink = ConsoleSink;

    let summary = runner.run(&mut sink).await?;
    info!(
        themes = summary.themes_covered,
        turns = summary.turns,
        log = ?summary.log_path,
        "session complete"
    );
    Ok(())
}

fn build_engines(config: &SessionConfig) -> Vec<Arc<dyn SpeechEngine>> {
    let mut engines: Vec<Arc<dyn SpeechEngine>> = Vec::new();

    if let (Some(url), Some(key)) = (&config.stt.cloud_base_url, &config.stt.cloud_api_key) {
        match CloudEngine::new(url, key, &config.stt.cloud_model) {
            Ok(engine) => {
                engines.push(Arc::new(engine));
                info!("cloud transcription engine registered");
            }
            Err(e) => warn!(error = %e, "cloud engine unavailable"),
        }
    }

    #[cfg(feature = "vosk")]
    if let Some(dir) = &config.stt.vosk_model_dir {
        match fireside_voice::engine::VoskEngine::new(dir) {
            Ok(engine) => {
                engines.push(Arc::new(engine));
                info!("vosk engine registered");
            }
            Err(e) => warn!(error = %e, "vosk engine unavailable"),
        }
    }

    #[cfg(feature = "whisper")]
    if let Some(path) = &config.stt.whisper_model_path {
        match fireside_voice::engine::WhisperEngine::new(path) {
            Ok(engine) => {
                engines.push(Arc::new(engine));
                info!("whisper engine registered");
            }
            Err(e) => warn!(error = %e, "whisper engine unavailable"),
        }
    }

    #[cfg(not(any(feature = "vosk", feature = "whisper")))]
    {
        if config.stt.vosk_model_dir.is_some() || config.stt.whisper_model_path.is_some() {
            warn!("offline model paths are set but no offline engine feature is enabled");
        }
    }

    engines
}
