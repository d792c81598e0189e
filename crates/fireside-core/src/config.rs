//! Session configuration loaded from the environment.
//!
//! Every timing value and retry bound is a deployment knob, not a constant.
//! The binary loads `.env` via dotenvy before calling `SessionConfig::from_env`.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | FIRESIDE_OLLAMA_URL | http://localhost:11434 | Ollama base URL. |
//! | FIRESIDE_OLLAMA_MODEL | gemma3 | Model name passed to `/api/generate`. |
//! | FIRESIDE_OLLAMA_TIMEOUT_SECS | 60 | Request timeout for the gateway. |
//! | FIRESIDE_WAIT_FOR_START_MS | 7000 | How long to wait for speech onset. |
//! | FIRESIDE_MAX_LISTEN_MS | 20000 | Hard cap on one listening window. |
//! | FIRESIDE_SILENCE_GAP_MS | 2000 | Silence after speech that ends capture. |
//! | FIRESIDE_MIN_SPEECH_MS | 200 | Clips shorter than this are dropped. |
//! | FIRESIDE_PREFER_OFFLINE | false | Try offline engines before the cloud. |
//! | FIRESIDE_MEMORY_CAPACITY | 12 | Utterances kept as prompt context. |
//! | FIRESIDE_MAX_FOLLOW_UPS | 3 | Follow-up questions per theme. |
//! | FIRESIDE_MAX_REPEATS | 2 | "repeat question" loops per question. |
//! | FIRESIDE_MAX_LISTEN_FAILURES | 2 | Full-fallback failures before giving up. |
//! | FIRESIDE_LOG_DIR | conversation_logs | Where transcripts are saved. |
//! | FIRESIDE_STT_URL / _KEY / _MODEL | — | Cloud transcription endpoint. |
//! | FIRESIDE_VOSK_MODEL_DIR | — | Offline statistical model directory. |
//! | FIRESIDE_WHISPER_MODEL_PATH | — | Offline neural model checkpoint. |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Gateway settings for the Ollama service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub question_temperature: f32,
    pub follow_up_temperature: f32,
    pub transition_temperature: f32,
    pub top_p: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "gemma3".to_string(),
            timeout_secs: 60,
            question_temperature: 0.85,
            follow_up_temperature: 0.8,
            transition_temperature: 0.7,
            top_p: 0.9,
        }
    }
}

/// Timing policy for one listen attempt, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListenSettings {
    /// Wait this long for speech onset before reporting no speech.
    pub wait_for_start_ms: u64,
    /// Forcibly end capture this long after onset.
    pub max_listen_ms: u64,
    /// Silence gap after speech that ends capture early.
    pub silence_gap_ms: u64,
    /// Clips shorter than this are treated as no speech.
    pub min_speech_ms: u64,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            wait_for_start_ms: 7_000,
            max_listen_ms: 20_000,
            silence_gap_ms: 2_000,
            min_speech_ms: 200,
        }
    }
}

/// Retry bounds for the turn controller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetrySettings {
    /// "repeat question" loops allowed per question.
    pub max_repeats: u32,
    /// Aggregate recognition failures tolerated before ending the question.
    pub max_listen_failures: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_repeats: 2,
            max_listen_failures: 2,
        }
    }
}

/// Speech-to-text backend locations. Absent values disable the adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SttConfig {
    pub cloud_base_url: Option<String>,
    pub cloud_api_key: Option<String>,
    pub cloud_model: String,
    pub vosk_model_dir: Option<PathBuf>,
    pub whisper_model_path: Option<PathBuf>,
}

/// Everything a session needs, assembled from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub llm: LlmConfig,
    pub listen: ListenSettings,
    pub retries: RetrySettings,
    pub stt: SttConfig,
    pub prefer_offline: bool,
    pub memory_capacity: usize,
    pub max_follow_ups: u32,
    pub log_dir: PathBuf,
    pub themes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            listen: ListenSettings::default(),
            retries: RetrySettings::default(),
            stt: SttConfig {
                cloud_model: "whisper-1".to_string(),
                ..SttConfig::default()
            },
            prefer_offline: false,
            memory_capacity: 12,
            max_follow_ups: 3,
            log_dir: PathBuf::from("conversation_logs"),
            themes: default_themes(),
        }
    }
}

fn default_themes() -> Vec<String> {
    vec![
        "A time you experienced a particularly strong emotion and what led to it".to_string(),
        "A significant learning experience or a piece of wisdom you gained, and the story behind it"
            .to_string(),
    ]
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_string(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_string(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_string(key).as_deref() {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        _ => default,
    }
}

impl SessionConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            llm: LlmConfig {
                base_url: env_string("FIRESIDE_OLLAMA_URL").unwrap_or(defaults.llm.base_url),
                model: env_string("FIRESIDE_OLLAMA_MODEL").unwrap_or(defaults.llm.model),
                timeout_secs: env_u64("FIRESIDE_OLLAMA_TIMEOUT_SECS", defaults.llm.timeout_secs),
                ..defaults.llm
            },
            listen: ListenSettings {
                wait_for_start_ms: env_u64(
                    "FIRESIDE_WAIT_FOR_START_MS",
                    defaults.listen.wait_for_start_ms,
                ),
                max_listen_ms: env_u64("FIRESIDE_MAX_LISTEN_MS", defaults.listen.max_listen_ms),
                silence_gap_ms: env_u64("FIRESIDE_SILENCE_GAP_MS", defaults.listen.silence_gap_ms),
                min_speech_ms: env_u64("FIRESIDE_MIN_SPEECH_MS", defaults.listen.min_speech_ms),
            },
            retries: RetrySettings {
                max_repeats: env_u32("FIRESIDE_MAX_REPEATS", defaults.retries.max_repeats),
                max_listen_failures: env_u32(
                    "FIRESIDE_MAX_LISTEN_FAILURES",
                    defaults.retries.max_listen_failures,
                ),
            },
            stt: SttConfig {
                cloud_base_url: env_string("FIRESIDE_STT_URL"),
                cloud_api_key: env_string("FIRESIDE_STT_KEY"),
                cloud_model: env_string("FIRESIDE_STT_MODEL").unwrap_or(defaults.stt.cloud_model),
                vosk_model_dir: env_string("FIRESIDE_VOSK_MODEL_DIR").map(PathBuf::from),
                whisper_model_path: env_string("FIRESIDE_WHISPER_MODEL_PATH").map(PathBuf::from),
            },
            prefer_offline: env_bool("FIRESIDE_PREFER_OFFLINE", defaults.prefer_offline),
            memory_capacity: env_u64("FIRESIDE_MEMORY_CAPACITY", defaults.memory_capacity as u64)
                as usize,
            max_follow_ups: env_u32("FIRESIDE_MAX_FOLLOW_UPS", defaults.max_follow_ups),
            log_dir: env_string("FIRESIDE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
            themes: defaults.themes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_policy() {
        let config = SessionConfig::default();
        assert_eq!(config.listen.wait_for_start_ms, 7_000);
        assert_eq!(config.listen.max_listen_ms, 20_000);
        assert_eq!(config.retries.max_repeats, 2);
        assert!(!config.prefer_offline);
        assert!(!config.themes.is_empty());
    }

    #[test]
    fn env_overrides_are_applied() {
        env::set_var("FIRESIDE_WAIT_FOR_START_MS", "1234");
        env::set_var("FIRESIDE_PREFER_OFFLINE", "true");
        let config = SessionConfig::from_env();
        assert_eq!(config.listen.wait_for_start_ms, 1234);
        assert!(config.prefer_offline);
        env::remove_var("FIRESIDE_WAIT_FOR_START_MS");
        env::remove_var("FIRESIDE_PREFER_OFFLINE");
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        env::set_var("FIRESIDE_MAX_LISTEN_MS", "not-a-number");
        let config = SessionConfig::from_env();
        assert_eq!(config.listen.max_listen_ms, 20_000);
        env::remove_var("FIRESIDE_MAX_LISTEN_MS");
    }
}
