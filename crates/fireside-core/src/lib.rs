//! # Fireside Core
//!
//! Shared foundation for the Fireside story companion: the bounded
//! conversation memory used as LLM context, the prompt builders for the
//! story-guide persona, the Ollama gateway with typed replies, the
//! append-only transcript log, and environment-driven configuration.
//!
//! Speech capture and recognition live in `fireside-voice`; the turn state
//! machine lives in `fireside-app`.

pub mod config;
pub mod llm;
pub mod memory;
pub mod prompts;
pub mod transcript;

pub use config::{LlmConfig, ListenSettings, RetrySettings, SessionConfig, SttConfig};
pub use llm::{parse_reply, DialogueLlm, LlmError, LlmReply, OllamaGateway, ReplyKind};
pub use memory::{ConversationMemory, Speaker, Utterance, UtteranceKind};
pub use transcript::{LogTag, TranscriptLog};
