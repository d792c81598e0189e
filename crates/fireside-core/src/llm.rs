//! Ollama gateway: themed prompts in, typed replies out.
//!
//! Talks to a local Ollama instance over `POST {base_url}/api/generate` with
//! `stream: false`. Replies to the follow-up prompt carry a leading
//! `QUESTION:` / `COMMENT:` marker; anything unmarked is treated as a comment.
//! Both failure modes (`Unavailable`, `Malformed`) are recoverable: callers
//! fall back to scripted phrases and the session keeps going.

use crate::config::LlmConfig;
use crate::memory::ConversationMemory;
use crate::prompts;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the language-model service. Never fatal to a session.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM service unavailable: {0}")]
    Unavailable(String),

    #[error("LLM response malformed: {0}")]
    Malformed(String),
}

/// How the model's reply steers the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// A follow-up question; the turn loop keeps digging into the theme.
    Question,
    /// An empathetic comment; the current theme is wrapped up.
    Comment,
    /// A transition phrase after the user stayed silent.
    Transition,
}

/// One typed reply from the gateway. Ephemeral; produced per call.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub kind: ReplyKind,
    pub content: String,
}

/// The seam the turn controller talks through. Implemented by [`OllamaGateway`]
/// and by scripted stand-ins in tests.
#[async_trait]
pub trait DialogueLlm: Send + Sync {
    /// Formulate an inviting opening question for a story theme.
    async fn formulate_question(
        &self,
        theme: &str,
        memory: &ConversationMemory,
    ) -> Result<String, LlmError>;

    /// After a user answer: a follow-up question or an empathetic comment.
    async fn follow_up(
        &self,
        theme: &str,
        user_answer: &str,
        memory: &ConversationMemory,
    ) -> Result<LlmReply, LlmError>;

    /// A gentle transition phrase when the user did not reply.
    async fn transition_on_no_reply(
        &self,
        question_asked: &str,
        memory: &ConversationMemory,
    ) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

/// Gateway to a local Ollama inference service.
pub struct OllamaGateway {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OllamaGateway {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// One synchronous request/response round trip to `/api/generate`.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let url = format!(
            "{}/api/generate",
            self.config.base_url.trim_end_matches('/')
        );
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                top_p: self.config.top_p,
            },
        };

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Unavailable(format!(
                "Ollama returned {status}: {text}"
            )));
        }

        let parsed: GenerateResponse = res
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(LlmError::Malformed(format!("Ollama error field: {err}")));
        }
        let text = parsed.response.trim().to_string();
        if text.is_empty() {
            return Err(LlmError::Malformed("empty response body".to_string()));
        }
        debug!(model = %self.config.model, chars = text.len(), "ollama reply received");
        Ok(text)
    }
}

/// Type a raw follow-up reply by its leading marker. No recognized marker
/// means the whole text is treated as a comment.
pub fn parse_reply(raw: &str) -> LlmReply {
    let trimmed = raw.trim();
    if let Some(rest) = strip_marker(trimmed, "QUESTION:") {
        let mut question = rest.to_string();
        if !question.ends_with('?') {
            question.push('?');
        }
        return LlmReply {
            kind: ReplyKind::Question,
            content: question,
        };
    }
    if let Some(rest) = strip_marker(trimmed, "COMMENT:") {
        return LlmReply {
            kind: ReplyKind::Comment,
            content: rest.to_string(),
        };
    }
    LlmReply {
        kind: ReplyKind::Comment,
        content: trimmed.to_string(),
    }
}

/// Case-insensitive marker strip; returns the remainder on a match.
fn strip_marker<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let head = text.get(..marker.len())?;
    if head.eq_ignore_ascii_case(marker) {
        Some(text[marker.len()..].trim())
    } else {
        None
    }
}

#[async_trait]
impl DialogueLlm for OllamaGateway {
    async fn formulate_question(
        &self,
        theme: &str,
        memory: &ConversationMemory,
    ) -> Result<String, LlmError> {
        let prompt = prompts::opening_question(theme, memory);
        let mut question = self
            .generate(&prompt, self.config.question_temperature)
            .await?;
        if !question.ends_with('?') {
            question = format!("{}?", question.trim_end_matches(['.', ',']));
        }
        Ok(question)
    }

    async fn follow_up(
        &self,
        theme: &str,
        user_answer: &str,
        memory: &ConversationMemory,
    ) -> Result<LlmReply, LlmError> {
        let prompt = prompts::follow_up(theme, user_answer, memory);
        let raw = self
            .generate(&prompt, self.config.follow_up_temperature)
            .await?;
        let reply = parse_reply(&raw);
        if reply.content == raw.trim() && reply.kind == ReplyKind::Comment {
            warn!("follow-up reply carried no QUESTION:/COMMENT: marker; treating as comment");
        }
        Ok(reply)
    }

    async fn transition_on_no_reply(
        &self,
        question_asked: &str,
        memory: &ConversationMemory,
    ) -> Result<String, LlmError> {
        let prompt = prompts::no_reply_transition(question_asked, memory);
        let phrase = self
            .generate(&prompt, self.config.transition_temperature)
            .await?;
        // Some models echo a marker even when told not to.
        let phrase = strip_marker(&phrase, "COMMENT:").unwrap_or(&phrase);
        Ok(phrase.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_marker_is_parsed_and_terminated() {
        let reply = parse_reply("QUESTION: what made you smile that day");
        assert_eq!(reply.kind, ReplyKind::Question);
        assert_eq!(reply.content, "what made you smile that day?");
    }

    #[test]
    fn comment_marker_is_parsed() {
        let reply = parse_reply("COMMENT: That sounds like a wonderful afternoon.");
        assert_eq!(reply.kind, ReplyKind::Comment);
        assert_eq!(reply.content, "That sounds like a wonderful afternoon.");
    }

    #[test]
    fn markers_are_case_insensitive() {
        let reply = parse_reply("question: and then?");
        assert_eq!(reply.kind, ReplyKind::Question);
        assert_eq!(reply.content, "and then?");
    }

    #[test]
    fn unmarked_reply_defaults_to_comment_with_raw_text() {
        let raw = "That is a lovely memory to hold onto.";
        let reply = parse_reply(raw);
        assert_eq!(reply.kind, ReplyKind::Comment);
        assert_eq!(reply.content, raw);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let reply = parse_reply("  COMMENT:   tidy   ");
        assert_eq!(reply.kind, ReplyKind::Comment);
        assert_eq!(reply.content, "tidy");
    }
}
