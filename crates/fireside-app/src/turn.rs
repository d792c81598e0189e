//! One prompt-listen-respond exchange.
//!
//! The controller owns the turn state machine: deliver the question, wait
//! for an answer through the hybrid recognizer, route control phrases, then
//! consult the LLM and record both sides in memory and the transcript log.
//! LLM failures fall back to scripted phrases; only microphone loss is fatal.

use crate::sink::SpeechSink;
use fireside_core::config::RetrySettings;
use fireside_core::llm::{DialogueLlm, LlmReply, ReplyKind};
use fireside_core::memory::{ConversationMemory, Utterance};
use fireside_core::transcript::{LogTag, TranscriptLog};
use fireside_voice::error::{DeviceError, ListenError};
use fireside_voice::hybrid::{HybridRecognizer, Recognition};
use fireside_voice::listener::{ListenWindow, Microphone};
use fireside_voice::ControlCommand;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Spoken when the model cannot produce a follow-up.
const FALLBACK_COMMENT: &str = "Thank you for sharing that with me.";
/// Spoken when the user stayed silent and the model is unreachable.
const FALLBACK_TRANSITION: &str =
    "That's alright, we can always come back to this another time.";
/// Spoken between recognition retries.
const TROUBLE_HEARING: &str = "I'm having a little trouble hearing you. Let's try once more.";

/// Where the controller is inside the current exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingSpeech,
    Generating,
}

/// How one exchange ended. `Failed` is not fatal; the session decides what
/// to do with the question.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The user answered and the agent replied.
    Answered { answer: String, reply: LlmReply },
    /// The user stayed silent (or nothing decoded); a transition was spoken.
    NoReply { transition: String },
    /// The user asked to move on.
    Skipped,
    /// Recognition kept failing within the retry budget.
    Failed(ListenError),
}

/// Fatal errors that end the whole session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Device(#[from] DeviceError),
}

pub struct TurnController {
    recognizer: Arc<HybridRecognizer>,
    microphone: Arc<Microphone>,
    llm: Arc<dyn DialogueLlm>,
    window: ListenWindow,
    retries: RetrySettings,
    state: TurnState,
}

impl TurnController {
    pub fn new(
        recognizer: Arc<HybridRecognizer>,
        microphone: Arc<Microphone>,
        llm: Arc<dyn DialogueLlm>,
        window: ListenWindow,
        retries: RetrySettings,
    ) -> Self {
        Self {
            recognizer,
            microphone,
            llm,
            window,
            retries,
            state: TurnState::Idle,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Run one full exchange for a freshly posed `question` under `theme`.
    pub async fn run_turn(
        &mut self,
        theme: &str,
        question: &str,
        memory: &mut ConversationMemory,
        log: &mut TranscriptLog,
        sink: &mut dyn SpeechSink,
    ) -> Result<TurnOutcome, SessionError> {
        sink.deliver(question);
        log.append(LogTag::Agent, question);
        memory.push(Utterance::agent_question(question));
        self.exchange(theme, question, memory, log, sink).await
    }

    /// Run an exchange for a follow-up question the agent has already spoken
    /// and recorded as the previous turn's reply.
    pub async fn continue_turn(
        &mut self,
        theme: &str,
        question: &str,
        memory: &mut ConversationMemory,
        log: &mut TranscriptLog,
        sink: &mut dyn SpeechSink,
    ) -> Result<TurnOutcome, SessionError> {
        self.exchange(theme, question, memory, log, sink).await
    }

    async fn exchange(
        &mut self,
        theme: &str,
        question: &str,
        memory: &mut ConversationMemory,
        log: &mut TranscriptLog,
        sink: &mut dyn SpeechSink,
    ) -> Result<TurnOutcome, SessionError> {
        let mut repeats = 0u32;
        let mut listen_failures = 0u32;

        loop {
            self.state = TurnState::AwaitingSpeech;
            match self.recognizer.listen(&self.microphone, self.window).await {
                Ok(Recognition::Transcript(answer)) => {
                    self.state = TurnState::Generating;
                    info!(chars = answer.len(), "answer transcribed");
                    log.append(LogTag::User, &answer);
                    memory.push(Utterance::user_answer(&answer));

                    let reply = match self.llm.follow_up(theme, &answer, memory).await {
                        Ok(reply) => reply,
                        Err(e) => {
                            warn!(error = %e, "follow-up generation failed, using fallback");
                            LlmReply {
                                kind: ReplyKind::Comment,
                                content: FALLBACK_COMMENT.to_string(),
                            }
                        }
                    };
                    let utterance = match reply.kind {
                        ReplyKind::Question => Utterance::agent_question(&reply.content),
                        _ => Utterance::agent_comment(&reply.content),
                    };
                    memory.push(utterance);
                    log.append(LogTag::Agent, &reply.content);
                    sink.deliver(&reply.content);
                    self.state = TurnState::Idle;
                    return Ok(TurnOutcome::Answered { answer, reply });
                }
                Ok(Recognition::Command(ControlCommand::Repeat)) => {
                    repeats += 1;
                    if repeats > self.retries.max_repeats {
                        info!("repeat budget exhausted, treating as no reply");
                        return self.no_reply(question, memory, log, sink).await;
                    }
                    info!(repeats, "repeating the question");
                    log.append(LogTag::System, "user asked for the question again");
                    sink.deliver(question);
                }
                Ok(Recognition::Command(ControlCommand::Skip)) => {
                    info!("user skipped the question");
                    log.append(LogTag::System, "user skipped the question");
                    self.state = TurnState::Idle;
                    return Ok(TurnOutcome::Skipped);
                }
                Ok(Recognition::Empty) => {
                    return self.no_reply(question, memory, log, sink).await;
                }
                Err(ListenError::Device(e)) => {
                    self.state = TurnState::Idle;
                    return Err(e.into());
                }
                Err(e @ ListenError::NoEngines) => {
                    self.state = TurnState::Idle;
                    return Ok(TurnOutcome::Failed(e));
                }
                Err(e) => {
                    listen_failures += 1;
                    warn!(error = %e, listen_failures, "listen attempt failed");
                    if listen_failures >= self.retries.max_listen_failures {
                        self.state = TurnState::Idle;
                        return Ok(TurnOutcome::Failed(e));
                    }
                    log.append(LogTag::System, &format!("recognition failed: {e}"));
                    sink.deliver(TROUBLE_HEARING);
                }
            }
        }
    }

    /// The user said nothing usable: speak a transition and close the turn.
    async fn no_reply(
        &mut self,
        question: &str,
        memory: &mut ConversationMemory,
        log: &mut TranscriptLog,
        sink: &mut dyn SpeechSink,
    ) -> Result<TurnOutcome, SessionError> {
        self.state = TurnState::Generating;
        let transition = match self.llm.transition_on_no_reply(question, memory).await {
            Ok(phrase) => phrase,
            Err(e) => {
                warn!(error = %e, "transition generation failed, using fallback");
                FALLBACK_TRANSITION.to_string()
            }
        };
        memory.push(Utterance::agent_comment(&transition));
        log.append(LogTag::System, "no reply from the user");
        log.append(LogTag::Agent, &transition);
        sink.deliver(&transition);
        self.state = TurnState::Idle;
        Ok(TurnOutcome::NoReply { transition })
    }
}
