//! The session loop: greeting, one block of turns per story theme, farewell,
//! and the saved transcript.

use crate::sink::SpeechSink;
use crate::turn::{SessionError, TurnController, TurnOutcome};
use fireside_core::config::SessionConfig;
use fireside_core::llm::{DialogueLlm, ReplyKind};
use fireside_core::memory::{ConversationMemory, Utterance};
use fireside_core::transcript::{LogTag, TranscriptLog};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const GREETING: &str =
    "Hello! I'm so glad you're here. I'd love to hear some of your stories today.";
const FAREWELL: &str =
    "Thank you so much for sharing your stories with me today. Goodbye for now.";

/// What a finished session looked like.
#[derive(Debug)]
pub struct SessionSummary {
    pub themes_covered: usize,
    pub turns: usize,
    pub log_path: Option<PathBuf>,
}

/// Drives a whole conversation: themes in order, bounded follow-ups per
/// theme, transcript saved at the end even when the session dies early.
pub struct SessionRunner {
    controller: TurnController,
    llm: Arc<dyn DialogueLlm>,
    config: SessionConfig,
}

impl SessionRunner {
    pub fn new(controller: TurnController, llm: Arc<dyn DialogueLlm>, config: SessionConfig) -> Self {
        Self {
            controller,
            llm,
            config,
        }
    }

    pub async fn run(&mut self, sink: &mut dyn SpeechSink) -> Result<SessionSummary, SessionError> {
        let mut memory = ConversationMemory::new(self.config.memory_capacity);
        let mut log = TranscriptLog::new();

        log.append(LogTag::System, "session started");
        sink.deliver(GREETING);
        log.append(LogTag::Agent, GREETING);
        memory.push(Utterance::agent_comment(GREETING));

        let result = self.run_themes(&mut memory, &mut log, sink).await;

        match &result {
            Ok(_) => {
                sink.deliver(FAREWELL);
                log.append(LogTag::Agent, FAREWELL);
                log.append(LogTag::System, "session finished");
            }
            Err(e) => {
                log.append(LogTag::System, &format!("session aborted: {e}"));
            }
        }

        let log_path = match log.save_to(&self.config.log_dir) {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "failed to save the conversation log");
                None
            }
        };

        let (themes_covered, turns) = result?;
        Ok(SessionSummary {
            themes_covered,
            turns,
            log_path,
        })
    }

    async fn run_themes(
        &mut self,
        memory: &mut ConversationMemory,
        log: &mut TranscriptLog,
        sink: &mut dyn SpeechSink,
    ) -> Result<(usize, usize), SessionError> {
        let themes = self.config.themes.clone();
        let mut themes_covered = 0usize;
        let mut turns = 0usize;

        for theme in &themes {
            info!(theme, "starting a new story theme");
            log.append(LogTag::System, &format!("theme: {theme}"));

            let mut question = match self.llm.formulate_question(theme, memory).await {
                Ok(question) => question,
                Err(e) => {
                    warn!(error = %e, "opening question generation failed, using fallback");
                    format!("I'd love to hear about this: {theme}. Where would you like to begin?")
                }
            };

            let mut follow_ups = 0u32;
            let mut carried_over = false;
            loop {
                let outcome = if carried_over {
                    // The follow-up was already spoken as the previous reply.
                    self.controller
                        .continue_turn(theme, &question, memory, log, sink)
                        .await?
                } else {
                    self.controller
                        .run_turn(theme, &question, memory, log, sink)
                        .await?
                };
                turns += 1;
                match outcome {
                    TurnOutcome::Answered { reply, .. } => match reply.kind {
                        ReplyKind::Question if follow_ups < self.config.max_follow_ups => {
                            follow_ups += 1;
                            question = reply.content;
                            carried_over = true;
                        }
                        ReplyKind::Question => {
                            // Budget spent; the delivered question closes the
                            // theme rather than opening another exchange.
                            log.append(LogTag::System, "follow-up budget reached");
                            break;
                        }
                        _ => break,
                    },
                    TurnOutcome::NoReply { .. } | TurnOutcome::Skipped => break,
                    TurnOutcome::Failed(e) => {
                        warn!(error = %e, theme, "recognition gave up on this question");
                        log.append(LogTag::System, &format!("question abandoned: {e}"));
                        break;
                    }
                }
            }
            themes_covered += 1;
        }
        Ok((themes_covered, turns))
    }
}
