//! Short-term conversation memory: a bounded, chronological log of utterances.
//!
//! The memory is the only conversational context handed to the LLM. It is
//! mutated exclusively by the turn controller; the gateway reads it through
//! `format_for_prompt`. Oldest entries are evicted first once capacity is hit.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Who produced an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Agent,
}

/// What role the utterance plays in the dialogue. Prompt formatting renders
/// agent questions and comments differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceKind {
    Question,
    Answer,
    Comment,
}

/// One immutable entry in the conversation. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub speaker: Speaker,
    pub kind: UtteranceKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Utterance {
    pub fn new(speaker: Speaker, kind: UtteranceKind, text: impl Into<String>) -> Self {
        Self {
            speaker,
            kind,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user_answer(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, UtteranceKind::Answer, text)
    }

    pub fn agent_question(text: impl Into<String>) -> Self {
        Self::new(Speaker::Agent, UtteranceKind::Question, text)
    }

    pub fn agent_comment(text: impl Into<String>) -> Self {
        Self::new(Speaker::Agent, UtteranceKind::Comment, text)
    }
}

/// Capacity-bounded conversation history, oldest entries dropped first.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    entries: VecDeque<Utterance>,
    capacity: usize,
}

impl ConversationMemory {
    /// Create a memory holding at most `capacity` utterances.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
        }
    }

    /// Append an utterance, evicting the oldest entry if the window is full.
    /// Empty text is ignored.
    pub fn push(&mut self, utterance: Utterance) {
        if utterance.text.trim().is_empty() {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(utterance);
    }

    /// Chronological iteration, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Utterance> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Render the history block used in every LLM prompt.
    pub fn format_for_prompt(&self) -> String {
        if self.entries.is_empty() {
            return "This is the beginning of our conversation.".to_string();
        }
        let mut out = String::from("Here's a summary of our recent conversation:\n");
        for entry in &self.entries {
            match (entry.speaker, entry.kind) {
                (Speaker::Agent, UtteranceKind::Question) => {
                    out.push_str(&format!("I (the story guide) asked: \"{}\"\n", entry.text));
                }
                (Speaker::Agent, _) => {
                    out.push_str(&format!("I (the story guide) then said: \"{}\"\n", entry.text));
                }
                (Speaker::User, _) => {
                    out.push_str(&format!("You (the user) responded: \"{}\"\n", entry.text));
                }
            }
        }
        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_most_recent_entries_in_order() {
        let mut memory = ConversationMemory::new(3);
        for i in 0..7 {
            memory.push(Utterance::user_answer(format!("answer {i}")));
        }
        assert_eq!(memory.len(), 3);
        let texts: Vec<_> = memory.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["answer 4", "answer 5", "answer 6"]);
    }

    #[test]
    fn ignores_blank_utterances() {
        let mut memory = ConversationMemory::new(4);
        memory.push(Utterance::user_answer("   "));
        assert!(memory.is_empty());
    }

    #[test]
    fn prompt_formatting_distinguishes_roles() {
        let mut memory = ConversationMemory::new(8);
        memory.push(Utterance::agent_question("What happened next?"));
        memory.push(Utterance::user_answer("I missed the train."));
        memory.push(Utterance::agent_comment("That sounds stressful."));

        let rendered = memory.format_for_prompt();
        assert!(rendered.contains("asked: \"What happened next?\""));
        assert!(rendered.contains("responded: \"I missed the train.\""));
        assert!(rendered.contains("then said: \"That sounds stressful.\""));
    }

    #[test]
    fn empty_memory_has_a_neutral_preamble() {
        let memory = ConversationMemory::new(4);
        assert_eq!(
            memory.format_for_prompt(),
            "This is the beginning of our conversation."
        );
    }
}
