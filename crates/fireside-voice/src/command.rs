//! Spoken control phrases, matched before a transcript is treated as an
//! answer.

/// Session controls the user can speak instead of answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Say the current question again.
    Repeat,
    /// Abandon the current question and move on.
    Skip,
}

/// Case-insensitive substring matcher over known phrase lists.
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    repeat_phrases: Vec<String>,
    skip_phrases: Vec<String>,
}

impl Default for CommandInterpreter {
    fn default() -> Self {
        Self {
            repeat_phrases: vec![
                "repeat question".to_string(),
                "repeat that".to_string(),
                "say that again".to_string(),
            ],
            skip_phrases: vec![
                "skip question".to_string(),
                "skip that".to_string(),
                "next question".to_string(),
            ],
        }
    }
}

impl CommandInterpreter {
    pub fn with_phrases(repeat: Vec<String>, skip: Vec<String>) -> Self {
        Self {
            repeat_phrases: repeat.into_iter().map(|p| p.to_lowercase()).collect(),
            skip_phrases: skip.into_iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Repeat is checked before skip so a transcript mentioning both repeats.
    pub fn interpret(&self, transcript: &str) -> Option<ControlCommand> {
        let lowered = transcript.to_lowercase();
        if self.repeat_phrases.iter().any(|p| lowered.contains(p.as_str())) {
            return Some(ControlCommand::Repeat);
        }
        if self.skip_phrases.iter().any(|p| lowered.contains(p.as_str())) {
            return Some(ControlCommand::Skip);
        }
        None
    }
}
