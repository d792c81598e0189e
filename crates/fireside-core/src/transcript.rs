//! Append-only conversation transcript.
//!
//! Every turn writes timestamped `[ISO8601] [TAG] message` lines; the whole
//! log is flushed to a file when the session ends. Rotation and long-term
//! storage belong to the operator, not to this crate.

use chrono::Utc;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Entry tags mirroring the spoken/system split of the conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTag {
    System,
    Prompt,
    User,
    Agent,
}

impl LogTag {
    fn as_str(self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Prompt => "SYSTEM_PROMPT",
            LogTag::User => "USER",
            LogTag::Agent => "AGENT",
        }
    }
}

/// In-memory transcript, saved once per session.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    entries: Vec<String>,
}

impl TranscriptLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one timestamped entry.
    pub fn append(&mut self, tag: LogTag, message: &str) {
        self.entries.push(format!(
            "[{}] [{}] {}",
            Utc::now().to_rfc3339(),
            tag.as_str(),
            message
        ));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the transcript to `dir/conversation_log_{timestamp}.txt`.
    /// An empty log writes nothing and returns `None`.
    pub fn save_to(&self, dir: &Path) -> io::Result<Option<PathBuf>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        fs::create_dir_all(dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("conversation_log_{stamp}.txt"));
        let mut body = self.entries.join("\n");
        body.push('\n');
        fs::write(&path, body)?;
        info!(path = %path.display(), entries = self.entries.len(), "conversation log saved");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_carry_tag_and_timestamp() {
        let mut log = TranscriptLog::new();
        log.append(LogTag::User, "hello there");
        let line = &log.entries()[0];
        assert!(line.contains("[USER] hello there"));
        // RFC 3339 timestamps start with the year inside brackets.
        assert!(line.starts_with('['));
    }

    #[test]
    fn saves_to_a_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = TranscriptLog::new();
        log.append(LogTag::System, "session started");
        log.append(LogTag::Agent, "Welcome!");

        let path = log.save_to(dir.path()).unwrap().expect("file written");
        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body.lines().count(), 2);
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("conversation_log_"));
    }

    #[test]
    fn empty_log_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = TranscriptLog::new();
        assert!(log.save_to(dir.path()).unwrap().is_none());
    }
}
