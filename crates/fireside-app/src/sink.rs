//! Where the companion's lines go. Voice synthesis is an external
//! collaborator; the default sink just prints.

/// Delivers one agent line to the user.
pub trait SpeechSink: Send {
    fn deliver(&mut self, line: &str);
}

/// Prints lines to stdout, prefixed so they stand out from log output.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl SpeechSink for ConsoleSink {
    fn deliver(&mut self, line: &str) {
        println!("\n[guide] {line}");
    }
}

/// Captures delivered lines for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
}

impl SpeechSink for RecordingSink {
    fn deliver(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}
