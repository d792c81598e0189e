//! # Fireside App
//!
//! Top of the stack: the conversation turn state machine, the session loop
//! over story themes, and the speech sink seam used to deliver the
//! companion's lines. The `fireside` binary wires these to real devices and
//! backends; tests wire them to scripted ones.

pub mod session;
pub mod sink;
pub mod turn;

pub use session::{SessionRunner, SessionSummary};
pub use sink::{ConsoleSink, SpeechSink};
pub use turn::{SessionError, TurnController, TurnOutcome, TurnState};
