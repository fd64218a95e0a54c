//! Custom event types for TUI application.

use crossterm::event::KeyEvent;

use crate::execution::{Language, Outcome};

/// Events that can occur in the TUI application
#[derive(Debug)]
pub enum TuiEvent {
    /// User keyboard input
    Key(KeyEvent),
    /// Bracketed paste content
    Paste(String),
    /// Terminal was resized
    Resize,
    /// A run finished; the language is the one the run started with
    ExecutionFinished { language: Language, outcome: Outcome },
    /// Request to quit the application
    Quit,
}
