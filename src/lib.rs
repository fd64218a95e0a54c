//! Terminal code playground: run JavaScript, Python and HTML snippets.

pub mod cli;
pub mod config;
pub mod execution;
pub mod printer;
pub mod process;
pub mod state;
pub mod theme;
pub mod tui;
pub mod utils;
