//! Printers for headless runs: colored text or JSON.

use std::path::Path;

use owo_colors::OwoColorize;

use crate::execution::{ExecutionResult, Language, Outcome};

pub fn success_banner(language: Language) -> &'static str {
    match language {
        Language::Python => "Python code executed successfully!",
        _ => "Code executed successfully!",
    }
}

/// Plain lines shown for a completed run, shared with the TUI.
pub fn result_lines(language: Language, result: &ExecutionResult) -> Vec<String> {
    let mut lines = Vec::new();
    if result.succeeded {
        lines.push(success_banner(language).to_string());
    } else {
        lines.push(format!("Error: {}", result.error.as_deref().unwrap_or_default()));
    }
    lines.extend(result.output.lines().map(str::to_string));
    lines.push(format!("Execution time: {}ms", result.elapsed_display()));
    lines
}

pub struct TextPrinter {
    pub color: bool,
}

impl TextPrinter {
    pub fn print(&self, language: Language, outcome: &Outcome, preview_path: Option<&Path>) {
        match outcome {
            Outcome::Completed(result) => {
                let banner = if result.succeeded {
                    success_banner(language).to_string()
                } else {
                    format!("Error: {}", result.error.as_deref().unwrap_or_default())
                };
                match (self.color, result.succeeded) {
                    (true, true) => println!("{}", banner.green()),
                    (true, false) => println!("{}", banner.red()),
                    _ => println!("{}", banner),
                }
                if !result.output.is_empty() {
                    println!("{}", result.output);
                }
                let timing = format!("Execution time: {}ms", result.elapsed_display());
                if self.color {
                    println!("{}", timing.dimmed());
                } else {
                    println!("{}", timing);
                }
            }
            Outcome::Render(directive) => {
                if let Some(path) = preview_path {
                    let line = format!("Preview written to {}", path.display());
                    if self.color {
                        println!("{}", line.cyan());
                    } else {
                        println!("{}", line);
                    }
                }
                println!("{}", directive.iframe_markup());
            }
        }
    }
}

pub struct JsonPrinter;

impl JsonPrinter {
    pub fn print(&self, outcome: &Outcome) {
        let text = serde_json::to_string_pretty(outcome).unwrap_or_else(|e| {
            serde_json::json!({ "kind": "error", "error": e.to_string() }).to_string()
        });
        println!("{}", text);
    }
}
