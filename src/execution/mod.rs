//! Execution dispatcher: language tags, result types, and strategy selection.

use std::{fmt, str::FromStr, sync::Arc, time::Duration, time::Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    config::Config,
    process::{python::PythonLoader, InterpreterLoader, InterpreterSession},
};

pub mod html;
pub mod imports;
pub mod javascript;
pub mod python;

pub use html::RenderDirective;
pub use javascript::{JavaScriptEngine, LogSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    Html,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::JavaScript, Language::Python, Language::Html];

    pub fn id(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Html => "html",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Html => "HTML",
        }
    }

    pub fn ext(self) -> &'static str {
        match self {
            Language::JavaScript => "js",
            Language::Python => "py",
            Language::Html => "html",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Language::JavaScript => "⚡️",
            Language::Python => "🐍",
            Language::Html => "🌐",
        }
    }

    /// Label of the run action for this language.
    pub fn run_label(self) -> &'static str {
        match self {
            Language::Html => "Preview",
            _ => "Run",
        }
    }

    pub fn line_comment(self) -> Option<&'static str> {
        match self {
            Language::JavaScript => Some("//"),
            Language::Python => Some("#"),
            Language::Html => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(Language::JavaScript),
            "py" => Some(Language::Python),
            "html" | "htm" => Some(Language::Html),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Language::JavaScript => Language::Python,
            Language::Python => Language::Html,
            Language::Html => Language::JavaScript,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.icon(), self.name())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|l| l.id() == lower || l.name().eq_ignore_ascii_case(&lower))
            .or_else(|| Language::from_extension(&lower))
            .ok_or_else(|| format!("unsupported language: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub source: String,
    pub language: Language,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>, language: Language) -> Self {
        Self { source: source.into(), language }
    }
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{0}")]
    Evaluation(String),
    #[error("{0}")]
    InterpreterBootstrap(String),
    #[error("{0}")]
    InterpreterRuntime(String),
    #[error("execution timed out after {:.2}s", .0.as_secs_f64())]
    Timeout(Duration),
}

impl ExecError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecError::Evaluation(_) => "evaluation",
            ExecError::InterpreterBootstrap(_) => "interpreter_bootstrap",
            ExecError::InterpreterRuntime(_) => "interpreter_runtime",
            ExecError::Timeout(_) => "timeout",
        }
    }
}

/// Output gathered by one strategy, kept even when the run failed.
#[derive(Debug, Default)]
pub struct Captured {
    pub output: String,
    pub failure: Option<ExecError>,
    pub included_bootstrap: bool,
}

impl Captured {
    pub fn ok(output: String) -> Self {
        Self { output, ..Default::default() }
    }

    pub fn failed(output: String, failure: ExecError) -> Self {
        Self { output, failure: Some(failure), ..Default::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub output: String,
    pub error: Option<String>,
    pub error_kind: Option<&'static str>,
    pub elapsed_ms: f64,
    pub included_bootstrap: bool,
}

impl ExecutionResult {
    fn assemble(captured: Captured, started: Instant) -> Self {
        let Captured { output, failure, included_bootstrap } = captured;
        let error_kind = failure.as_ref().map(ExecError::kind);
        let error = failure.map(|e| e.to_string());
        Self {
            succeeded: error.is_none(),
            output,
            error,
            error_kind,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            included_bootstrap,
        }
    }

    pub fn elapsed_display(&self) -> String {
        format!("{:.2}", self.elapsed_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Completed(ExecutionResult),
    Render(RenderDirective),
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        match self {
            Outcome::Completed(r) => r.succeeded,
            Outcome::Render(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSettings {
    /// `None` means runs are never cut short.
    pub timeout: Option<Duration>,
    pub js_memory_limit: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self { timeout: Some(Duration::from_secs(30)), js_memory_limit: 64 * 1024 * 1024 }
    }
}

pub struct Dispatcher {
    javascript: JavaScriptEngine,
    session: InterpreterSession,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(settings: ExecutionSettings, loader: Arc<dyn InterpreterLoader>) -> Self {
        Self {
            javascript: JavaScriptEngine::new(settings.clone()),
            session: InterpreterSession::new(loader),
            timeout: settings.timeout,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let settings = cfg.execution_settings();
        let loader = PythonLoader::new(cfg.python_bin(), cfg.get_bool("PYTHON_AUTO_INSTALL"))
            .with_install_timeout(settings.timeout);
        Self::new(settings, Arc::new(loader))
    }

    pub fn session(&self) -> &InterpreterSession {
        &self.session
    }

    /// Runs one request. Failures come back inside the outcome, never as `Err`.
    pub async fn execute(&self, request: &ExecutionRequest) -> Outcome {
        if request.language == Language::Html {
            return Outcome::Render(RenderDirective::new(&request.source));
        }

        let started = Instant::now();
        let captured = match request.language {
            Language::JavaScript => self.javascript.run(&request.source).await,
            Language::Python => python::run(&self.session, &request.source, self.timeout).await,
            Language::Html => Captured::default(),
        };
        let result = ExecutionResult::assemble(captured, started);

        info!(
            language = request.language.id(),
            succeeded = result.succeeded,
            elapsed_ms = result.elapsed_ms,
            bootstrap = result.included_bootstrap,
            "execution finished"
        );
        Outcome::Completed(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_parses_ids_names_and_extensions() {
        assert_eq!("python".parse::<Language>(), Ok(Language::Python));
        assert_eq!("JavaScript".parse::<Language>(), Ok(Language::JavaScript));
        assert_eq!("HTM".parse::<Language>(), Ok(Language::Html));
        assert!("ruby".parse::<Language>().is_err());
    }

    #[test]
    fn html_runs_as_preview() {
        assert_eq!(Language::Html.run_label(), "Preview");
        assert_eq!(Language::Python.run_label(), "Run");
        assert_eq!(Language::Html.next(), Language::JavaScript);
    }

    #[test]
    fn failure_keeps_partial_output() {
        let started = Instant::now();
        let result = ExecutionResult::assemble(
            Captured::failed("a".into(), ExecError::Evaluation("boom".into())),
            started,
        );
        assert!(!result.succeeded);
        assert_eq!(result.output, "a");
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.error_kind, Some("evaluation"));
        assert!(result.elapsed_ms >= 0.0);
    }

    #[test]
    fn timeout_message_names_the_limit() {
        let err = ExecError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "execution timed out after 1.50s");
    }
}
