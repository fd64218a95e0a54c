//! JavaScript evaluation in an embedded QuickJS realm.
//!
//! Every run gets its own runtime and context, so scripts see neither the host
//! nor each other. Console output goes to a [`LogSink`] owned by the run.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::Instant;

use rquickjs::{
    convert::Coerced, function::Rest, CatchResultExt, CaughtError, Context, Ctx, FromJs, Function,
    Object, Runtime, Value,
};
use tracing::debug;

use super::{Captured, ExecError, ExecutionSettings};

const CONSOLE_METHODS: [&str; 5] = ["log", "info", "warn", "error", "debug"];

/// Ordered lines written by `console.*` during one run.
#[derive(Debug, Clone, Default)]
pub struct LogSink(Arc<Mutex<Vec<String>>>);

impl LogSink {
    pub fn push(&self, line: String) {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn joined(&self) -> String {
        self.lines().join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct JavaScriptEngine {
    settings: ExecutionSettings,
}

impl JavaScriptEngine {
    pub fn new(settings: ExecutionSettings) -> Self {
        Self { settings }
    }

    pub async fn run(&self, source: &str) -> Captured {
        // Let the caller repaint before a long synchronous evaluation.
        tokio::task::yield_now().await;

        let source = source.to_owned();
        let settings = self.settings.clone();
        let sink = LogSink::default();
        let task_sink = sink.clone();
        match tokio::task::spawn_blocking(move || evaluate(&source, &settings, &task_sink)).await {
            Ok(captured) => captured,
            Err(join) => Captured::failed(sink.joined(), ExecError::Evaluation(join.to_string())),
        }
    }
}

/// Evaluates `source` synchronously, writing console output into `sink`.
pub fn evaluate(source: &str, settings: &ExecutionSettings, sink: &LogSink) -> Captured {
    let runtime = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return Captured::failed(String::new(), ExecError::Evaluation(e.to_string())),
    };
    runtime.set_memory_limit(settings.js_memory_limit);

    let timed_out = Arc::new(AtomicBool::new(false));
    if let Some(limit) = settings.timeout {
        let deadline = Instant::now() + limit;
        let flag = timed_out.clone();
        runtime.set_interrupt_handler(Some(Box::new(move || {
            let expired = Instant::now() >= deadline;
            if expired {
                flag.store(true, Ordering::SeqCst);
            }
            expired
        })));
    }

    let context = match Context::full(&runtime) {
        Ok(ctx) => ctx,
        Err(e) => return Captured::failed(String::new(), ExecError::Evaluation(e.to_string())),
    };

    let mut failure = context.with(|ctx| {
        if let Err(e) = install_console(&ctx, sink) {
            return Some(ExecError::Evaluation(e.to_string()));
        }
        match ctx.eval::<Value, _>(source).catch(&ctx) {
            Ok(_) => None,
            Err(caught) => Some(ExecError::Evaluation(caught_message(&ctx, caught))),
        }
    });

    if failure.is_none() {
        failure = drain_jobs(&runtime);
    }

    if timed_out.load(Ordering::SeqCst) {
        if let Some(limit) = settings.timeout {
            failure = Some(ExecError::Timeout(limit));
        }
    }

    debug!(lines = sink.lines().len(), failed = failure.is_some(), "javascript evaluated");
    Captured { output: sink.joined(), failure, included_bootstrap: false }
}

fn install_console<'js>(ctx: &Ctx<'js>, sink: &LogSink) -> rquickjs::Result<()> {
    let console = Object::new(ctx.clone())?;
    for method in CONSOLE_METHODS {
        let sink = sink.clone();
        let log = Function::new(ctx.clone(), move |args: Rest<Coerced<String>>| {
            let line = args.0.into_iter().map(|arg| arg.0).collect::<Vec<_>>().join(" ");
            sink.push(line);
        })?;
        console.set(method, log)?;
    }
    ctx.globals().set("console", console)
}

fn drain_jobs(runtime: &Runtime) -> Option<ExecError> {
    loop {
        match runtime.execute_pending_job() {
            Ok(true) => continue,
            Ok(false) => return None,
            Err(_) => {
                return Some(ExecError::Evaluation("uncaught exception in pending job".into()))
            }
        }
    }
}

fn caught_message<'js>(ctx: &Ctx<'js>, caught: CaughtError<'js>) -> String {
    match caught {
        CaughtError::Exception(exception) => {
            exception.message().unwrap_or_else(|| exception.to_string())
        }
        CaughtError::Value(value) => Coerced::<String>::from_js(ctx, value)
            .map(|s| s.0)
            .unwrap_or_else(|_| "uncaught exception".to_string()),
        CaughtError::Error(error) => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ExecutionSettings {
        ExecutionSettings::default()
    }

    #[test]
    fn console_arguments_are_space_joined() {
        let sink = LogSink::default();
        let captured = evaluate("console.log('x', 1, true)", &settings(), &sink);
        assert!(captured.failure.is_none());
        assert_eq!(captured.output, "x 1 true");
    }

    #[test]
    fn thrown_strings_become_the_message() {
        let sink = LogSink::default();
        let captured = evaluate("throw 'plain'", &settings(), &sink);
        assert_eq!(captured.failure.map(|e| e.to_string()), Some("plain".to_string()));
    }

    #[test]
    fn promise_callbacks_run_before_returning() {
        let sink = LogSink::default();
        let captured = evaluate(
            "Promise.resolve(2).then(v => console.log('later', v)); console.log('now')",
            &settings(),
            &sink,
        );
        assert_eq!(captured.output, "now\nlater 2");
    }

    #[test]
    fn realm_has_no_host_globals() {
        let sink = LogSink::default();
        let captured = evaluate("console.log(typeof require, typeof process)", &settings(), &sink);
        assert_eq!(captured.output, "undefined undefined");
    }
}
