use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use code_playground::execution::{
    Dispatcher, ExecutionRequest, ExecutionResult, ExecutionSettings, Language, Outcome,
};
use code_playground::process::{Interpreter, InterpreterLoader, ProcessError};

/// Understands `print <text>`, `raise <msg>`, `crash` and `hang`, one per line.
struct ScriptedInterpreter {
    buffer: Option<String>,
}

#[async_trait]
impl Interpreter for ScriptedInterpreter {
    async fn redirect_stdout(&mut self) -> Result<(), ProcessError> {
        self.buffer = Some(String::new());
        Ok(())
    }

    async fn load_packages_from_imports(&mut self, _source: &str) -> Result<Vec<String>, ProcessError> {
        Ok(Vec::new())
    }

    async fn run_async(&mut self, source: &str) -> Result<(), ProcessError> {
        for line in source.lines() {
            if let Some(text) = line.strip_prefix("print ") {
                let buffer = self.buffer.get_or_insert_with(String::new);
                buffer.push_str(text);
                buffer.push('\n');
            } else if let Some(msg) = line.strip_prefix("raise ") {
                return Err(ProcessError::Raised(msg.to_string()));
            } else if line == "crash" {
                return Err(ProcessError::Exited);
            } else if line == "hang" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
        }
        Ok(())
    }

    async fn read_stdout(&mut self) -> Result<String, ProcessError> {
        Ok(self.buffer.clone().unwrap_or_default())
    }
}

#[derive(Default)]
struct ScriptedLoader {
    loads: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl InterpreterLoader for ScriptedLoader {
    async fn load(&self) -> Result<Box<dyn Interpreter>, ProcessError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(ProcessError::Protocol("interpreter failed to start".into()));
        }
        Ok(Box::new(ScriptedInterpreter { buffer: None }))
    }
}

fn dispatcher_with(loader: Arc<ScriptedLoader>, timeout: Option<Duration>) -> Dispatcher {
    let settings = ExecutionSettings { timeout, ..ExecutionSettings::default() };
    Dispatcher::new(settings, loader)
}

fn dispatcher() -> Dispatcher {
    dispatcher_with(Arc::new(ScriptedLoader::default()), Some(Duration::from_secs(5)))
}

async fn completed(dispatcher: &Dispatcher, source: &str, language: Language) -> ExecutionResult {
    match dispatcher.execute(&ExecutionRequest::new(source, language)).await {
        Outcome::Completed(result) => result,
        Outcome::Render(directive) => panic!("unexpected render: {directive:?}"),
    }
}

#[tokio::test]
async fn javascript_logs_are_joined_by_newlines() {
    let result = completed(&dispatcher(), "console.log('a'); console.log('b')", Language::JavaScript).await;
    assert!(result.succeeded);
    assert_eq!(result.output, "a\nb");
    assert_eq!(result.error, None);
    assert!(result.elapsed_ms >= 0.0);
}

#[tokio::test]
async fn javascript_many_logs_keep_their_order() {
    let source = (1..=5).map(|i| format!("console.log('line {i}');")).collect::<String>();
    let result = completed(&dispatcher(), &source, Language::JavaScript).await;
    assert_eq!(result.output, "line 1\nline 2\nline 3\nline 4\nline 5");
}

#[tokio::test]
async fn javascript_error_message_is_reported() {
    let dispatcher = dispatcher();
    let result = completed(&dispatcher, "throw new Error('boom')", Language::JavaScript).await;
    assert!(!result.succeeded);
    assert_eq!(result.error.as_deref(), Some("boom"));
    assert_eq!(result.error_kind, Some("evaluation"));

    let after = completed(&dispatcher, "console.log('still logging')", Language::JavaScript).await;
    assert!(after.succeeded);
    assert_eq!(after.output, "still logging");
}

#[tokio::test]
async fn javascript_output_before_a_throw_is_kept() {
    let result = completed(
        &dispatcher(),
        "console.log('before'); throw new Error('after')",
        Language::JavaScript,
    )
    .await;
    assert!(!result.succeeded);
    assert_eq!(result.output, "before");
}

#[tokio::test]
async fn javascript_runs_do_not_share_state() {
    let dispatcher = dispatcher();
    completed(&dispatcher, "var leaked = 1; console.log(leaked)", Language::JavaScript).await;
    let result = completed(&dispatcher, "console.log(typeof leaked)", Language::JavaScript).await;
    assert_eq!(result.output, "undefined");
}

#[tokio::test]
async fn javascript_infinite_loop_times_out() {
    let dispatcher = dispatcher_with(Arc::new(ScriptedLoader::default()), Some(Duration::from_millis(200)));
    let result = completed(&dispatcher, "console.log('start'); while (true) {}", Language::JavaScript).await;
    assert!(!result.succeeded);
    assert_eq!(result.error_kind, Some("timeout"));
    assert_eq!(result.output, "start");
    assert!(result.elapsed_ms >= 0.0);
}

#[tokio::test]
async fn html_becomes_an_escaped_render_directive() {
    let outcome = dispatcher()
        .execute(&ExecutionRequest::new(r#"<p class="x">"hi"</p>"#, Language::Html))
        .await;
    let Outcome::Render(directive) = outcome else {
        panic!("expected a render directive");
    };
    assert!(directive.srcdoc.contains("<p class=&quot;x&quot;>&quot;hi&quot;</p>"));
    assert!(!directive.srcdoc.contains('"'));
    assert_eq!(directive.document, r#"<p class="x">"hi"</p>"#);
}

#[tokio::test]
async fn python_bootstraps_once_across_runs() {
    let loader = Arc::new(ScriptedLoader::default());
    let dispatcher = dispatcher_with(loader.clone(), Some(Duration::from_secs(5)));

    let first = completed(&dispatcher, "print one", Language::Python).await;
    let second = completed(&dispatcher, "print two", Language::Python).await;
    assert!(first.elapsed_ms >= 0.0 && second.elapsed_ms >= 0.0);

    assert!(first.included_bootstrap);
    assert!(!second.included_bootstrap);
    assert_eq!(second.output, "two\n");
    assert_eq!(dispatcher.session().bootstrap_count(), 1);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn python_runs_see_only_their_own_output() {
    let dispatcher = dispatcher();
    let failed = completed(&dispatcher, "print partial\nraise ValueError: bad", Language::Python).await;
    assert!(!failed.succeeded);
    assert_eq!(failed.output, "partial\n");
    assert_eq!(failed.error.as_deref(), Some("ValueError: bad"));
    assert_eq!(failed.error_kind, Some("interpreter_runtime"));
    assert!(failed.elapsed_ms >= 0.0);

    let next = completed(&dispatcher, "print fresh", Language::Python).await;
    assert!(next.succeeded);
    assert_eq!(next.output, "fresh\n");
    assert!(dispatcher.session().is_live());
    assert_eq!(dispatcher.session().bootstrap_count(), 1);
}

#[tokio::test]
async fn python_bootstrap_failure_is_retried_on_next_run() {
    let loader = Arc::new(ScriptedLoader { failures_left: AtomicUsize::new(1), ..Default::default() });
    let dispatcher = dispatcher_with(loader.clone(), Some(Duration::from_secs(5)));

    let failed = completed(&dispatcher, "print x", Language::Python).await;
    assert!(!failed.succeeded);
    assert_eq!(failed.error_kind, Some("interpreter_bootstrap"));
    assert_eq!(failed.output, "");
    assert!(failed.elapsed_ms >= 0.0);
    assert!(!dispatcher.session().is_live());

    let retried = completed(&dispatcher, "print x", Language::Python).await;
    assert!(retried.succeeded);
    assert!(retried.included_bootstrap);
    assert!(retried.elapsed_ms >= 0.0);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn python_crash_replaces_the_interpreter() {
    let dispatcher = dispatcher();
    let crashed = completed(&dispatcher, "print lost\ncrash", Language::Python).await;
    assert!(!crashed.succeeded);
    assert_eq!(crashed.error_kind, Some("interpreter_runtime"));
    assert_eq!(crashed.output, "");
    assert!(crashed.elapsed_ms >= 0.0);
    assert!(!dispatcher.session().is_live());

    let next = completed(&dispatcher, "print back", Language::Python).await;
    assert!(next.included_bootstrap);
    assert_eq!(dispatcher.session().bootstrap_count(), 2);
}

#[tokio::test]
async fn python_hang_times_out_and_discards_session() {
    let dispatcher = dispatcher_with(Arc::new(ScriptedLoader::default()), Some(Duration::from_millis(100)));
    let result = completed(&dispatcher, "hang", Language::Python).await;
    assert_eq!(result.error_kind, Some("timeout"));
    assert_eq!(result.output, "");
    assert!(result.elapsed_ms >= 0.0);
    assert!(!dispatcher.session().is_live());
}

#[tokio::test]
async fn abandoned_python_run_marks_session_dead() {
    let loader = Arc::new(ScriptedLoader::default());
    let dispatcher = dispatcher_with(loader.clone(), None);

    let request = ExecutionRequest::new("print started\nhang", Language::Python);
    let abandoned = tokio::time::timeout(Duration::from_millis(100), dispatcher.execute(&request)).await;
    assert!(abandoned.is_err());
    assert!(!dispatcher.session().is_live());

    let next = completed(&dispatcher, "print again", Language::Python).await;
    assert!(next.included_bootstrap);
    assert_eq!(next.output, "again\n");
    assert!(dispatcher.session().is_live());
    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_python_runs_bootstrap_once() {
    let loader = Arc::new(ScriptedLoader { delay: Duration::from_millis(50), ..Default::default() });
    let dispatcher = dispatcher_with(loader.clone(), Some(Duration::from_secs(5)));

    let (a, b) = tokio::join!(
        completed(&dispatcher, "print a", Language::Python),
        completed(&dispatcher, "print b", Language::Python),
    );

    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
    assert_eq!(a.output, "a\n");
    assert_eq!(b.output, "b\n");
    assert!(a.included_bootstrap ^ b.included_bootstrap);
}
