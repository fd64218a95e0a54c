use std::sync::Arc;
use std::time::Duration;

use code_playground::execution::{
    Dispatcher, ExecutionRequest, ExecutionResult, ExecutionSettings, Language, Outcome,
};
use code_playground::process::python::PythonLoader;

fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn dispatcher() -> Dispatcher {
    let settings = ExecutionSettings { timeout: Some(Duration::from_secs(20)), ..ExecutionSettings::default() };
    Dispatcher::new(settings, Arc::new(PythonLoader::new("python3", false)))
}

async fn run(dispatcher: &Dispatcher, source: &str) -> ExecutionResult {
    match dispatcher.execute(&ExecutionRequest::new(source, Language::Python)).await {
        Outcome::Completed(result) => result,
        Outcome::Render(_) => panic!("python never renders"),
    }
}

#[tokio::test]
async fn real_interpreter_keeps_globals_and_isolates_output() {
    if !python_available() {
        println!("python3 not found, skipping");
        return;
    }
    let dispatcher = dispatcher();

    let first = run(&dispatcher, "x = 41\nprint('first')").await;
    assert!(first.succeeded, "{:?}", first.error);
    assert!(first.included_bootstrap);
    assert_eq!(first.output, "first\n");
    assert!(first.elapsed_ms >= 0.0);

    let failed = run(&dispatcher, "print(x + 1)\nraise ValueError('bad')").await;
    assert!(!failed.succeeded);
    assert_eq!(failed.output, "42\n");
    assert_eq!(failed.error.as_deref(), Some("ValueError: bad"));
    assert!(failed.elapsed_ms >= 0.0);

    let third = run(&dispatcher, "print('third')").await;
    assert_eq!(third.output, "third\n");
    assert!(!third.included_bootstrap);
    assert_eq!(dispatcher.session().bootstrap_count(), 1);
}

#[tokio::test]
async fn real_interpreter_supports_top_level_await() {
    if !python_available() {
        println!("python3 not found, skipping");
        return;
    }
    let dispatcher = dispatcher();
    let result = run(&dispatcher, "import asyncio\nawait asyncio.sleep(0)\nprint('awaited')").await;
    assert!(result.succeeded, "{:?}", result.error);
    assert_eq!(result.output, "awaited\n");
}

#[tokio::test]
async fn missing_module_fails_the_run() {
    if !python_available() {
        println!("python3 not found, skipping");
        return;
    }
    let dispatcher = dispatcher();
    let result = run(&dispatcher, "import surely_not_a_real_module_xyz").await;
    assert!(!result.succeeded);
    assert!(result.error.unwrap_or_default().contains("ModuleNotFoundError"));
    assert!(dispatcher.session().is_live());
}

#[tokio::test]
async fn unencodable_output_keeps_the_session() {
    if !python_available() {
        println!("python3 not found, skipping");
        return;
    }
    let dispatcher = dispatcher();
    let result = run(&dispatcher, "x = 7\nprint('ok')\nprint('\\udc80')").await;
    assert!(result.succeeded, "{:?}", result.error);
    assert_eq!(result.output, "ok\n\\udc80\n");
    assert!(result.elapsed_ms >= 0.0);

    let next = run(&dispatcher, "print(x)").await;
    assert_eq!(next.output, "7\n");
    assert!(!next.included_bootstrap);
    assert_eq!(dispatcher.session().bootstrap_count(), 1);
}
