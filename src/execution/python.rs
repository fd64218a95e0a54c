//! Python path of the dispatcher: drives the session through one run.

use std::{future::Future, time::Duration};

use tokio::time::Instant;
use tracing::info;

use super::{Captured, ExecError};
use crate::process::{Interpreter, InterpreterSession, ProcessError};

pub async fn run(session: &InterpreterSession, source: &str, timeout: Option<Duration>) -> Captured {
    let deadline = timeout.map(|limit| Instant::now() + limit);
    let timed_out = |fresh| Captured {
        output: String::new(),
        failure: timeout.map(ExecError::Timeout),
        included_bootstrap: fresh,
    };

    let mut checkout = match within(deadline, session.checkout()).await {
        None => return timed_out(!session.is_live()),
        Some(Err(e)) => {
            return Captured::failed(String::new(), ExecError::InterpreterBootstrap(e.to_string()))
        }
        Some(Ok(checkout)) => checkout,
    };
    let fresh = checkout.fresh();

    let stepped = match checkout.interpreter() {
        Some(interpreter) => within(deadline, steps(interpreter, source)).await,
        None => Some((String::new(), Some(ProcessError::Exited))),
    };
    match stepped {
        None => {
            checkout.discard().await;
            timed_out(fresh)
        }
        Some((output, failure)) => {
            if failure.as_ref().is_some_and(ProcessError::is_fatal) {
                checkout.discard().await;
            } else {
                checkout.release();
            }
            Captured {
                output,
                failure: failure.map(|e| ExecError::InterpreterRuntime(e.to_string())),
                included_bootstrap: fresh,
            }
        }
    }
}

/// Redirect, resolve, run, read. The buffer is read even after a failed
/// resolve or run so partial output survives.
async fn steps(interpreter: &mut dyn Interpreter, source: &str) -> (String, Option<ProcessError>) {
    if let Err(e) = interpreter.redirect_stdout().await {
        return (String::new(), Some(e));
    }

    let mut failure = match interpreter.load_packages_from_imports(source).await {
        Ok(installed) => {
            if !installed.is_empty() {
                info!(?installed, "installed packages");
            }
            None
        }
        Err(e) => Some(e),
    };
    if failure.is_none() {
        failure = interpreter.run_async(source).await.err();
    }
    if failure.as_ref().is_some_and(ProcessError::is_fatal) {
        return (String::new(), failure);
    }

    match interpreter.read_stdout().await {
        Ok(output) => (output, failure),
        Err(e) if e.is_fatal() => (String::new(), Some(e)),
        Err(e) => (String::new(), Some(failure.unwrap_or(e))),
    }
}

async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}
