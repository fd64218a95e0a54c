//! Python interpreter process bootstrap and I/O glue.
//!
//! The child runs a small driver that answers one JSON line per request on a
//! duplicate of its original stdout. Descriptor 1 is pointed at stderr and the
//! user-visible `sys.stdin` is empty, so user code cannot reach the channel.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info};

use super::{Interpreter, InterpreterLoader, ProcessError};
use crate::execution::imports;

const BOOTSTRAP: &str = r#"
import ast, asyncio, importlib, importlib.util, inspect, io, json, os, subprocess, sys, traceback

_channel = os.fdopen(os.dup(1), "w", buffering=1, encoding="utf-8")
os.dup2(2, 1)
_requests = sys.stdin
sys.stdin = io.StringIO()
_auto_install = os.environ.get("PLAYGROUND_AUTO_INSTALL") == "1"
_install_timeout = float(os.environ.get("PLAYGROUND_INSTALL_TIMEOUT") or 0) or None
_globals = {"__name__": "__main__"}


def _clean(value):
    # Lone surrogates are legal in str but not in UTF-8.
    if isinstance(value, str):
        return value.encode("utf-8", "backslashreplace").decode("utf-8")
    if isinstance(value, list):
        return [_clean(v) for v in value]
    return value


def _reply(ok, value=None, error=None):
    payload = {"ok": ok, "value": _clean(value), "error": _clean(error)}
    _channel.write(json.dumps(payload) + "\n")
    _channel.flush()


def _describe(exc):
    return "".join(traceback.format_exception_only(type(exc), exc)).strip()


def _resolve(modules):
    installed = []
    for name in modules:
        if importlib.util.find_spec(name) is not None or not _auto_install:
            continue
        subprocess.run(
            [sys.executable, "-m", "pip", "install", "--quiet", name],
            check=True, stdout=subprocess.DEVNULL, stderr=subprocess.DEVNULL,
            timeout=_install_timeout,
        )
        installed.append(name)
    importlib.invalidate_caches()
    return installed


def _run(source):
    code = compile(source, "<playground>", "exec", flags=ast.PyCF_ALLOW_TOP_LEVEL_AWAIT)
    if code.co_flags & inspect.CO_COROUTINE:
        asyncio.run(eval(code, _globals))
    else:
        exec(code, _globals)


def _read():
    return sys.stdout.getvalue() if isinstance(sys.stdout, io.StringIO) else ""


_reply(True, sys.version.split()[0])
while True:
    line = _requests.readline()
    if not line:
        break
    try:
        request = json.loads(line)
        op = request.get("op")
        if op == "redirect":
            sys.stdout = io.StringIO()
            _reply(True)
        elif op == "resolve":
            _reply(True, _resolve(request.get("modules", [])))
        elif op == "run":
            _run(request.get("source", ""))
            _reply(True)
        elif op == "read":
            _reply(True, _read())
        else:
            _reply(False, error="unknown op: %r" % (op,))
    except BaseException as exc:
        _reply(False, error=_describe(exc))
"#;

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Request<'a> {
    Redirect,
    Resolve { modules: Vec<String> },
    Run { source: &'a str },
    Read,
}

#[derive(Debug, Deserialize)]
struct Reply {
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Spawns `<program> -u -c <driver>` on first use.
#[derive(Debug, Clone)]
pub struct PythonLoader {
    program: String,
    auto_install: bool,
    install_timeout: Option<Duration>,
}

impl PythonLoader {
    pub fn new(program: impl Into<String>, auto_install: bool) -> Self {
        Self { program: program.into(), auto_install, install_timeout: None }
    }

    /// Bounds each `pip install` so it cannot outlive a timed-out run.
    pub fn with_install_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.install_timeout = timeout;
        self
    }
}

#[async_trait]
impl InterpreterLoader for PythonLoader {
    async fn load(&self) -> Result<Box<dyn Interpreter>, ProcessError> {
        let process = PythonProcess::start(&self.program, self.auto_install, self.install_timeout).await?;
        Ok(Box::new(process))
    }
}

pub struct PythonProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    pub version: String,
}

impl PythonProcess {
    pub async fn start(
        program: &str,
        auto_install: bool,
        install_timeout: Option<Duration>,
    ) -> Result<Self, ProcessError> {
        let mut cmd = Command::new(program);
        cmd.arg("-u") // unbuffered
            .arg("-c")
            .arg(BOOTSTRAP)
            .env("PLAYGROUND_AUTO_INSTALL", if auto_install { "1" } else { "0" })
            .env("PLAYGROUND_INSTALL_TIMEOUT", install_timeout_env(install_timeout))
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child: Child = cmd.spawn().map_err(ProcessError::Spawn)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProcessError::Protocol("no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::Protocol("no stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "code_playground::python", "{line}");
                }
            });
        }

        let mut process = Self { child, stdin, stdout: BufReader::new(stdout), version: String::new() };
        let ready = process.read_reply().await?;
        process.version = ready.as_str().unwrap_or_default().to_string();
        info!(program, version = %process.version, "python interpreter ready");
        Ok(process)
    }

    async fn call(&mut self, request: Request<'_>) -> Result<serde_json::Value, ProcessError> {
        let mut line =
            serde_json::to_string(&request).map_err(|e| ProcessError::Protocol(e.to_string()))?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<serde_json::Value, ProcessError> {
        let mut line = String::new();
        if self.stdout.read_line(&mut line).await? == 0 {
            return Err(ProcessError::Exited);
        }
        let reply: Reply =
            serde_json::from_str(&line).map_err(|e| ProcessError::Protocol(e.to_string()))?;
        if reply.ok {
            Ok(reply.value)
        } else {
            Err(ProcessError::Raised(reply.error.unwrap_or_else(|| "unknown error".into())))
        }
    }
}

#[async_trait]
impl Interpreter for PythonProcess {
    async fn redirect_stdout(&mut self) -> Result<(), ProcessError> {
        self.call(Request::Redirect).await.map(|_| ())
    }

    async fn load_packages_from_imports(&mut self, source: &str) -> Result<Vec<String>, ProcessError> {
        let modules = imports::scan(source);
        if modules.is_empty() {
            return Ok(Vec::new());
        }
        let value = self.call(Request::Resolve { modules }).await?;
        serde_json::from_value(value).map_err(|e| ProcessError::Protocol(e.to_string()))
    }

    async fn run_async(&mut self, source: &str) -> Result<(), ProcessError> {
        self.call(Request::Run { source }).await.map(|_| ())
    }

    async fn read_stdout(&mut self) -> Result<String, ProcessError> {
        match self.call(Request::Read).await? {
            serde_json::Value::String(text) => Ok(text),
            other => Err(ProcessError::Protocol(format!("expected text, got {other}"))),
        }
    }

    async fn shutdown(&mut self) {
        let _ = self.child.kill().await;
    }
}

/// Seconds for the driver's install timeout; empty means unbounded.
fn install_timeout_env(timeout: Option<Duration>) -> String {
    timeout.map(|t| format!("{:.3}", t.as_secs_f64())).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_timeout_is_passed_in_seconds() {
        assert_eq!(install_timeout_env(Some(Duration::from_millis(1500))), "1.500");
        assert_eq!(install_timeout_env(None), "");
    }

    #[test]
    fn driver_escapes_surrogates_and_bounds_installs() {
        assert!(BOOTSTRAP.contains(r#"encode("utf-8", "backslashreplace")"#));
        assert!(BOOTSTRAP.contains("timeout=_install_timeout"));
    }
}
