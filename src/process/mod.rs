//! Interpreter process management (bootstrap, session ownership, I/O errors).

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

pub mod python;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start interpreter: {0}")]
    Spawn(std::io::Error),
    #[error("interpreter I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("interpreter exited unexpectedly")]
    Exited,
    #[error("malformed interpreter reply: {0}")]
    Protocol(String),
    /// An exception raised by the interpreted code; the session stays usable.
    #[error("{0}")]
    Raised(String),
}

impl ProcessError {
    /// Whether the interpreter can no longer be trusted and must be replaced.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProcessError::Raised(_))
    }
}

/// The calls the dispatcher needs from an embedded interpreter.
#[async_trait]
pub trait Interpreter: Send {
    /// Points the interpreter's stdout at a fresh in-memory buffer.
    async fn redirect_stdout(&mut self) -> Result<(), ProcessError>;
    /// Makes the packages imported by `source` available; returns what was installed.
    async fn load_packages_from_imports(&mut self, source: &str) -> Result<Vec<String>, ProcessError>;
    async fn run_async(&mut self, source: &str) -> Result<(), ProcessError>;
    /// Text accumulated in the buffer since the last redirect.
    async fn read_stdout(&mut self) -> Result<String, ProcessError>;
    async fn shutdown(&mut self) {}
}

#[async_trait]
pub trait InterpreterLoader: Send + Sync {
    async fn load(&self) -> Result<Box<dyn Interpreter>, ProcessError>;
}

/// Owner of the single live interpreter.
///
/// The lock is held across bootstrap and across each run, which makes the
/// first initialization single-flight and keeps runs from interleaving.
pub struct InterpreterSession {
    loader: Arc<dyn InterpreterLoader>,
    slot: Mutex<Option<Box<dyn Interpreter>>>,
    bootstraps: AtomicUsize,
    live: AtomicBool,
}

impl InterpreterSession {
    pub fn new(loader: Arc<dyn InterpreterLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
            bootstraps: AtomicUsize::new(0),
            live: AtomicBool::new(false),
        }
    }

    /// Number of successful bootstraps so far.
    pub fn bootstrap_count(&self) -> usize {
        self.bootstraps.load(Ordering::SeqCst)
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Waits for exclusive use of the interpreter, bootstrapping one if needed.
    pub async fn checkout(&self) -> Result<Checkout<'_>, ProcessError> {
        let mut slot = self.slot.lock().await;
        let fresh = slot.is_none();
        if fresh {
            info!("bootstrapping interpreter");
            let interpreter = self.loader.load().await.inspect_err(|e| {
                warn!(error = %e, "interpreter bootstrap failed");
            })?;
            self.bootstraps.fetch_add(1, Ordering::SeqCst);
            self.live.store(true, Ordering::SeqCst);
            *slot = Some(interpreter);
        }
        Ok(Checkout { session: self, slot, fresh, released: false })
    }
}

/// Exclusive use of the live interpreter. Dropping it without
/// [`Checkout::release`], including when the run is cancelled, discards the
/// interpreter.
pub struct Checkout<'a> {
    session: &'a InterpreterSession,
    slot: MutexGuard<'a, Option<Box<dyn Interpreter>>>,
    fresh: bool,
    released: bool,
}

impl<'a> Checkout<'a> {
    /// True when this checkout bootstrapped the interpreter.
    pub fn fresh(&self) -> bool {
        self.fresh
    }

    /// `None` only after the interpreter was discarded.
    pub fn interpreter(&mut self) -> Option<&mut (dyn Interpreter + 'static)> {
        self.slot.as_deref_mut()
    }

    /// Returns the interpreter to the session for the next run.
    pub fn release(mut self) {
        self.released = true;
    }

    /// Shuts the interpreter down; the next checkout bootstraps a new one.
    pub async fn discard(mut self) {
        warn!("discarding interpreter session");
        if let Some(mut interpreter) = self.slot.take() {
            interpreter.shutdown().await;
        }
        self.session.live.store(false, Ordering::SeqCst);
    }
}

impl Drop for Checkout<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if self.slot.take().is_some() {
            warn!("run abandoned, discarding interpreter session");
        }
        self.session.live.store(false, Ordering::SeqCst);
    }
}
