//! Script execution contract.
//!
//! The scripting language lives outside this crate. A [`ScriptSupport`]
//! compiles a script reference into a [`Script`]; submitting it with the
//! widget and its PVs returns a [`ScriptFuture`] the runtime can cancel
//! when the widget stops.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use display_model::value::ScriptInfo;
use display_model::Widget;
use parking_lot::Mutex;

use crate::error::RuntimeError;
use crate::pv::RuntimePv;

/// Compiles scripts for one language.
pub trait ScriptSupport: Send + Sync {
    fn compile(&self, info: &ScriptInfo) -> Result<Arc<dyn Script>, RuntimeError>;
}

/// Compiled script.
pub trait Script: Send + Sync {
    fn name(&self) -> &str;

    /// Start executing with `widget` and `pvs`. The result is reported
    /// through the returned future.
    fn submit(&self, widget: &Widget, pvs: &[RuntimePv]) -> ScriptFuture;
}

/// Outcome of a script run.
pub type ScriptResult = Result<(), String>;

#[derive(Debug, Default)]
struct FutureState {
    cancelled: AtomicBool,
    outcome: Mutex<Option<ScriptResult>>,
}

/// Pending script execution.
#[derive(Debug, Clone)]
pub struct ScriptFuture {
    state: Arc<FutureState>,
    done: Receiver<()>,
}

/// Executor side of a [`ScriptFuture`].
#[derive(Debug)]
pub struct ScriptCompletion {
    state: Arc<FutureState>,
    done: Sender<()>,
}

impl ScriptFuture {
    /// New pending future and the handle used to complete it.
    #[must_use]
    pub fn pending() -> (ScriptFuture, ScriptCompletion) {
        let state = Arc::new(FutureState::default());
        let (done_tx, done_rx) = bounded(1);
        (
            ScriptFuture {
                state: Arc::clone(&state),
                done: done_rx,
            },
            ScriptCompletion {
                state,
                done: done_tx,
            },
        )
    }

    /// Future that is already complete.
    #[must_use]
    pub fn ready(result: ScriptResult) -> ScriptFuture {
        let (future, completion) = Self::pending();
        completion.complete(result);
        future
    }

    /// Ask the executor to abandon the run. Has no effect once complete.
    pub fn cancel(&self) {
        if !self.is_done() {
            self.state.cancelled.store(true, Ordering::SeqCst);
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state.outcome.lock().is_some()
    }

    /// Result if complete.
    #[must_use]
    pub fn result(&self) -> Option<ScriptResult> {
        self.state.outcome.lock().clone()
    }

    /// Wait up to `timeout` for completion.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ScriptResult> {
        if let Some(result) = self.result() {
            return Some(result);
        }
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => self.result(),
            Err(RecvTimeoutError::Timeout) => None,
        }
    }
}

impl ScriptCompletion {
    /// Executors poll this between steps and stop early when set.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    pub fn complete(self, result: ScriptResult) {
        *self.state.outcome.lock() = Some(result);
        let _ = self.done.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn completes_across_threads() {
        let (future, completion) = ScriptFuture::pending();
        let worker = thread::spawn(move || completion.complete(Ok(())));
        assert_eq!(future.wait_timeout(Duration::from_secs(5)), Some(Ok(())));
        worker.join().expect("worker");
        future.cancel();
        assert!(!future.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_to_executor() {
        let (future, completion) = ScriptFuture::pending();
        future.cancel();
        assert!(completion.is_cancelled());
        assert_eq!(future.wait_timeout(Duration::from_millis(1)), None);
        completion.complete(Err("cancelled".to_string()));
        assert_eq!(future.result(), Some(Err("cancelled".to_string())));
    }
}
