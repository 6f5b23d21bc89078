//! UI execution context.
//!
//! All toolkit work runs through a [`UiExecutor`]. [`UiThread`] is a single
//! dedicated thread fed by a channel; [`InlineExecutor`] runs tasks on the
//! calling thread, which suits headless toolkits and tests.

#![allow(missing_docs)]

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use display_model::bus::panic_message;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::RepresentationError;

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

pub trait UiExecutor: Send + Sync {
    fn execute(&self, task: UiTask);
}

/// Run `task` on `executor` and receive its result.
pub fn submit<T, F>(executor: &dyn UiExecutor, task: F) -> Receiver<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = bounded(1);
    executor.execute(Box::new(move || {
        let _ = tx.send(task());
    }));
    rx
}

fn run_isolated(task: UiTask) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
        warn!("UI task panicked: {}", panic_message(payload.as_ref()));
    }
}

/// Runs every task immediately on the caller's thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl UiExecutor for InlineExecutor {
    fn execute(&self, task: UiTask) {
        run_isolated(task);
    }
}

/// Dedicated UI thread.
pub struct UiThread {
    tasks: Mutex<Option<Sender<UiTask>>>,
    join: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl UiThread {
    pub fn spawn(name: impl Into<String>) -> Result<Self, RepresentationError> {
        let (tx, rx) = unbounded::<UiTask>();
        let join = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                for task in rx {
                    run_isolated(task);
                }
                debug!("UI thread finished");
            })
            .map_err(|err| RepresentationError::ThreadSpawn(err.to_string().into()))?;
        let thread_id = join.thread().id();
        Ok(Self {
            tasks: Mutex::new(Some(tx)),
            join: Mutex::new(Some(join)),
            thread_id,
        })
    }

    /// `true` when called from the UI thread itself.
    #[must_use]
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Run queued tasks, then end the thread. Later tasks are dropped.
    pub fn shutdown(&self) {
        self.tasks.lock().take();
        let join = self.join.lock().take();
        if let Some(join) = join {
            if self.is_ui_thread() {
                return;
            }
            if join.join().is_err() {
                warn!("UI thread panicked");
            }
        }
    }
}

impl UiExecutor for UiThread {
    fn execute(&self, task: UiTask) {
        let sender = self.tasks.lock().clone();
        match sender {
            Some(sender) => {
                if sender.send(task).is_err() {
                    debug!("UI thread gone, task dropped");
                }
            }
            None => debug!("UI thread shut down, task dropped"),
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for UiThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiThread")
            .field("thread_id", &self.thread_id)
            .field("running", &self.tasks.lock().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tasks_run_in_order_on_the_ui_thread() {
        let ui = UiThread::spawn("ui-test").expect("spawn");
        let (tx, rx) = unbounded();
        for index in 0..3 {
            let tx = tx.clone();
            ui.execute(Box::new(move || {
                let _ = tx.send(index);
            }));
        }
        let on_ui = submit(&ui, || thread::current().name().map(str::to_string));
        assert_eq!(
            on_ui.recv_timeout(Duration::from_secs(5)).expect("result"),
            Some("ui-test".to_string())
        );
        let order: Vec<i32> = rx.try_iter().collect();
        assert_eq!(order, vec![0, 1, 2]);
        ui.shutdown();
        ui.shutdown();
    }

    #[test]
    fn panicking_task_does_not_stop_the_thread() {
        let ui = UiThread::spawn("ui-panic").expect("spawn");
        ui.execute(Box::new(|| panic!("boom")));
        let after = submit(&ui, || 7);
        assert_eq!(after.recv_timeout(Duration::from_secs(5)), Ok(7));
    }

    #[test]
    fn tasks_after_shutdown_are_dropped() {
        let ui = UiThread::spawn("ui-closed").expect("spawn");
        ui.shutdown();
        let result = submit(&ui, || 1);
        assert!(result.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(submit(&InlineExecutor, || 2).try_recv(), Ok(2));
    }
}
