//! Update throttle.
//!
//! Update requests arrive from PV threads at any rate. The throttle keeps a
//! set of pending targets keyed by identity; the first request of a batch
//! wakes the timer thread, which waits one interval and then hands the whole
//! batch to the UI executor in a single task. A target requested many times
//! within one interval is updated once, and a request arriving while a batch
//! is flushed starts the next batch instead of being lost.

#![allow(missing_docs)]

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender};
use display_model::bus::panic_message;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::error::RepresentationError;
use crate::executor::UiExecutor;

/// Something the throttle can refresh on the UI thread.
pub trait UpdateTarget: Send + Sync {
    /// Bring the toolkit item up to date with the model.
    fn update_changes(&self);
}

type Pending = IndexMap<usize, Arc<dyn UpdateTarget>>;

struct ThrottleShared {
    pending: Mutex<Pending>,
    stopped: AtomicBool,
}

/// Cloneable handle used to request updates.
#[derive(Clone)]
pub struct UpdateScheduler {
    shared: Arc<ThrottleShared>,
    wake: Sender<()>,
}

impl UpdateScheduler {
    /// Mark `target` for an update. Safe from any thread.
    pub fn schedule_update(&self, target: Arc<dyn UpdateTarget>) {
        if self.shared.stopped.load(Ordering::SeqCst) {
            trace!("throttle stopped, update ignored");
            return;
        }
        let key = Arc::as_ptr(&target).cast::<()>() as usize;
        let first = {
            let mut pending = self.shared.pending.lock();
            let first = pending.is_empty();
            pending.entry(key).or_insert(target);
            first
        };
        if first {
            // A full channel already holds a wakeup.
            let _ = self.wake.try_send(());
        }
    }

    /// Targets waiting for the next flush.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }
}

impl std::fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Coalesces update requests into at most one UI task per interval.
pub struct UpdateThrottle {
    scheduler: UpdateScheduler,
    interval: Duration,
    shutdown: Mutex<Option<Sender<()>>>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl UpdateThrottle {
    pub fn new(
        interval: Duration,
        executor: Arc<dyn UiExecutor>,
    ) -> Result<Self, RepresentationError> {
        let shared = Arc::new(ThrottleShared {
            pending: Mutex::new(IndexMap::new()),
            stopped: AtomicBool::new(false),
        });
        let (wake_tx, wake_rx) = bounded(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let thread_shared = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name("update-throttle".into())
            .spawn(move || run_throttle(&thread_shared, interval, &wake_rx, &shutdown_rx, &executor))
            .map_err(|err| RepresentationError::ThreadSpawn(err.to_string().into()))?;
        debug!("update throttle started, interval {interval:?}");
        Ok(Self {
            scheduler: UpdateScheduler {
                shared,
                wake: wake_tx,
            },
            interval,
            shutdown: Mutex::new(Some(shutdown_tx)),
            join: Mutex::new(Some(join)),
        })
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn scheduler(&self) -> UpdateScheduler {
        self.scheduler.clone()
    }

    pub fn schedule_update(&self, target: Arc<dyn UpdateTarget>) {
        self.scheduler.schedule_update(target);
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.scheduler.shared.stopped.load(Ordering::SeqCst)
    }

    /// Stop the timer thread and drop pending requests. Idempotent.
    pub fn shutdown(&self) {
        if self.scheduler.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.lock().take();
        self.scheduler.shared.pending.lock().clear();
        let join = self.join.lock().take();
        if let Some(join) = join {
            if join.thread().id() == thread::current().id() {
                return;
            }
            if join.join().is_err() {
                warn!("update throttle thread panicked");
            }
        }
        debug!("update throttle stopped");
    }
}

impl Drop for UpdateThrottle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for UpdateThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateThrottle")
            .field("interval", &self.interval)
            .field("pending", &self.scheduler.pending_count())
            .field("stopped", &self.is_shutdown())
            .finish()
    }
}

fn run_throttle(
    shared: &ThrottleShared,
    interval: Duration,
    wake: &Receiver<()>,
    shutdown: &Receiver<()>,
    executor: &Arc<dyn UiExecutor>,
) {
    loop {
        select! {
            recv(wake) -> message => {
                if message.is_err() {
                    return;
                }
            }
            recv(shutdown) -> _ => return,
        }
        // Let the batch collect for one interval.
        if shutdown.recv_timeout(interval).is_ok()
            || shared.stopped.load(Ordering::SeqCst)
        {
            return;
        }
        let batch: Vec<_> = shared.pending.lock().drain(..).map(|(_, target)| target).collect();
        if batch.is_empty() {
            continue;
        }
        trace!("flushing {} update(s)", batch.len());
        executor.execute(Box::new(move || {
            for target in batch {
                let outcome = catch_unwind(AssertUnwindSafe(|| target.update_changes()));
                if let Err(payload) = outcome {
                    warn!("update_changes panicked: {}", panic_message(payload.as_ref()));
                }
            }
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::InlineExecutor;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl UpdateTarget for Counter {
        fn update_changes(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn coalesces_requests_for_one_target() {
        let throttle =
            UpdateThrottle::new(Duration::from_millis(200), Arc::new(InlineExecutor)).expect("throttle");
        let counter = Arc::new(Counter::default());
        for _ in 0..50 {
            throttle.schedule_update(counter.clone());
        }
        assert_eq!(throttle.scheduler().pending_count(), 1);
        wait_for(|| counter.0.load(Ordering::SeqCst) > 0);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        throttle.shutdown();
    }

    #[test]
    fn shutdown_is_idempotent_and_ignores_later_requests() {
        let throttle =
            UpdateThrottle::new(Duration::from_millis(10), Arc::new(InlineExecutor)).expect("throttle");
        throttle.shutdown();
        throttle.shutdown();
        assert!(throttle.is_shutdown());
        let counter = Arc::new(Counter::default());
        throttle.schedule_update(counter.clone());
        assert_eq!(throttle.scheduler().pending_count(), 0);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }
}
