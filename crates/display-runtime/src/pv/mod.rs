//! Process variable contract.
//!
//! A [`PvConnector`] opens a [`PvChannel`] to a named data source and pushes
//! every value it receives through [`PvUpdates`]. The [`RuntimePv`] handle
//! caches the last value and fans updates out to its listeners. Handles are
//! shared through the reference-counted [`PvPool`].

#![allow(missing_docs)]

mod local;
mod pool;

use std::fmt;
use std::sync::{Arc, Weak};

use display_model::{ListenerId, ListenerList, VType};
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use tracing::trace;

use crate::error::PvError;

pub use local::LocalPvConnector;
pub use pool::{install_pool, pool, teardown_pool, PvPool};

/// Opens channels to a data source.
pub trait PvConnector: Send + Sync {
    /// Connect to `name`. Values arrive through `updates`, possibly before
    /// this call returns.
    fn connect(&self, name: &str, updates: PvUpdates) -> Result<Box<dyn PvChannel>, PvError>;
}

/// Open connection to one data point.
pub trait PvChannel: Send + Sync {
    fn write(&self, value: &VType) -> Result<(), PvError>;

    /// Stop delivering updates. Called once, when the pool releases the PV.
    fn close(&self);
}

/// Listener for value updates: `(pv, value)`.
pub type PvListener = dyn Fn(&RuntimePv, &VType) + Send + Sync;

struct PvInner {
    name: SmolStr,
    channel: Mutex<Option<Arc<dyn PvChannel>>>,
    last: RwLock<Option<VType>>,
    listeners: ListenerList<PvListener>,
}

/// Shared handle to a connected process variable.
#[derive(Clone)]
pub struct RuntimePv {
    inner: Arc<PvInner>,
}

impl RuntimePv {
    pub(crate) fn connect(connector: &dyn PvConnector, name: &str) -> Result<Self, PvError> {
        let inner = Arc::new(PvInner {
            name: SmolStr::new(name),
            channel: Mutex::new(None),
            last: RwLock::new(None),
            listeners: ListenerList::default(),
        });
        let updates = PvUpdates {
            target: Arc::downgrade(&inner),
        };
        let channel = connector.connect(name, updates)?;
        *inner.channel.lock() = Some(Arc::from(channel));
        Ok(Self { inner })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Last received value, `None` until the first update.
    #[must_use]
    pub fn read(&self) -> Option<VType> {
        self.inner.last.read().clone()
    }

    pub fn write(&self, value: &VType) -> Result<(), PvError> {
        // Writes may echo back synchronously, so the slot is not held.
        let channel = self.inner.channel.lock().clone();
        match channel {
            Some(channel) => {
                trace!("write {} = {value}", self.inner.name);
                channel.write(value)
            }
            None => Err(PvError::Disconnected(self.inner.name.clone())),
        }
    }

    /// Subscribe to updates. A PV that already has a value delivers it to
    /// the new listener right away.
    pub fn add_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&RuntimePv, &VType) + Send + Sync + 'static,
    {
        let listener: Arc<PvListener> = Arc::new(listener);
        let id = self.inner.listeners.add(Arc::clone(&listener));
        if let Some(value) = self.read() {
            listener(self, &value);
        }
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &RuntimePv) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.channel.lock().is_some()
    }

    pub(crate) fn close(&self) {
        if let Some(channel) = self.inner.channel.lock().take() {
            channel.close();
        }
        self.inner.listeners.clear();
    }
}

impl fmt::Debug for RuntimePv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimePv")
            .field("name", &self.inner.name)
            .field("value", &*self.inner.last.read())
            .finish()
    }
}

impl fmt::Display for RuntimePv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// Sink a connector uses to deliver values to its PV.
#[derive(Clone)]
pub struct PvUpdates {
    target: Weak<PvInner>,
}

impl PvUpdates {
    /// Store `value` as the PV's latest and notify its listeners. Values
    /// arriving after the PV was dropped are ignored.
    pub fn deliver(&self, value: VType) {
        let Some(inner) = self.target.upgrade() else {
            return;
        };
        *inner.last.write() = Some(value.clone());
        let pv = RuntimePv { inner };
        pv.inner
            .listeners
            .notify(&pv.inner.name, |listener| listener(&pv, &value));
    }

    /// `true` once the PV handle is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.target.strong_count() == 0
    }
}

impl fmt::Debug for PvUpdates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target.upgrade() {
            Some(inner) => write!(f, "PvUpdates({})", inner.name),
            None => f.write_str("PvUpdates(<closed>)"),
        }
    }
}
