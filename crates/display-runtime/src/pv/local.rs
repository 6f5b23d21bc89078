//! In-memory PVs.
//!
//! Every name is a local value shared by all channels connected to it.
//! Writes are recorded and echoed to the subscribers, like a monitored PV
//! on a live data source.

use std::collections::HashSet;
use std::sync::Arc;

use display_model::VType;
use indexmap::IndexMap;
use parking_lot::Mutex;
use smol_str::SmolStr;
use tracing::debug;

use crate::error::PvError;
use crate::pv::{PvChannel, PvConnector, PvUpdates};

#[derive(Default)]
struct LocalState {
    values: IndexMap<SmolStr, VType>,
    subscribers: IndexMap<SmolStr, Vec<(u64, PvUpdates)>>,
    failing: HashSet<SmolStr>,
    writes: Vec<(SmolStr, VType)>,
    next_subscriber: u64,
}

/// Connector backed by process memory.
#[derive(Clone, Default)]
pub struct LocalPvConnector {
    state: Arc<Mutex<LocalState>>,
}

impl LocalPvConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an initial value without recording a write.
    #[must_use]
    pub fn with_value(self, name: &str, value: VType) -> Self {
        self.state.lock().values.insert(SmolStr::new(name), value);
        self
    }

    /// Make connections to `name` fail.
    pub fn fail_connect(&self, name: &str) {
        self.state.lock().failing.insert(SmolStr::new(name));
    }

    /// Update a value as if it changed at the source.
    pub fn set(&self, name: &str, value: VType) {
        let subscribers = {
            let mut state = self.state.lock();
            state.values.insert(SmolStr::new(name), value.clone());
            state.subscribers.get(name).cloned().unwrap_or_default()
        };
        for (_, updates) in subscribers {
            updates.deliver(value.clone());
        }
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<VType> {
        self.state.lock().values.get(name).cloned()
    }

    /// Every write received, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<(SmolStr, VType)> {
        self.state.lock().writes.clone()
    }

    #[must_use]
    pub fn write_count(&self, name: &str) -> usize {
        self.state
            .lock()
            .writes
            .iter()
            .filter(|(written, _)| written == name)
            .count()
    }

    /// Open channels for `name`.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.state.lock().subscribers.get(name).map_or(0, Vec::len)
    }
}

impl PvConnector for LocalPvConnector {
    fn connect(&self, name: &str, updates: PvUpdates) -> Result<Box<dyn PvChannel>, PvError> {
        let (id, initial) = {
            let mut state = self.state.lock();
            if state.failing.contains(name) {
                return Err(PvError::Connect {
                    name: name.into(),
                    reason: "connection refused".into(),
                });
            }
            let id = state.next_subscriber;
            state.next_subscriber += 1;
            state
                .subscribers
                .entry(SmolStr::new(name))
                .or_default()
                .push((id, updates.clone()));
            (id, state.values.get(name).cloned())
        };
        debug!("local PV {name} connected");
        if let Some(value) = initial {
            updates.deliver(value);
        }
        Ok(Box::new(LocalChannel {
            connector: self.clone(),
            name: SmolStr::new(name),
            id,
        }))
    }
}

struct LocalChannel {
    connector: LocalPvConnector,
    name: SmolStr,
    id: u64,
}

impl PvChannel for LocalChannel {
    fn write(&self, value: &VType) -> Result<(), PvError> {
        self.connector
            .state
            .lock()
            .writes
            .push((self.name.clone(), value.clone()));
        self.connector.set(&self.name, value.clone());
        Ok(())
    }

    fn close(&self) {
        let mut state = self.connector.state.lock();
        if let Some(subscribers) = state.subscribers.get_mut(&self.name) {
            subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pv::PvPool;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delivers_initial_value_and_echoes_writes() {
        let connector = LocalPvConnector::new().with_value("t", VType::Double(1.5));
        let pool = PvPool::new(Arc::new(connector.clone()));
        let pv = pool.get_pv("t").expect("connect");
        assert_eq!(pv.read(), Some(VType::Double(1.5)));

        let updates = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&updates);
        pv.add_listener(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(updates.load(Ordering::SeqCst), 1);

        pv.write(&VType::Long(3)).expect("write");
        assert_eq!(pv.read(), Some(VType::Long(3)));
        assert_eq!(updates.load(Ordering::SeqCst), 2);
        assert_eq!(connector.write_count("t"), 1);

        pool.release_pv(&pv).expect("release");
        assert_eq!(connector.subscriber_count("t"), 0);
    }

    #[test]
    fn refused_connection_is_an_error() {
        let connector = LocalPvConnector::new();
        connector.fail_connect("broken");
        let pool = PvPool::new(Arc::new(connector));
        assert!(matches!(
            pool.get_pv("broken"),
            Err(PvError::Connect { .. })
        ));
        assert!(pool.is_empty());
    }
}
