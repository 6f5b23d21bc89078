//! Reference-counted PV sharing.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::error::{PvError, RuntimeError};
use crate::pv::{PvConnector, RuntimePv};

struct PoolEntry {
    pv: RuntimePv,
    references: usize,
}

/// Hands out one shared [`RuntimePv`] per name and closes its channel when
/// the last holder releases it.
pub struct PvPool {
    connector: Arc<dyn PvConnector>,
    entries: Mutex<IndexMap<SmolStr, PoolEntry>>,
}

impl PvPool {
    #[must_use]
    pub fn new(connector: Arc<dyn PvConnector>) -> Self {
        Self {
            connector,
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Get the PV for `name`, connecting on first use.
    ///
    /// The connector runs without the pool locked. When two callers connect
    /// the same name at once, the first to finish wins and the other channel
    /// is closed.
    pub fn get_pv(&self, name: &str) -> Result<RuntimePv, PvError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PvError::Connect {
                name: SmolStr::default(),
                reason: "empty PV name".into(),
            });
        }
        if let Some(pv) = share(&mut self.entries.lock(), name) {
            return Ok(pv);
        }
        let pv = RuntimePv::connect(self.connector.as_ref(), name)?;
        let shared = {
            let mut entries = self.entries.lock();
            match share(&mut entries, name) {
                Some(shared) => Some(shared),
                None => {
                    entries.insert(
                        SmolStr::new(name),
                        PoolEntry {
                            pv: pv.clone(),
                            references: 1,
                        },
                    );
                    None
                }
            }
        };
        match shared {
            Some(shared) => {
                debug!("PV {name} connected concurrently, dropping duplicate channel");
                pv.close();
                Ok(shared)
            }
            None => {
                debug!("connected PV {name}");
                Ok(pv)
            }
        }
    }

    /// Drop one reference. The channel closes when none remain.
    pub fn release_pv(&self, pv: &RuntimePv) -> Result<(), PvError> {
        let closed = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries
                .get_mut(pv.name())
                .filter(|entry| entry.pv.ptr_eq(pv))
            else {
                return Err(PvError::NotInPool(pv.name().into()));
            };
            entry.references -= 1;
            if entry.references == 0 {
                entries.shift_remove(pv.name()).map(|entry| entry.pv)
            } else {
                None
            }
        };
        if let Some(pv) = closed {
            debug!("closing PV {pv}");
            pv.close();
        }
        Ok(())
    }

    /// Current reference count for `name`, zero when not connected.
    #[must_use]
    pub fn references(&self, name: &str) -> usize {
        self.entries
            .lock()
            .get(name)
            .map_or(0, |entry| entry.references)
    }

    /// Names of the connected PVs, in connection order.
    #[must_use]
    pub fn names(&self) -> Vec<SmolStr> {
        self.entries.lock().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Close every channel regardless of outstanding references.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.entries.lock().drain(..).collect();
        for (name, entry) in drained {
            if entry.references > 0 {
                warn!("closing PV {name} with {} reference(s)", entry.references);
            }
            entry.pv.close();
        }
    }
}

/// Add a reference to an existing entry.
fn share(entries: &mut IndexMap<SmolStr, PoolEntry>, name: &str) -> Option<RuntimePv> {
    let entry = entries.get_mut(name)?;
    entry.references += 1;
    Some(entry.pv.clone())
}

impl std::fmt::Debug for PvPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PvPool").field("pvs", &self.names()).finish()
    }
}

static POOL: Mutex<Option<Arc<PvPool>>> = parking_lot::const_mutex(None);

/// Install the process-wide pool. Fails if one is already installed.
pub fn install_pool(connector: Arc<dyn PvConnector>) -> Result<Arc<PvPool>, RuntimeError> {
    let mut slot = POOL.lock();
    if slot.is_some() {
        return Err(RuntimeError::PoolAlreadyInstalled);
    }
    let pool = Arc::new(PvPool::new(connector));
    *slot = Some(Arc::clone(&pool));
    Ok(pool)
}

/// The process-wide pool, if installed.
#[must_use]
pub fn pool() -> Option<Arc<PvPool>> {
    POOL.lock().clone()
}

/// Close all PVs of the process-wide pool and uninstall it.
pub fn teardown_pool() {
    let pool = POOL.lock().take();
    if let Some(pool) = pool {
        pool.close_all();
    }
}
