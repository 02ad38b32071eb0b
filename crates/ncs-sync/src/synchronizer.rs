use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info};

use ncs_registry::{NodeQuery, NodeRegistry, NodeTemplate};
use ncs_types::{MetadataObject, NodeId, NodeState, StateCatalog, TypeError};

use crate::error::{Result, SyncError};
use crate::waiters::{WaiterKey, WaiterTable, WaiterToken};

/// Everything guarded by the synchronizer's single mutex.
#[derive(Debug)]
struct Shared {
    registry: NodeRegistry,
    waiters: WaiterTable,
    closed: bool,
}

/// Owns the node registry and coordinates state transitions with waiters.
///
/// Cloning is cheap and every clone shares the same nodes and waiters. The
/// mutex is never held across an `.await`; suspension happens on one-shot
/// receivers after the lock is released.
#[derive(Clone, Debug)]
pub struct StateSynchronizer {
    shared: Arc<Mutex<Shared>>,
    catalog: Arc<StateCatalog>,
}

impl StateSynchronizer {
    /// Create a synchronizer over an empty registry.
    pub fn new(catalog: StateCatalog) -> Self {
        Self::with_registry(NodeRegistry::new(), catalog)
    }

    /// Create a synchronizer that takes ownership of an existing registry.
    pub fn with_registry(registry: NodeRegistry, catalog: StateCatalog) -> Self {
        info!(open_catalog = catalog.is_open(), "state synchronizer started");
        Self {
            shared: Arc::new(Mutex::new(Shared {
                registry,
                waiters: WaiterTable::new(),
                closed: false,
            })),
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &StateCatalog {
        &self.catalog
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shared>> {
        self.shared
            .lock()
            .map_err(|e| SyncError::Internal(format!("lock poisoned: {e}")))
    }

    // ---- Registry access ----

    /// Create one node and return its identity.
    pub fn create(&self, template: NodeTemplate) -> Result<NodeId> {
        Ok(self.lock()?.registry.create(template)?)
    }

    /// Validate a raw JSON batch of templates, then create all of them.
    pub fn create_from_values(&self, values: Vec<Value>) -> Result<Vec<NodeId>> {
        let ids = self.lock()?.registry.create_from_values(values)?;
        info!(count = ids.len(), "nodes created");
        Ok(ids)
    }

    pub fn state(&self, id: NodeId) -> Result<NodeState> {
        Ok(self.lock()?.registry.state(id)?.clone())
    }

    pub fn query(&self, query: &NodeQuery) -> Result<Vec<MetadataObject>> {
        Ok(self.lock()?.registry.query(query))
    }

    pub fn data_keys(&self, id: NodeId) -> Result<Vec<String>> {
        Ok(self.lock()?.registry.data_keys(id)?)
    }

    pub fn get_data(&self, id: NodeId, key: &str) -> Result<Value> {
        Ok(self.lock()?.registry.get_data(id, key)?.clone())
    }

    pub fn put_data(&self, id: NodeId, key: &str, value: Value) -> Result<Option<Value>> {
        Ok(self.lock()?.registry.put_data(id, key, value)?)
    }

    /// Number of nodes in the registry.
    pub fn node_count(&self) -> Result<usize> {
        Ok(self.lock()?.registry.len())
    }

    /// Number of waiters currently suspended.
    pub fn waiter_count(&self) -> Result<usize> {
        Ok(self.lock()?.waiters.len())
    }

    // ---- Request validation ----

    /// Parse a state label and check it against the catalog.
    pub fn parse_state(&self, label: &str) -> Result<NodeState> {
        self.catalog.parse(label).map_err(|e| match e {
            TypeError::InvalidState(s) | TypeError::UnrecognizedState(s) => {
                SyncError::UnrecognizedState(s)
            }
            other => SyncError::UnrecognizedState(other.to_string()),
        })
    }

    /// Parse a comma separated identity list and check that every entry was
    /// issued. The list is returned as given, duplicates included.
    pub fn resolve_ids(&self, raw: &str) -> Result<Vec<NodeId>> {
        let shared = self.lock()?;
        raw.split(',')
            .map(|part| match NodeId::parse(part) {
                Ok(id) if shared.registry.contains(id) => Ok(id),
                _ => Err(SyncError::UnknownNode(part.to_string())),
            })
            .collect()
    }

    fn check_known(shared: &Shared, ids: &[NodeId]) -> Result<()> {
        match ids.iter().find(|id| !shared.registry.contains(**id)) {
            Some(id) => Err(SyncError::UnknownNode(id.to_string())),
            None => Ok(()),
        }
    }

    fn check_recognized(&self, state: &NodeState) -> Result<()> {
        if self.catalog.recognizes(state) {
            Ok(())
        } else {
            Err(SyncError::UnrecognizedState(state.to_string()))
        }
    }

    // ---- Transitions ----

    /// Move one node to `state` and wake every waiter on `(id, state)`.
    ///
    /// Returns the number of waiters woken.
    pub fn set_state(&self, id: NodeId, state: NodeState) -> Result<usize> {
        self.set_state_all(&[id], state)
    }

    /// Move every listed node to `state`.
    ///
    /// All identities are checked before any node changes, so an unknown
    /// identity leaves every node untouched.
    pub fn set_state_all(&self, ids: &[NodeId], state: NodeState) -> Result<usize> {
        self.check_recognized(&state)?;
        let mut shared = self.lock()?;
        Self::check_known(&shared, ids)?;

        let mut woken = 0;
        for &id in ids {
            shared.registry.set_state(id, state.clone())?;
            woken += shared.waiters.notify(&(id, state.clone()));
        }
        debug!(count = ids.len(), state = %state, woken, "state applied");
        Ok(woken)
    }

    /// Request termination of one node.
    pub fn kill(&self, id: NodeId) -> Result<usize> {
        self.kill_all(&[id])
    }

    /// Request termination of every listed node.
    pub fn kill_all(&self, ids: &[NodeId]) -> Result<usize> {
        let woken = self.set_state_all(ids, NodeState::KILLING)?;
        info!(count = ids.len(), "kill requested");
        Ok(woken)
    }

    // ---- Waits ----

    /// Register interest in `ids` reaching `state`.
    ///
    /// Nodes already in `state` are not registered. The state check and the
    /// registration happen in one critical section. The returned guard
    /// withdraws whatever is still pending when it is dropped.
    pub fn prepare_wait(&self, ids: &[NodeId], state: &NodeState) -> Result<PendingWait> {
        self.check_recognized(state)?;
        let mut shared = self.lock()?;
        if shared.closed {
            return Err(SyncError::Closed);
        }
        Self::check_known(&shared, ids)?;

        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for &id in ids {
            if !seen.insert(id) || shared.registry.state(id)? == state {
                continue;
            }
            let key: WaiterKey = (id, state.clone());
            let (token, receiver) = shared.waiters.register(key.clone());
            entries.push(PendingEntry {
                key,
                token,
                receiver,
            });
        }
        debug!(registered = entries.len(), state = %state, "wait prepared");

        Ok(PendingWait {
            shared: Arc::downgrade(&self.shared),
            entries,
        })
    }

    /// Suspend until node `id` is in `state`. Returns at once if it already is.
    pub async fn wait_for_state(&self, id: NodeId, state: &NodeState) -> Result<()> {
        self.prepare_wait(&[id], state)?.wait().await
    }

    /// Suspend until every node in `ids` is in `state`.
    pub async fn wait_for_all(&self, ids: &[NodeId], state: &NodeState) -> Result<()> {
        self.prepare_wait(ids, state)?.wait().await
    }

    /// Drop every pending waiter and refuse new waits. Suspended callers
    /// resolve with [`SyncError::Closed`]. Returns how many were dropped.
    pub fn shutdown(&self) -> Result<usize> {
        let mut shared = self.lock()?;
        shared.closed = true;
        let dropped = shared.waiters.clear();
        info!(dropped, "state synchronizer shut down");
        Ok(dropped)
    }
}

#[derive(Debug)]
struct PendingEntry {
    key: WaiterKey,
    token: WaiterToken,
    receiver: oneshot::Receiver<()>,
}

/// Waiters registered by [`StateSynchronizer::prepare_wait`].
///
/// Resolve it with [`PendingWait::wait`]. Dropping it early (timeout,
/// disconnected caller) withdraws the registrations that have not fired.
#[derive(Debug)]
#[must_use = "a pending wait does nothing unless awaited"]
pub struct PendingWait {
    shared: Weak<Mutex<Shared>>,
    entries: Vec<PendingEntry>,
}

impl PendingWait {
    /// Returns `true` if nothing had to be registered.
    pub fn is_ready(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registrations still outstanding.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Suspend until every registered waiter has fired.
    pub async fn wait(mut self) -> Result<()> {
        while let Some(entry) = self.entries.last_mut() {
            (&mut entry.receiver)
                .await
                .map_err(|_| SyncError::Closed)?;
            self.entries.pop();
        }
        Ok(())
    }
}

impl Drop for PendingWait {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let Ok(mut guard) = shared.lock() else {
            return;
        };
        let withdrawn = self
            .entries
            .iter()
            .filter(|e| guard.waiters.deregister(&e.key, e.token))
            .count();
        debug!(withdrawn, "abandoned wait withdrawn");
    }
}
