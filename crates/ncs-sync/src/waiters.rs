//! Waiter table: one-shot wake-up signals keyed by `(node, target state)`.

use std::collections::HashMap;

use tokio::sync::oneshot;

use ncs_types::{NodeId, NodeState};

/// Key under which waiters are registered.
pub type WaiterKey = (NodeId, NodeState);

/// Identifies one registration so it can be withdrawn.
pub type WaiterToken = u64;

/// Pending one-shot signals, grouped by the transition they wait for.
///
/// Not synchronized on its own; the synchronizer keeps it behind the same
/// mutex as the registry.
#[derive(Debug, Default)]
pub struct WaiterTable {
    next_token: WaiterToken,
    waiters: HashMap<WaiterKey, Vec<(WaiterToken, oneshot::Sender<()>)>>,
}

impl WaiterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll a waiter for `key`.
    pub fn register(&mut self, key: WaiterKey) -> (WaiterToken, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let token = self.next_token;
        self.next_token += 1;
        self.waiters.entry(key).or_default().push((token, tx));
        (token, rx)
    }

    /// Wake and remove every waiter registered for `key`.
    ///
    /// Returns how many waiters were still listening.
    pub fn notify(&mut self, key: &WaiterKey) -> usize {
        let Some(entries) = self.waiters.remove(key) else {
            return 0;
        };
        entries
            .into_iter()
            .filter_map(|(_, tx)| tx.send(()).ok())
            .count()
    }

    /// Withdraw one registration. Returns `false` if it already fired or
    /// was never there.
    pub fn deregister(&mut self, key: &WaiterKey, token: WaiterToken) -> bool {
        let Some(entries) = self.waiters.get_mut(key) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(t, _)| *t != token);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.waiters.remove(key);
        }
        removed
    }

    /// Drop every registration. Their receivers observe a closed channel.
    pub fn clear(&mut self) -> usize {
        let count = self.len();
        self.waiters.clear();
        count
    }

    /// Total registered waiters across all keys.
    pub fn len(&self) -> usize {
        self.waiters.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Waiters registered for one key.
    pub fn count_for(&self, key: &WaiterKey) -> usize {
        self.waiters.get(key).map_or(0, Vec::len)
    }
}
