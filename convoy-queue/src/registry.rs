//! In-flight message bookkeeping.
//!
//! Between receive and acknowledgement, the client has to remember which
//! raw queue deliveries back each message it handed out. Identity is the
//! message *content*: the registry keys on the serialized byte string of
//! the value, so two received messages that encode identically share one
//! record and accumulate handles in arrival order.
//!
//! The mutex here guards in-memory state only. Callers copy out whatever
//! they need (front handle, raw body, overflow flag) and perform every
//! cloud call after the guard is dropped.

use std::collections::{HashMap, VecDeque, hash_map::Entry};

use parking_lot::Mutex;

use convoy_cloud::RawMessage;

#[derive(Debug)]
struct InFlightEntry {
    /// Raw deliveries backing this value, in arrival order. Never empty
    /// while the entry exists.
    messages: VecDeque<RawMessage>,
    /// Whether the deliveries are overflow wrappers. Fixed at insertion.
    overflowing: bool,
}

/// Registry of received-but-unacknowledged messages, keyed by serialized
/// content.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    entries: Mutex<HashMap<Vec<u8>, InFlightEntry>>,
}

impl InFlightRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivery under `key`.
    ///
    /// A new key creates a record with the given overflow flag; an existing
    /// key appends the delivery and keeps the record's original flag.
    pub fn insert_or_append(&self, key: Vec<u8>, message: RawMessage, overflowing: bool) {
        let mut entries = self.entries.lock();
        match entries.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().messages.push_back(message),
            Entry::Vacant(slot) => {
                slot.insert(InFlightEntry {
                    messages: VecDeque::from([message]),
                    overflowing,
                });
            }
        }
    }

    /// Atomically move the record at `old_key` under `new_key`.
    ///
    /// Used when an overflow wrapper is resolved to the message it stood
    /// for. If `new_key` already has a record, the moved deliveries are
    /// appended to it. A missing `old_key` is a no-op.
    pub fn rekey(&self, old_key: &[u8], new_key: Vec<u8>) {
        let mut entries = self.entries.lock();
        let Some(moved) = entries.remove(old_key) else {
            return;
        };
        match entries.entry(new_key) {
            Entry::Occupied(mut entry) => entry.get_mut().messages.extend(moved.messages),
            Entry::Vacant(slot) => {
                slot.insert(moved);
            }
        }
    }

    /// Copy out the oldest delivery for `key` and its overflow flag.
    #[must_use]
    pub fn lookup_front(&self, key: &[u8]) -> Option<(RawMessage, bool)> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .and_then(|entry| entry.messages.front().map(|m| (m.clone(), entry.overflowing)))
    }

    /// Drop the oldest delivery for `key`, removing the record entirely
    /// once its last delivery is gone. Returns `true` if a delivery was
    /// dropped.
    pub fn pop_front(&self, key: &[u8]) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        entry.messages.pop_front();
        if entry.messages.is_empty() {
            entries.remove(key);
        }
        true
    }

    /// Drop the whole record for `key`, regardless of how many deliveries
    /// it still holds. Returns `true` if a record existed.
    pub fn remove(&self, key: &[u8]) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    /// Number of distinct in-flight values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Whether the registry mutex is currently held.
    ///
    /// Instrumentation hook: gateway probes use this to verify no cloud
    /// call ever runs inside the critical section.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.entries.is_locked()
    }
}
