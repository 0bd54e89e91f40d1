//! Per-resource capability bindings.
//!
//! Remembers which capability key each (entity, resource) currently
//! advertises. Every capability-bearing presence overwrites the previous
//! binding for that resource; bindings are never deleted, only
//! superseded, and a stale binding is harmless (the caps cache it points
//! into either answers or does not).

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use jid::{BareJid, Jid};

use super::cache::CapsKey;

/// Resource-level presence bindings: bare JID -> (resource -> key).
///
/// Servers and components advertise from a bare JID; those bindings live
/// under the empty resource.
#[derive(Debug, Clone, Default)]
pub struct ResourceBindings {
    bindings: Arc<DashMap<BareJid, HashMap<String, CapsKey>>>,
}

impl ResourceBindings {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the key `from` currently advertises, replacing any
    /// previous binding for that resource.
    pub fn record(&self, from: &Jid, key: CapsKey) {
        let resource = from
            .resource()
            .map(|r| r.to_string())
            .unwrap_or_default();
        self.bindings
            .entry(from.to_bare())
            .or_default()
            .insert(resource, key);
    }

    /// The key `jid` was last seen advertising, if any.
    pub fn get(&self, jid: &Jid) -> Option<CapsKey> {
        let resource = jid
            .resource()
            .map(|r| r.to_string())
            .unwrap_or_default();
        self.bindings
            .get(&jid.to_bare())
            .and_then(|resources| resources.get(&resource).cloned())
    }

    /// Number of entities with at least one bound resource.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if no bindings are recorded.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Drop all bindings.
    pub fn clear(&self) {
        self.bindings.clear();
    }
}
