//! Memoization stores for disco query results.
//!
//! Both caches are keyed by (entity, node) and hold results until they
//! are explicitly invalidated; there is no expiry. Writers key entries
//! by the node the peer reported in its response, which is authoritative
//! over the node that was asked for.

use std::sync::Arc;

use dashmap::DashMap;
use jid::Jid;
use tracing::debug;

use crate::disco::{DiscoInfo, DiscoItems};

/// Scope of one cached disco query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    jid: Jid,
    node: Option<String>,
}

impl CacheKey {
    fn new(jid: &Jid, node: Option<&str>) -> Self {
        Self {
            jid: jid.clone(),
            node: node.map(|s| s.to_string()),
        }
    }
}

/// Cache of disco#info results by (entity, node).
#[derive(Debug, Clone, Default)]
pub struct DiscoInfoCache {
    entries: Arc<DashMap<CacheKey, Arc<DiscoInfo>>>,
}

impl DiscoInfoCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a cached result.
    pub fn get(&self, jid: &Jid, node: Option<&str>) -> Option<Arc<DiscoInfo>> {
        self.entries
            .get(&CacheKey::new(jid, node))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Store a result.
    pub fn insert(&self, jid: &Jid, node: Option<&str>, info: Arc<DiscoInfo>) {
        debug!(entity = %jid, node = ?node, features = info.features.len(), "Caching disco#info");
        self.entries.insert(CacheKey::new(jid, node), info);
    }

    /// Remove a cached entry. Returns whether one existed. In-flight
    /// requests are unaffected; their responses repopulate the cache.
    pub fn invalidate(&self, jid: &Jid, node: Option<&str>) -> bool {
        self.entries.remove(&CacheKey::new(jid, node)).is_some()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Cache of disco#items results by (entity, node).
#[derive(Debug, Clone, Default)]
pub struct DiscoItemsCache {
    entries: Arc<DashMap<CacheKey, Arc<DiscoItems>>>,
}

impl DiscoItemsCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a cached result.
    pub fn get(&self, jid: &Jid, node: Option<&str>) -> Option<Arc<DiscoItems>> {
        self.entries
            .get(&CacheKey::new(jid, node))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Store a result.
    pub fn insert(&self, jid: &Jid, node: Option<&str>, items: Arc<DiscoItems>) {
        debug!(entity = %jid, node = ?node, items = items.items.len(), "Caching disco#items");
        self.entries.insert(CacheKey::new(jid, node), items);
    }

    /// Remove a cached entry. Returns whether one existed.
    pub fn invalidate(&self, jid: &Jid, node: Option<&str>) -> bool {
        self.entries.remove(&CacheKey::new(jid, node)).is_some()
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disco::{DiscoItem, Identity};

    fn jid(s: &str) -> Jid {
        s.parse().unwrap()
    }

    fn info() -> Arc<DiscoInfo> {
        Arc::new(DiscoInfo::new(None).with_identity(Identity::server(Some("Waddle"))))
    }

    #[test]
    fn test_info_cache_keys_on_entity_and_node() {
        let cache = DiscoInfoCache::new();
        let target = jid("waddle.social");

        cache.insert(&target, None, info());
        assert!(cache.get(&target, None).is_some());
        assert!(cache.get(&target, Some("other")).is_none());
        assert!(cache.get(&jid("elsewhere.example"), None).is_none());
    }

    #[test]
    fn test_info_cache_invalidate() {
        let cache = DiscoInfoCache::new();
        let target = jid("waddle.social");

        cache.insert(&target, Some("node"), info());
        assert!(cache.invalidate(&target, Some("node")));
        assert!(!cache.invalidate(&target, Some("node")));
        assert!(cache.get(&target, Some("node")).is_none());
    }

    #[test]
    fn test_info_cache_overwrites() {
        let cache = DiscoInfoCache::new();
        let target = jid("waddle.social");

        cache.insert(&target, None, info());
        let replacement = Arc::new(DiscoInfo::new(None).with_feature("urn:xmpp:mam:2"));
        cache.insert(&target, None, Arc::clone(&replacement));

        let cached = cache.get(&target, None).unwrap();
        assert!(cached.has_feature("urn:xmpp:mam:2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_items_cache_round_trip() {
        let cache = DiscoItemsCache::new();
        let target = jid("waddle.social");
        let items = Arc::new(DiscoItems::new(None).with_item(DiscoItem::new(
            Some("muc.waddle.social"),
            None,
            None,
        )));

        cache.insert(&target, None, Arc::clone(&items));
        assert_eq!(cache.get(&target, None), Some(items));

        cache.clear();
        assert!(cache.is_empty());
    }
}
