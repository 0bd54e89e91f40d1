//! The discovery session.
//!
//! [`DiscoService`] owns every piece of long-lived discovery state for
//! one connection: the disco#info and disco#items caches, the
//! per-resource capability bindings, and the caps cache with its probe
//! state. It is constructed once at connection setup, handed around by
//! cheap clones, and dropped at disconnect.
//!
//! All state mutations go through this type, so the at-most-one-probe
//! invariant holds no matter how many tasks feed presence and query
//! results in. Cache hits and misses are both delivered through the
//! same async call; callers cannot tell them apart except by latency.

use std::sync::Arc;
use std::time::Duration;

use jid::Jid;
use minidom::Element;
use tracing::{debug, warn};

use crate::cache::{DiscoInfoCache, DiscoItemsCache};
use crate::caps::{
    compute_caps_hash, extract_caps_from_presence, AdvanceOutcome, Caps, CapsAdvertisement,
    CapsCache, CapsKey, CapsLookup, HashAlgorithm, ObserveAction, ProbeTicket, ResourceBindings,
    DEFAULT_PROBE_TIMEOUT_SECS,
};
use crate::disco::{DiscoInfo, DiscoItems};
use crate::error::DiscoError;
use crate::transport::DiscoTransport;

/// Configuration for a discovery session.
#[derive(Debug, Clone)]
pub struct DiscoConfig {
    /// Age after which a pending caps probe counts as stalled and the
    /// next sighting of the hash takes over as the requestee.
    pub probe_timeout: Duration,
}

impl Default for DiscoConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }
}

struct Inner<T> {
    transport: T,
    info_cache: DiscoInfoCache,
    items_cache: DiscoItemsCache,
    caps: CapsCache,
    bindings: ResourceBindings,
}

/// Discovery session over a transport.
pub struct DiscoService<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for DiscoService<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: DiscoTransport + 'static> DiscoService<T> {
    /// Create a session with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, DiscoConfig::default())
    }

    /// Create a session with the given configuration.
    pub fn with_config(transport: T, config: DiscoConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                info_cache: DiscoInfoCache::new(),
                items_cache: DiscoItemsCache::new(),
                caps: CapsCache::new(config.probe_timeout),
                bindings: ResourceBindings::new(),
            }),
        }
    }

    /// Query an entity's disco#info, preferring cached knowledge.
    ///
    /// Without `force_refresh`, a cached entry answers immediately, and
    /// a query for an entity's root info (no node) can also be answered
    /// from its verified capability binding without any network traffic.
    /// Otherwise one request goes out; a successful response is cached
    /// under the node the peer reported before it is returned. Errors
    /// are returned as-is and never touch the cache.
    pub async fn info(
        &self,
        target: &Jid,
        node: Option<&str>,
        force_refresh: bool,
    ) -> Result<Arc<DiscoInfo>, DiscoError> {
        if !force_refresh {
            if let Some(cached) = self.inner.info_cache.get(target, node) {
                debug!(entity = %target, node = ?node, "disco#info cache hit");
                return Ok(cached);
            }
            if node.is_none() {
                if let Some(resolved) = self.capabilities_of(target) {
                    debug!(entity = %target, "Answering disco#info from verified caps");
                    return Ok(resolved);
                }
            }
        }

        let info = Arc::new(self.inner.transport.disco_info(target, node).await?);
        self.inner
            .info_cache
            .insert(target, info.node.as_deref(), Arc::clone(&info));
        Ok(info)
    }

    /// Query an entity's disco#items, preferring cached knowledge.
    ///
    /// Same caching contract as [`DiscoService::info`], without the
    /// capability shortcut (items are not part of the capability hash).
    pub async fn items(
        &self,
        target: &Jid,
        node: Option<&str>,
        force_refresh: bool,
    ) -> Result<Arc<DiscoItems>, DiscoError> {
        if !force_refresh {
            if let Some(cached) = self.inner.items_cache.get(target, node) {
                debug!(entity = %target, node = ?node, "disco#items cache hit");
                return Ok(cached);
            }
        }

        let items = Arc::new(self.inner.transport.disco_items(target, node).await?);
        self.inner
            .items_cache
            .insert(target, items.node.as_deref(), Arc::clone(&items));
        Ok(items)
    }

    /// Drop the cached disco#info entry for (entity, node), if any.
    /// The next query goes to the network.
    pub fn invalidate_info(&self, target: &Jid, node: Option<&str>) -> bool {
        self.inner.info_cache.invalidate(target, node)
    }

    /// Drop the cached disco#items entry for (entity, node), if any.
    pub fn invalidate_items(&self, target: &Jid, node: Option<&str>) -> bool {
        self.inner.items_cache.invalidate(target, node)
    }

    /// Feed a presence stanza into the capability engine.
    ///
    /// Modern (hashed) advertisements are observed; legacy pre-hash
    /// advertisements are dropped here, deliberately and completely.
    pub fn handle_presence(&self, from: &Jid, presence: &Element) {
        match extract_caps_from_presence(presence) {
            Some(CapsAdvertisement::Hashed(caps)) => self.observe(from, &caps),
            Some(CapsAdvertisement::Legacy) => {
                debug!(from = %from, "Ignoring legacy caps advertisement");
            }
            None => {}
        }
    }

    /// Record that `from` advertises `caps`, probing if the hash is new.
    ///
    /// Advertisements naming an unsupported hash algorithm are declined
    /// outright: no binding, no cache entry, no request.
    pub fn observe(&self, from: &Jid, caps: &Caps) {
        let Some(algorithm) = HashAlgorithm::from_wire_name(&caps.hash) else {
            debug!(
                from = %from,
                algorithm = %caps.hash,
                "Unsupported caps hash algorithm, declining to probe"
            );
            return;
        };

        let key = CapsKey::new(algorithm, &caps.ver);
        self.inner.bindings.record(from, key.clone());

        match self.inner.caps.observe(from, &caps.node, key) {
            ObserveAction::Launch(ticket) => self.spawn_probe(ticket),
            ObserveAction::Queued | ObserveAction::AlreadyResolved => {}
        }
    }

    /// The verified capability set `jid` currently advertises, if its
    /// binding has been resolved.
    pub fn capabilities_of(&self, jid: &Jid) -> Option<Arc<DiscoInfo>> {
        let key = self.inner.bindings.get(jid)?;
        self.inner.caps.resolved(&key)
    }

    /// State of a capability key.
    pub fn caps_lookup(&self, key: &CapsKey) -> CapsLookup {
        self.inner.caps.lookup(key)
    }

    /// The capability cache.
    pub fn caps(&self) -> &CapsCache {
        &self.inner.caps
    }

    /// The per-resource capability bindings.
    pub fn bindings(&self) -> &ResourceBindings {
        &self.inner.bindings
    }

    fn spawn_probe(&self, ticket: ProbeTicket) {
        let service = self.clone();
        tokio::spawn(async move {
            service.run_probe(ticket).await;
        });
    }

    /// Drive one capability key to resolution or abandonment.
    ///
    /// One request is in flight at a time. A response only counts if the
    /// hash re-derived from it matches the advertised value; anything
    /// else advances to the next queued candidate. When a takeover
    /// attempt has replaced this one in the meantime, the advance is
    /// reported stale and this task simply ends.
    async fn run_probe(&self, mut ticket: ProbeTicket) {
        loop {
            let query_node = ticket.query_node();
            let result = self
                .inner
                .transport
                .disco_info(&ticket.target, Some(&query_node))
                .await;

            match result {
                Ok(info) => {
                    let computed = compute_caps_hash(&info, ticket.key.algorithm);
                    if computed == ticket.key.ver {
                        self.inner.caps.commit(&ticket.key, Arc::new(info));
                        return;
                    }
                    warn!(
                        target = %ticket.target,
                        ver = %ticket.key.ver,
                        computed = %computed,
                        "Caps hash mismatch, peer misreported its capabilities"
                    );
                }
                Err(error) => {
                    debug!(
                        target = %ticket.target,
                        ver = %ticket.key.ver,
                        error = %error,
                        "Caps probe request failed"
                    );
                }
            }

            match self.inner.caps.advance(&ticket.key, ticket.attempt) {
                AdvanceOutcome::Next(next) => ticket = next,
                AdvanceOutcome::Exhausted | AdvanceOutcome::Stale => return,
            }
        }
    }
}
