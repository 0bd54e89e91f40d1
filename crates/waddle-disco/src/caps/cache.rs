//! Capability hash cache and probe bookkeeping.
//!
//! Maps capability keys (algorithm + verification value) to either a
//! verified disco#info result or the state of an in-flight probe. The
//! cache itself is the state machine: [`CapsCache::observe`] decides
//! whether a sighting launches a probe, joins the fallback queue, or is
//! already answered; [`CapsCache::commit`] and [`CapsCache::advance`]
//! apply probe outcomes.
//!
//! Only one outbound probe is ever active per key. Entities advertising
//! a hash that is already being probed become fallback candidates, tried
//! in order if the current attempt fails, times out, or turns out to be
//! lying about its hash.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jid::Jid;
use tracing::debug;

use super::hash::HashAlgorithm;
use crate::disco::DiscoInfo;

/// Default age after which a pending probe is considered stalled and a
/// newly-sighted entity takes over as the requestee.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// A claimed capability signature.
///
/// Two keys are equal only if both the algorithm and the exact
/// verification value match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapsKey {
    /// Hash algorithm the verification value was produced with
    pub algorithm: HashAlgorithm,
    /// Advertised verification value (base64 digest)
    pub ver: String,
}

impl CapsKey {
    /// Create a new capability key.
    pub fn new(algorithm: HashAlgorithm, ver: &str) -> Self {
        Self {
            algorithm,
            ver: ver.to_string(),
        }
    }
}

/// One scheduled probe attempt.
///
/// `attempt` identifies the attempt: outcomes reported with a tag that
/// no longer matches the entry's current state are stale and must not
/// advance the queue.
#[derive(Debug, Clone)]
pub struct ProbeTicket {
    /// Key being resolved
    pub key: CapsKey,
    /// Entity to query
    pub target: Jid,
    /// Caps node the target advertised (queried as `node#ver`)
    pub node: String,
    /// Attempt tag
    pub attempt: u64,
}

impl ProbeTicket {
    /// The node-qualified identifier to put in the disco#info query.
    pub fn query_node(&self) -> String {
        format!("{}#{}", self.node, self.key.ver)
    }
}

/// A fallback entity waiting its turn, with the node it advertised.
#[derive(Debug, Clone)]
struct Candidate {
    jid: Jid,
    node: String,
}

/// Bookkeeping for an unresolved key.
///
/// `started_at` ages the current attempt for the takeover timeout;
/// `attempt` increments every time the requestee changes, so a
/// superseded attempt can never be mistaken for the live one.
#[derive(Debug)]
struct ProbeState {
    started_at: Instant,
    attempt: u64,
    current: Jid,
    candidates: VecDeque<Candidate>,
}

/// State of one capability key: probing or verified.
///
/// The tag is explicit so a resolved result can never be confused with
/// probe bookkeeping.
#[derive(Debug)]
enum CapsEntry {
    Pending(ProbeState),
    Resolved(Arc<DiscoInfo>),
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub enum CapsLookup {
    /// Key verified; here is what the hash stands for
    Resolved(Arc<DiscoInfo>),
    /// A probe for this key is in flight
    Pending,
    /// Never seen (or abandoned after exhausting all candidates)
    Unknown,
}

/// What a sighting of (entity, key) requires of the caller.
#[derive(Debug)]
pub enum ObserveAction {
    /// Issue a disco#info request described by the ticket
    Launch(ProbeTicket),
    /// An attempt is already running; the entity was queued (or already
    /// known) as a fallback candidate
    Queued,
    /// The key is already resolved
    AlreadyResolved,
}

/// What a failed attempt leads to.
#[derive(Debug)]
pub enum AdvanceOutcome {
    /// Try the next candidate, described by the ticket
    Next(ProbeTicket),
    /// No candidates left; the key was dropped entirely
    Exhausted,
    /// The attempt tag did not match current state; nothing changed
    Stale,
}

/// Cache of capability keys to verified results or probe state.
#[derive(Debug, Clone)]
pub struct CapsCache {
    entries: Arc<DashMap<CapsKey, CapsEntry>>,
    probe_timeout: Duration,
}

impl Default for CapsCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS))
    }
}

impl CapsCache {
    /// Create a new cache with the given probe takeover timeout.
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            probe_timeout,
        }
    }

    /// Look up the state of a key.
    pub fn lookup(&self, key: &CapsKey) -> CapsLookup {
        match self.entries.get(key) {
            Some(entry) => match entry.value() {
                CapsEntry::Resolved(info) => CapsLookup::Resolved(Arc::clone(info)),
                CapsEntry::Pending(_) => CapsLookup::Pending,
            },
            None => CapsLookup::Unknown,
        }
    }

    /// Look up the verified result for a key, if there is one.
    pub fn resolved(&self, key: &CapsKey) -> Option<Arc<DiscoInfo>> {
        match self.lookup(key) {
            CapsLookup::Resolved(info) => Some(info),
            _ => None,
        }
    }

    /// Record that `from` was seen advertising `key` under `node`.
    ///
    /// An unknown key creates a pending entry and asks the caller to
    /// probe `from`. While an attempt is fresh, further sightings only
    /// enqueue fallback candidates (each entity at most once). Once the
    /// attempt has aged past the probe timeout, the stalled requestee is
    /// written off and the new sighting takes over as the requestee.
    pub fn observe(&self, from: &Jid, node: &str, key: CapsKey) -> ObserveAction {
        match self.entries.entry(key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(CapsEntry::Pending(ProbeState {
                    started_at: Instant::now(),
                    attempt: 0,
                    current: from.clone(),
                    candidates: VecDeque::new(),
                }));
                debug!(ver = %key.ver, target = %from, "Launching caps probe");
                ObserveAction::Launch(ProbeTicket {
                    key,
                    target: from.clone(),
                    node: node.to_string(),
                    attempt: 0,
                })
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                CapsEntry::Resolved(_) => ObserveAction::AlreadyResolved,
                CapsEntry::Pending(state) => {
                    if state.started_at.elapsed() >= self.probe_timeout {
                        state.started_at = Instant::now();
                        state.attempt += 1;
                        state.current = from.clone();
                        debug!(ver = %key.ver, target = %from, "Probe stalled, retrying with new sighting");
                        ObserveAction::Launch(ProbeTicket {
                            key,
                            target: from.clone(),
                            node: node.to_string(),
                            attempt: state.attempt,
                        })
                    } else {
                        let already_known = state.current == *from
                            || state.candidates.iter().any(|c| c.jid == *from);
                        if !already_known {
                            state.candidates.push_back(Candidate {
                                jid: from.clone(),
                                node: node.to_string(),
                            });
                            debug!(
                                ver = %key.ver,
                                candidate = %from,
                                queued = state.candidates.len(),
                                "Queued fallback candidate for caps probe"
                            );
                        }
                        ObserveAction::Queued
                    }
                }
            },
        }
    }

    /// Store a verified result for `key`. Returns `false` when the key
    /// was already resolved or has been abandoned in the meantime.
    ///
    /// Callers must verify the hash before committing; the cache only
    /// enforces that Resolved is terminal. A verified result is accepted
    /// from any attempt, including a superseded one.
    pub fn commit(&self, key: &CapsKey, info: Arc<DiscoInfo>) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => match entry.value() {
                CapsEntry::Resolved(_) => false,
                CapsEntry::Pending(_) => {
                    debug!(
                        ver = %key.ver,
                        features = info.features.len(),
                        "Caps verified and cached"
                    );
                    *entry.value_mut() = CapsEntry::Resolved(info);
                    true
                }
            },
            None => false,
        }
    }

    /// Report that the attempt tagged `attempt` failed (error, timeout
    /// surfaced by the transport, or hash mismatch).
    ///
    /// Pops the next fallback candidate, or drops the key entirely when
    /// the queue is empty so a later sighting starts over. Outcomes from
    /// superseded attempts are ignored.
    pub fn advance(&self, key: &CapsKey, attempt: u64) -> AdvanceOutcome {
        let Entry::Occupied(mut slot) = self.entries.entry(key.clone()) else {
            return AdvanceOutcome::Stale;
        };

        let next = match slot.get_mut() {
            CapsEntry::Pending(state) if state.attempt == attempt => {
                match state.candidates.pop_front() {
                    Some(candidate) => {
                        state.started_at = Instant::now();
                        state.attempt += 1;
                        state.current = candidate.jid.clone();
                        Some(ProbeTicket {
                            key: key.clone(),
                            target: candidate.jid,
                            node: candidate.node,
                            attempt: state.attempt,
                        })
                    }
                    None => None,
                }
            }
            _ => return AdvanceOutcome::Stale,
        };

        match next {
            Some(ticket) => {
                debug!(ver = %key.ver, target = %ticket.target, "Advancing caps probe to next candidate");
                AdvanceOutcome::Next(ticket)
            }
            None => {
                slot.remove();
                debug!(ver = %key.ver, "Caps probe exhausted all candidates, dropping key");
                AdvanceOutcome::Exhausted
            }
        }
    }

    /// Number of known keys, pending or resolved.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry, pending and resolved alike.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
