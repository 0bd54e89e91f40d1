//! XEP-0115: Entity Capabilities.
//!
//! Entities append a `<c/>` element to presence advertising a hash of
//! their disco#info. Receivers that already verified that hash can skip
//! the disco round trip entirely; unknown hashes are resolved by probing
//! the advertising entity (with fallback to other entities seen carrying
//! the same hash) and re-deriving the hash from the response before
//! trusting it.
//!
//! ## Key Components
//!
//! - [`Caps`]: the `<c>` element included in presence stanzas
//! - [`compute_caps_hash`]: the verification-string algorithm
//! - [`CapsCache`]: hash-to-disco#info cache and probe state machine
//! - [`ResourceBindings`]: which hash each (entity, resource) advertises
//!
//! ## References
//!
//! - <https://xmpp.org/extensions/xep-0115.html>

pub mod bindings;
pub mod cache;
pub mod hash;

pub use bindings::ResourceBindings;
pub use cache::{
    AdvanceOutcome, CapsCache, CapsKey, CapsLookup, ObserveAction, ProbeTicket,
    DEFAULT_PROBE_TIMEOUT_SECS,
};
pub use hash::{build_verification_string, compute_caps_hash, HashAlgorithm};

use minidom::Element;

use crate::disco::DiscoInfo;

/// XEP-0115 Entity Capabilities namespace.
pub const NS_CAPS: &str = "http://jabber.org/protocol/caps";

/// Default node for Waddle's own capabilities.
pub const WADDLE_CAPS_NODE: &str = "https://waddle.social/caps";

/// Entity Capabilities element (`<c xmlns='http://jabber.org/protocol/caps'>`).
///
/// Included in presence stanzas to advertise capabilities via a hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    /// Hash algorithm name as it appeared on the wire
    pub hash: String,
    /// Node identifying the software (e.g., "https://waddle.social/caps")
    pub node: String,
    /// Verification string (base64 digest of the canonical disco#info)
    pub ver: String,
}

/// A capability advertisement found in presence.
///
/// The pre-hash generation of this protocol used `<c/>` without a
/// `hash` attribute; those advertisements carry nothing verifiable and
/// are deliberately ignored everywhere in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapsAdvertisement {
    /// Modern advertisement carrying a verification hash
    Hashed(Caps),
    /// Legacy advertisement without a hash; ignored as a no-op
    Legacy,
}

impl Caps {
    /// Create a new Caps element with the SHA-1 hash algorithm.
    pub fn new(node: &str, ver: &str) -> Self {
        Self {
            hash: "sha-1".to_string(),
            node: node.to_string(),
            ver: ver.to_string(),
        }
    }

    /// Create Caps for Waddle itself with the given verification string.
    pub fn waddle(ver: &str) -> Self {
        Self::new(WADDLE_CAPS_NODE, ver)
    }

    /// Get the node#ver string used in disco#info queries for this hash.
    pub fn node_ver(&self) -> String {
        format!("{}#{}", self.node, self.ver)
    }

    /// Build the `<c>` element for inclusion in presence stanzas.
    pub fn build_element(&self) -> Element {
        Element::builder("c", NS_CAPS)
            .attr("hash", &self.hash)
            .attr("node", &self.node)
            .attr("ver", &self.ver)
            .build()
    }

    /// Parse a `<c>` element.
    ///
    /// Returns `Legacy` when the element has no `hash` attribute, and
    /// `None` when the element is not a caps element at all or lacks the
    /// required node/ver attributes.
    pub fn from_element(elem: &Element) -> Option<CapsAdvertisement> {
        if elem.name() != "c" || elem.ns() != NS_CAPS {
            return None;
        }

        let node = elem.attr("node")?.to_string();
        let ver = elem.attr("ver")?.to_string();

        match elem.attr("hash") {
            Some(hash) => Some(CapsAdvertisement::Hashed(Caps {
                hash: hash.to_string(),
                node,
                ver,
            })),
            None => Some(CapsAdvertisement::Legacy),
        }
    }
}

/// Build a `<c>` caps element advertising the hash of `info`.
pub fn build_caps_element(node: &str, info: &DiscoInfo) -> Element {
    let ver = compute_caps_hash(info, HashAlgorithm::Sha1);
    Caps::new(node, &ver).build_element()
}

/// Extract a capability advertisement from a presence stanza element.
pub fn extract_caps_from_presence(presence: &Element) -> Option<CapsAdvertisement> {
    presence
        .children()
        .find(|child| child.name() == "c" && child.ns() == NS_CAPS)
        .and_then(Caps::from_element)
}

/// Check if a disco#info query node is a caps node ("node#ver").
pub fn is_caps_node_query(node: Option<&str>) -> bool {
    node.map(|n| n.contains('#')).unwrap_or(false)
}

/// Split a caps query node into (node, ver).
///
/// Returns `None` if the node contains no '#'.
pub fn parse_caps_node(node: &str) -> Option<(&str, &str)> {
    node.split_once('#')
}
