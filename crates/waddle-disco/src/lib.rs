//! # waddle-disco
//!
//! Service discovery and entity capabilities engine for Waddle Social
//! clients.
//!
//! This crate implements the client side of XEP-0030 (Service Discovery)
//! and XEP-0115 (Entity Capabilities) as an in-process library: wire
//! codecs, memoizing disco caches, and the capability-hash verification
//! and resolution machinery. Stanza transport stays behind the
//! [`DiscoTransport`] seam, so the engine runs the same against a live
//! connection or a test double.
//!
//! ## Architecture
//!
//! - **Codecs** ([`disco`]): query builders, result parsers, and
//!   responder helpers for disco#info / disco#items, including extended
//!   data forms
//! - **Caches** ([`cache`]): (entity, node) keyed stores for query
//!   results, explicit invalidation only
//! - **Capabilities** ([`caps`]): the verification-string algorithm,
//!   the hash cache with its probe state machine, and per-resource
//!   bindings
//! - **Session** ([`service`]): one [`DiscoService`] per connection
//!   owning all of the above and driving probes
//!
//! ## Resolution flow
//!
//! A presence stanza carrying `<c hash='sha-1' node='…' ver='…'/>` is
//! fed to [`DiscoService::handle_presence`]. An unknown hash triggers a
//! disco#info probe of the advertising entity at `node#ver`; the
//! response is accepted only if re-deriving the hash from it reproduces
//! the advertised value. Entities seen advertising a hash that is
//! already being probed queue up as fallbacks and are tried in order
//! when an attempt fails, mismatches, or stalls. Verified hashes answer
//! later disco#info queries without any network traffic.

pub mod cache;
pub mod caps;
pub mod disco;
pub mod service;
pub mod transport;

mod error;

pub use cache::{DiscoInfoCache, DiscoItemsCache};
pub use caps::{
    build_caps_element, build_verification_string, compute_caps_hash, extract_caps_from_presence,
    is_caps_node_query, parse_caps_node, Caps, CapsAdvertisement, CapsCache, CapsKey, CapsLookup,
    HashAlgorithm, ResourceBindings, NS_CAPS, WADDLE_CAPS_NODE,
};
pub use disco::{DataForm, DiscoInfo, DiscoItem, DiscoItems, Identity};
pub use error::{DiscoError, RequestError};
pub use service::{DiscoConfig, DiscoService};
pub use transport::DiscoTransport;
