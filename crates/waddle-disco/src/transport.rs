//! Transport seam for outbound discovery requests.
//!
//! The engine never touches the wire. A [`DiscoTransport`] implementation
//! owns stanza I/O, request-id assignment, and response correlation, and
//! hands back one parsed result (or error) per request. The codecs in
//! [`crate::disco`] provide the query builders and result parsers a
//! transport implementation needs.

use async_trait::async_trait;
use jid::Jid;

use crate::disco::{DiscoInfo, DiscoItems};
use crate::error::RequestError;

/// Outbound disco#info and disco#items requests.
///
/// Each call corresponds to exactly one IQ get. The future resolves when
/// the correlated response (or an error condition, including timeout)
/// arrives; it never blocks other requests from being issued.
#[async_trait]
pub trait DiscoTransport: Send + Sync {
    /// Send a disco#info query and await the parsed result.
    async fn disco_info(&self, to: &Jid, node: Option<&str>) -> Result<DiscoInfo, RequestError>;

    /// Send a disco#items query and await the parsed result.
    async fn disco_items(&self, to: &Jid, node: Option<&str>) -> Result<DiscoItems, RequestError>;
}

#[async_trait]
impl<T: DiscoTransport + ?Sized> DiscoTransport for std::sync::Arc<T> {
    async fn disco_info(&self, to: &Jid, node: Option<&str>) -> Result<DiscoInfo, RequestError> {
        (**self).disco_info(to, node).await
    }

    async fn disco_items(&self, to: &Jid, node: Option<&str>) -> Result<DiscoItems, RequestError> {
        (**self).disco_items(to, node).await
    }
}
