//! Service Discovery: disco#items handling.
//!
//! Implements the disco#items side of XEP-0030: query builders and
//! result parsers for outbound requests, plus responder helpers.

use jid::Jid;
use minidom::Element;
use tracing::debug;
use xmpp_parsers::iq::{Iq, IqType};

use crate::error::DiscoError;

/// Service Discovery items namespace (XEP-0030).
pub const DISCO_ITEMS_NS: &str = "http://jabber.org/protocol/disco#items";

/// Parsed disco#items query.
#[derive(Debug, Clone)]
pub struct DiscoItemsQuery {
    /// Target JID (from IQ 'to' attribute)
    pub target: Option<String>,
    /// Optional node being queried
    pub node: Option<String>,
}

/// A single item from a disco#items result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoItem {
    /// JID of the item, if the peer disclosed one
    pub jid: Option<String>,
    /// Optional node identifier
    pub node: Option<String>,
    /// Optional name (human-readable)
    pub name: Option<String>,
}

impl DiscoItem {
    /// Create a new disco item.
    pub fn new(jid: Option<&str>, node: Option<&str>, name: Option<&str>) -> Self {
        Self {
            jid: jid.map(|s| s.to_string()),
            node: node.map(|s| s.to_string()),
            name: name.map(|s| s.to_string()),
        }
    }
}

/// A disco#items result: the node the peer answered under and its items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoItems {
    /// Node this item list describes, as reported in the response
    pub node: Option<String>,
    /// Items, in wire order
    pub items: Vec<DiscoItem>,
}

impl DiscoItems {
    /// Create an empty item list for the given node.
    pub fn new(node: Option<&str>) -> Self {
        Self {
            node: node.map(|s| s.to_string()),
            items: Vec::new(),
        }
    }

    /// Add an item.
    pub fn with_item(mut self, item: DiscoItem) -> Self {
        self.items.push(item);
        self
    }
}

/// Build a disco#items query IQ addressed to `to`.
pub fn build_disco_items_query(to: &Jid, node: Option<&str>, id: &str) -> Iq {
    let mut query = Element::builder("query", DISCO_ITEMS_NS);
    if let Some(n) = node {
        query = query.attr("node", n);
    }

    Iq {
        from: None,
        to: Some(to.clone()),
        id: id.to_string(),
        payload: IqType::Get(query.build()),
    }
}

/// Parse a disco#items result `<query/>` element.
pub fn parse_disco_items_result(elem: &Element) -> Result<DiscoItems, DiscoError> {
    if elem.name() != "query" || elem.ns() != DISCO_ITEMS_NS {
        return Err(DiscoError::malformed(format!(
            "expected disco#items query element, got <{}/>",
            elem.name()
        )));
    }

    let mut result = DiscoItems::new(elem.attr("node"));

    for child in elem
        .children()
        .filter(|c| c.name() == "item" && c.ns() == DISCO_ITEMS_NS)
    {
        result.items.push(DiscoItem::new(
            child.attr("jid"),
            child.attr("node"),
            child.attr("name"),
        ));
    }

    debug!(node = ?result.node, items = result.items.len(), "Parsed disco#items result");

    Ok(result)
}

/// Parse a disco#items result out of a full IQ stanza.
pub fn parse_disco_items_from_iq(iq: &Iq) -> Result<DiscoItems, DiscoError> {
    match &iq.payload {
        IqType::Result(Some(elem)) => parse_disco_items_result(elem),
        IqType::Result(None) => Err(DiscoError::malformed("empty disco#items result")),
        _ => Err(DiscoError::malformed("disco#items result must be IQ result")),
    }
}

/// Check if an IQ is a disco#items query.
pub fn is_disco_items_query(iq: &Iq) -> bool {
    match &iq.payload {
        IqType::Get(elem) => elem.name() == "query" && elem.ns() == DISCO_ITEMS_NS,
        _ => false,
    }
}

/// Parse a disco#items query from an IQ stanza.
pub fn parse_disco_items_query(iq: &Iq) -> Result<DiscoItemsQuery, DiscoError> {
    let query_elem = match &iq.payload {
        IqType::Get(elem) if elem.name() == "query" && elem.ns() == DISCO_ITEMS_NS => elem,
        IqType::Get(_) => {
            return Err(DiscoError::malformed("missing disco#items query element"));
        }
        _ => {
            return Err(DiscoError::malformed("disco#items query must be IQ get"));
        }
    };

    Ok(DiscoItemsQuery {
        target: iq.to.as_ref().map(|j| j.to_string()),
        node: query_elem.attr("node").map(|s| s.to_string()),
    })
}

/// Build a disco#items response IQ answering `original_iq`.
pub fn build_disco_items_response(original_iq: &Iq, items: &DiscoItems) -> Iq {
    let mut query = Element::builder("query", DISCO_ITEMS_NS);

    if let Some(ref node) = items.node {
        query = query.attr("node", node.as_str());
    }

    for item in &items.items {
        let mut item_builder = Element::builder("item", DISCO_ITEMS_NS);
        if let Some(ref jid) = item.jid {
            item_builder = item_builder.attr("jid", jid.as_str());
        }
        if let Some(ref node) = item.node {
            item_builder = item_builder.attr("node", node.as_str());
        }
        if let Some(ref name) = item.name {
            item_builder = item_builder.attr("name", name.as_str());
        }
        query = query.append(item_builder.build());
    }

    Iq {
        from: original_iq.to.clone(),
        to: original_iq.from.clone(),
        id: original_iq.id.clone(),
        payload: IqType::Result(Some(query.build())),
    }
}
