//! Service Discovery: disco#info handling.
//!
//! Implements the disco#info side of XEP-0030: query builders and result
//! parsers for outbound requests, plus the responder helpers needed to
//! answer queries addressed to us (including capability-node queries).

use jid::Jid;
use minidom::Element;
use tracing::debug;
use xmpp_parsers::iq::{Iq, IqType};

use super::forms::{build_data_form, parse_data_form, DataForm};
use crate::error::DiscoError;

/// Service Discovery info namespace (XEP-0030).
pub const DISCO_INFO_NS: &str = "http://jabber.org/protocol/disco#info";

/// Parsed disco#info query.
#[derive(Debug, Clone)]
pub struct DiscoInfoQuery {
    /// Target JID (from IQ 'to' attribute)
    pub target: Option<String>,
    /// Optional node being queried
    pub node: Option<String>,
}

/// Identity element for disco#info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Category (e.g., "client", "server", "conference")
    pub category: String,
    /// Type (e.g., "pc", "im", "text")
    pub type_: String,
    /// Optional language tag (the `xml:lang` attribute)
    pub lang: Option<String>,
    /// Optional name (human-readable)
    pub name: Option<String>,
}

impl Identity {
    /// Create a new identity.
    pub fn new(category: &str, type_: &str, name: Option<&str>) -> Self {
        Self {
            category: category.to_string(),
            type_: type_.to_string(),
            lang: None,
            name: name.map(|s| s.to_string()),
        }
    }

    /// Set the language tag on this identity.
    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = Some(lang.to_string());
        self
    }

    /// Client identity (category="client") of the given type.
    pub fn client(type_: &str, name: Option<&str>) -> Self {
        Self::new("client", type_, name)
    }

    /// Server identity (category="server", type="im").
    pub fn server(name: Option<&str>) -> Self {
        Self::new("server", "im", name)
    }
}

/// A disclosed capability set: identities, features, and any extended
/// data forms, as one entity (or one of its nodes) reported them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoInfo {
    /// Node this info describes, as reported in the response
    pub node: Option<String>,
    /// Identities, in wire order
    pub identities: Vec<Identity>,
    /// Feature vars, in wire order
    pub features: Vec<String>,
    /// Extended data forms, in wire order
    pub extensions: Vec<DataForm>,
}

impl DiscoInfo {
    /// Create an empty info set for the given node.
    pub fn new(node: Option<&str>) -> Self {
        Self {
            node: node.map(|s| s.to_string()),
            ..Self::default()
        }
    }

    /// Add an identity.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.push(identity);
        self
    }

    /// Add a feature var.
    pub fn with_feature(mut self, var: &str) -> Self {
        self.features.push(var.to_string());
        self
    }

    /// Add an extended data form.
    pub fn with_extension(mut self, form: DataForm) -> Self {
        self.extensions.push(form);
        self
    }

    /// Check whether a feature var is present.
    pub fn has_feature(&self, var: &str) -> bool {
        self.features.iter().any(|f| f == var)
    }
}

/// Build a disco#info query IQ addressed to `to`.
pub fn build_disco_info_query(to: &Jid, node: Option<&str>, id: &str) -> Iq {
    let mut query = Element::builder("query", DISCO_INFO_NS);
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

/// Parse a disco#info result `<query/>` element.
///
/// The node attribute of the response is authoritative: a peer may
/// answer under a different node than the one queried, and cache entries
/// must be keyed by what the peer reported.
pub fn parse_disco_info_result(elem: &Element) -> Result<DiscoInfo, DiscoError> {
    if elem.name() != "query" || elem.ns() != DISCO_INFO_NS {
        return Err(DiscoError::malformed(format!(
            "expected disco#info query element, got <{}/>",
            elem.name()
        )));
    }

    let mut info = DiscoInfo::new(elem.attr("node"));

    for child in elem.children() {
        if child.name() == "identity" && child.ns() == DISCO_INFO_NS {
            let category = child
                .attr("category")
                .ok_or_else(|| DiscoError::malformed("identity without category"))?;
            let type_ = child
                .attr("type")
                .ok_or_else(|| DiscoError::malformed("identity without type"))?;

            let mut identity = Identity::new(category, type_, child.attr("name"));
            if let Some(lang) = child.attr("xml:lang") {
                identity = identity.with_lang(lang);
            }
            info.identities.push(identity);
        } else if child.name() == "feature" && child.ns() == DISCO_INFO_NS {
            let var = child
                .attr("var")
                .ok_or_else(|| DiscoError::malformed("feature without var"))?;
            info.features.push(var.to_string());
        } else if let Some(form) = parse_data_form(child) {
            info.extensions.push(form);
        }
    }

    debug!(
        node = ?info.node,
        identities = info.identities.len(),
        features = info.features.len(),
        extensions = info.extensions.len(),
        "Parsed disco#info result"
    );

    Ok(info)
}

/// Parse a disco#info result out of a full IQ stanza.
pub fn parse_disco_info_from_iq(iq: &Iq) -> Result<DiscoInfo, DiscoError> {
    match &iq.payload {
        IqType::Result(Some(elem)) => parse_disco_info_result(elem),
        IqType::Result(None) => Err(DiscoError::malformed("empty disco#info result")),
        _ => Err(DiscoError::malformed("disco#info result must be IQ result")),
    }
}

/// Check if an IQ is a disco#info query.
pub fn is_disco_info_query(iq: &Iq) -> bool {
    match &iq.payload {
        IqType::Get(elem) => elem.name() == "query" && elem.ns() == DISCO_INFO_NS,
        _ => false,
    }
}

/// Parse a disco#info query from an IQ stanza.
pub fn parse_disco_info_query(iq: &Iq) -> Result<DiscoInfoQuery, DiscoError> {
    let query_elem = match &iq.payload {
        IqType::Get(elem) if elem.name() == "query" && elem.ns() == DISCO_INFO_NS => elem,
        IqType::Get(_) => {
            return Err(DiscoError::malformed("missing disco#info query element"));
        }
        _ => {
            return Err(DiscoError::malformed("disco#info query must be IQ get"));
        }
    };

    Ok(DiscoInfoQuery {
        target: iq.to.as_ref().map(|j| j.to_string()),
        node: query_elem.attr("node").map(|s| s.to_string()),
    })
}

/// Build the `<query/>` element for a disco#info result.
pub fn build_disco_info_element(info: &DiscoInfo) -> Element {
    let mut query = Element::builder("query", DISCO_INFO_NS);

    if let Some(ref node) = info.node {
        query = query.attr("node", node.as_str());
    }

    for identity in &info.identities {
        let mut id_builder = Element::builder("identity", DISCO_INFO_NS)
            .attr("category", &identity.category)
            .attr("type", &identity.type_);
        if let Some(ref lang) = identity.lang {
            id_builder = id_builder.attr("xml:lang", lang.as_str());
        }
        if let Some(ref name) = identity.name {
            id_builder = id_builder.attr("name", name.as_str());
        }
        query = query.append(id_builder.build());
    }

    for feature in &info.features {
        query = query.append(
            Element::builder("feature", DISCO_INFO_NS)
                .attr("var", feature.as_str())
                .build(),
        );
    }

    for form in &info.extensions {
        query = query.append(build_data_form(form));
    }

    query.build()
}

/// Build a disco#info response IQ answering `original_iq`.
pub fn build_disco_info_response(original_iq: &Iq, info: &DiscoInfo) -> Iq {
    Iq {
        from: original_iq.to.clone(),
        to: original_iq.from.clone(),
        id: original_iq.id.clone(),
        payload: IqType::Result(Some(build_disco_info_element(info))),
    }
}
