//! Service Discovery (XEP-0030) wire model and codecs.
//!
//! Provides the disco#info and disco#items data types together with
//! query builders, result parsers, and responder helpers. The caching
//! and capability-resolution layers sit on top of these in
//! [`crate::cache`], [`crate::caps`], and [`crate::service`].

pub mod forms;
pub mod info;
pub mod items;

pub use forms::{build_data_form, parse_data_form, DataForm, FormField, FORM_TYPE_VAR, NS_DATA_FORMS};
pub use info::{
    build_disco_info_element, build_disco_info_query, build_disco_info_response,
    is_disco_info_query, parse_disco_info_from_iq, parse_disco_info_query,
    parse_disco_info_result, DiscoInfo, DiscoInfoQuery, Identity, DISCO_INFO_NS,
};
pub use items::{
    build_disco_items_query, build_disco_items_response, is_disco_items_query,
    parse_disco_items_from_iq, parse_disco_items_query, parse_disco_items_result, DiscoItem,
    DiscoItems, DiscoItemsQuery, DISCO_ITEMS_NS,
};
