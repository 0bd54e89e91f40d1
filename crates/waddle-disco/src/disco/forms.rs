//! Extended service discovery data forms.
//!
//! disco#info responses may carry `<x xmlns='jabber:x:data'/>` result
//! forms describing software metadata and similar extensions. The
//! distinguished FORM_TYPE field identifies the form's schema and is
//! kept apart from the remaining fields, which is also the shape the
//! capability hash algorithm wants.

use minidom::Element;

/// Data forms namespace.
pub const NS_DATA_FORMS: &str = "jabber:x:data";

/// Distinguished field identifying a form's schema.
pub const FORM_TYPE_VAR: &str = "FORM_TYPE";

/// A single form field with its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Field name (the `var` attribute)
    pub var: String,
    /// Field values, in wire order
    pub values: Vec<String>,
}

impl FormField {
    /// Create a new field.
    pub fn new(var: &str, values: &[&str]) -> Self {
        Self {
            var: var.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// An extended-discovery data form.
///
/// `form_type` holds the first FORM_TYPE value if the form declared one;
/// `fields` never contains the FORM_TYPE field itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataForm {
    /// Declared FORM_TYPE value, if any
    pub form_type: Option<String>,
    /// Remaining fields, in wire order
    pub fields: Vec<FormField>,
}

impl DataForm {
    /// Create a new form with the given FORM_TYPE.
    pub fn new(form_type: Option<&str>) -> Self {
        Self {
            form_type: form_type.map(|s| s.to_string()),
            fields: Vec::new(),
        }
    }

    /// Add a field to the form.
    pub fn with_field(mut self, var: &str, values: &[&str]) -> Self {
        self.fields.push(FormField::new(var, values));
        self
    }
}

/// Parse a data form from an `<x/>` element.
///
/// Returns `None` if the element is not a data form. Forms in other
/// namespaces are not extended discovery data and must not contribute
/// to capability hashes.
pub fn parse_data_form(elem: &Element) -> Option<DataForm> {
    if elem.name() != "x" || elem.ns() != NS_DATA_FORMS {
        return None;
    }

    let mut form = DataForm::default();
    for field in elem
        .children()
        .filter(|c| c.name() == "field" && c.ns() == NS_DATA_FORMS)
    {
        let Some(var) = field.attr("var") else {
            continue;
        };

        let values: Vec<String> = field
            .children()
            .filter(|c| c.name() == "value" && c.ns() == NS_DATA_FORMS)
            .map(|c| c.text())
            .collect();

        if var == FORM_TYPE_VAR {
            form.form_type = values.into_iter().next();
        } else {
            form.fields.push(FormField {
                var: var.to_string(),
                values,
            });
        }
    }

    Some(form)
}

/// Build an `<x type='result'/>` element from a data form.
pub fn build_data_form(form: &DataForm) -> Element {
    let mut builder = Element::builder("x", NS_DATA_FORMS).attr("type", "result");

    if let Some(ref form_type) = form.form_type {
        let mut field = Element::builder("field", NS_DATA_FORMS)
            .attr("var", FORM_TYPE_VAR)
            .attr("type", "hidden");
        field = field.append(
            Element::builder("value", NS_DATA_FORMS)
                .append(minidom::Node::Text(form_type.clone()))
                .build(),
        );
        builder = builder.append(field.build());
    }

    for field in &form.fields {
        let mut field_builder = Element::builder("field", NS_DATA_FORMS).attr("var", &field.var);
        for value in &field.values {
            field_builder = field_builder.append(
                Element::builder("value", NS_DATA_FORMS)
                    .append(minidom::Node::Text(value.clone()))
                    .build(),
            );
        }
        builder = builder.append(field_builder.build());
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_form_splits_form_type() {
        let elem = build_data_form(
            &DataForm::new(Some("urn:xmpp:dataforms:softwareinfo"))
                .with_field("os", &["Mac"])
                .with_field("software", &["Psi"]),
        );

        let form = parse_data_form(&elem).unwrap();
        assert_eq!(
            form.form_type.as_deref(),
            Some("urn:xmpp:dataforms:softwareinfo")
        );
        assert_eq!(form.fields.len(), 2);
        assert!(form.fields.iter().all(|f| f.var != FORM_TYPE_VAR));
    }

    #[test]
    fn test_parse_data_form_without_form_type() {
        let elem = build_data_form(&DataForm::new(None).with_field("os", &["Mac"]));
        let form = parse_data_form(&elem).unwrap();
        assert!(form.form_type.is_none());
        assert_eq!(form.fields.len(), 1);
    }

    #[test]
    fn test_parse_data_form_rejects_other_namespaces() {
        let elem = Element::builder("x", "vcard-temp:x:update").build();
        assert!(parse_data_form(&elem).is_none());
    }

    #[test]
    fn test_parse_data_form_multiple_values() {
        let elem = build_data_form(
            &DataForm::new(Some("urn:example:form")).with_field("ip_version", &["ipv4", "ipv6"]),
        );

        let form = parse_data_form(&elem).unwrap();
        assert_eq!(form.fields[0].values, vec!["ipv4", "ipv6"]);
    }

    #[test]
    fn test_parse_data_form_skips_fields_without_var() {
        let field = Element::builder("field", NS_DATA_FORMS).build();
        let elem = Element::builder("x", NS_DATA_FORMS).append(field).build();

        let form = parse_data_form(&elem).unwrap();
        assert!(form.fields.is_empty());
    }
}
