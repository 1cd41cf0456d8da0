#![forbid(unsafe_code)]

//! XML document abstraction for the firma signing engine.
//!
//! Provides an owned document over `roxmltree`, the `NodeSet` used for
//! document-subset canonicalization and the enveloped-signature view, and an
//! owned element tree for building signature fragments.

pub mod document;
pub mod escape;
pub mod nodeset;
pub mod writer;

pub use document::XmlDocument;
pub use nodeset::NodeSet;
pub use writer::{Content, Element, XmlWriter};

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree never resolves external entities, so internal subsets are
/// safe to accept.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse `text` with [`parsing_options`].
pub fn parse(text: &str) -> Result<roxmltree::Document<'_>, firma_core::Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| firma_core::Error::XmlParse(e.to_string()))
}

/// Qualified name of an element exactly as written in the source text.
///
/// roxmltree resolves prefixes away, so the name is recovered from the
/// start tag.
pub fn qualified_name(node: &roxmltree::Node<'_, '_>) -> String {
    let input = node.document().input_text();
    let start = node.range().start;
    if let Some(tag) = input.get(start..).and_then(|s| s.strip_prefix('<')) {
        let end = tag
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(tag.len());
        if end > 0 {
            return tag[..end].to_owned();
        }
    }
    node.tag_name().name().to_owned()
}

/// Prefix of a qualified element name, if any.
pub fn element_prefix(node: &roxmltree::Node<'_, '_>) -> Option<String> {
    let qname = qualified_name(node);
    qname.split_once(':').map(|(p, _)| p.to_owned())
}

/// Prefix bound to an attribute's namespace on `node`.
///
/// Attributes never pick up the default namespace, so only named bindings
/// are considered.
pub fn attribute_prefix(
    node: &roxmltree::Node<'_, '_>,
    attr: &roxmltree::Attribute<'_, '_>,
) -> Option<String> {
    let uri = attr.namespace()?;
    if uri == firma_core::ns::XML {
        return Some("xml".to_owned());
    }
    node.namespaces()
        .find(|ns| ns.name().is_some() && ns.uri() == uri)
        .and_then(|ns| ns.name().map(str::to_owned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_element_prefixes() {
        let xml = r#"<a:root xmlns:a="urn:a" xmlns="urn:d"><child/><a:x/></a:root>"#;
        let doc = parse(xml).unwrap();
        let root = doc.root_element();
        assert_eq!(qualified_name(&root), "a:root");
        assert_eq!(element_prefix(&root).as_deref(), Some("a"));
        let child = root.first_element_child().unwrap();
        assert_eq!(qualified_name(&child), "child");
        assert_eq!(element_prefix(&child), None);
    }

    #[test]
    fn recovers_attribute_prefixes() {
        let xml = r#"<root xmlns:xsi="urn:xsi" xsi:type="t" xml:lang="es" plain="1"/>"#;
        let doc = parse(xml).unwrap();
        let root = doc.root_element();
        let prefixes: Vec<Option<String>> = root
            .attributes()
            .map(|a| attribute_prefix(&root, &a))
            .collect();
        assert_eq!(
            prefixes,
            vec![Some("xsi".to_owned()), Some("xml".to_owned()), None]
        );
    }
}
