#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0).
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! The canonical form:
//! - Outputs namespace declarations sorted by prefix (default first)
//! - Outputs attributes sorted by (namespace-URI, local-name)
//! - Escapes text and attribute values per C14N rules
//! - Optionally preserves or strips comments
//! - Supports document-subset canonicalization via NodeSet

use crate::render::{self, Attr, NsDecl};
use firma_core::{ns, Error};
use firma_xml::{escape, NodeSet};
use std::collections::BTreeMap;

/// Canonicalize a document using Inclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    canonicalize_with(doc, with_comments, node_set, &[])
}

/// Inclusive canonicalization with a list of `xml:*` attribute names that
/// are never inherited by the apex of a document subset.
pub(crate) fn canonicalize_with(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    non_inheritable: &[&str],
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext {
        with_comments,
        node_set,
        non_inheritable,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct C14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    non_inheritable: &'a [&'a str],
}

impl C14nContext<'_> {
    fn is_visible(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, inherited_ns)?;
                }
            }
            roxmltree::NodeType::Element => self.process_element(node, output, inherited_ns)?,
            roxmltree::NodeType::Text => {
                if self.is_visible(&node) {
                    let text = node.text().unwrap_or("");
                    output.extend_from_slice(escape::escape_text(text).as_bytes());
                }
            }
            roxmltree::NodeType::Comment => {
                if self.with_comments && self.is_visible(&node) {
                    render::misc_node(output, &node);
                }
            }
            roxmltree::NodeType::PI => {
                if self.is_visible(&node) {
                    render::misc_node(output, &node);
                }
            }
        }
        Ok(())
    }

    fn process_element(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(&node) {
            // Invisible elements contribute nothing themselves; descendants
            // compare against the nearest output ancestor.
            for child in node.children() {
                self.process_node(child, output, inherited_ns)?;
            }
            return Ok(());
        }

        let current_ns = render::inscope_namespaces(&node);

        let mut ns_decls: Vec<NsDecl> = current_ns
            .iter()
            .filter(|(prefix, uri)| inherited_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl {
                prefix: prefix.clone(),
                uri: uri.clone(),
            })
            .collect();

        // The nearest output ancestor had a default namespace this element
        // no longer has in scope.
        if inherited_ns.get("").is_some_and(|d| !d.is_empty()) && !current_ns.contains_key("") {
            ns_decls.push(NsDecl {
                prefix: String::new(),
                uri: String::new(),
            });
        }
        ns_decls.sort();

        let mut attrs: Vec<Attr> = node
            .attributes()
            .map(|attr| Attr::from_node(&node, &attr))
            .collect();

        // xml:* attributes are inherited only when the parent is not output.
        if self.node_set.is_some() {
            let parent_not_visible = node
                .parent()
                .map_or(true, |p| !p.is_element() || !self.is_visible(&p));
            if parent_not_visible {
                let extra = self.collect_inherited_xml_attrs(&node, &attrs);
                attrs.extend(extra);
            }
        }
        attrs.sort();

        let elem_name = firma_xml::qualified_name(&node);
        render::start_tag(output, &elem_name, &ns_decls, &attrs);

        for child in node.children() {
            self.process_node(child, output, &current_ns)?;
        }

        render::end_tag(output, &elem_name);
        Ok(())
    }

    /// Collect `xml:*` attributes from all ancestors, nearest first, that
    /// the element does not already carry.
    fn collect_inherited_xml_attrs(
        &self,
        node: &roxmltree::Node<'_, '_>,
        existing_attrs: &[Attr],
    ) -> Vec<Attr> {
        let mut inherited_xml: BTreeMap<String, String> = BTreeMap::new();

        for ancestor in node.ancestors().skip(1).filter(|n| n.is_element()) {
            for attr in ancestor.attributes() {
                if attr.namespace() == Some(ns::XML) && !self.non_inheritable.contains(&attr.name()) {
                    inherited_xml
                        .entry(attr.name().to_owned())
                        .or_insert_with(|| attr.value().to_owned());
                }
            }
        }

        inherited_xml
            .into_iter()
            .filter(|(name, _)| {
                !existing_attrs
                    .iter()
                    .any(|a| a.ns_uri == ns::XML && a.local_name == *name)
            })
            .map(|(name, value)| Attr {
                ns_uri: ns::XML.to_owned(),
                qualified_name: format!("xml:{name}"),
                local_name: name,
                value,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(xml: &str) -> String {
        let doc = roxmltree::Document::parse(xml).unwrap();
        String::from_utf8(canonicalize(&doc, false, None).unwrap()).unwrap()
    }

    #[test]
    fn test_simple_c14n() {
        assert_eq!(
            c14n(r#"<root><a b="1" a="2"/></root>"#),
            r#"<root><a a="2" b="1"></a></root>"#
        );
    }

    #[test]
    fn test_namespaces_declared_once() {
        assert_eq!(
            c14n(r#"<r xmlns:b="urn:b" xmlns:a="urn:a"><a:c xmlns:a="urn:a"/></r>"#),
            r#"<r xmlns:a="urn:a" xmlns:b="urn:b"><a:c></a:c></r>"#
        );
    }

    #[test]
    fn test_default_namespace_undeclared() {
        assert_eq!(
            c14n(r#"<r xmlns="urn:d"><c xmlns=""/></r>"#),
            r#"<r xmlns="urn:d"><c xmlns=""></c></r>"#
        );
    }

    #[test]
    fn test_text_and_declaration_normalization() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<r>Caf&#xE9; &amp; t&#233;</r>\n";
        assert_eq!(c14n(xml), "<r>Caf\u{e9} &amp; t\u{e9}</r>");
    }

    #[test]
    fn test_comments_stripped() {
        assert_eq!(c14n("<!--x--><r><!--y-->a</r>"), "<r>a</r>");
    }

    #[test]
    fn test_subset_inherits_xml_attrs() {
        let xml = r#"<r xml:lang="es"><a>1</a></r>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let a = doc.root_element().first_element_child().unwrap();
        let set = NodeSet::tree_without_comments(a);
        let out = canonicalize(&doc, false, Some(&set)).unwrap();
        assert_eq!(out, br#"<a xml:lang="es">1</a>"#);
    }
}
