#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! Only "visibly utilized" namespace declarations are output. A namespace
//! is visibly utilized if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList
//!    (`#default` naming the default namespace).

use crate::render::{self, Attr, NsDecl};
use firma_core::Error;
use firma_xml::{escape, NodeSet};
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    let mut output = Vec::new();
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    /// Prefixes from the PrefixList, with `#default` mapped to "".
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(node))
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns)?;
                }
            }
            roxmltree::NodeType::Element => self.process_element(node, output, rendered_ns)?,
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
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(&node) {
            for child in node.children() {
                self.process_node(child, output, rendered_ns)?;
            }
            return Ok(());
        }

        let attrs_raw: Vec<Attr> = node
            .attributes()
            .map(|attr| Attr::from_node(&node, &attr))
            .collect();

        let mut utilized: BTreeSet<String> = self.inclusive_prefixes.clone();
        utilized.insert(firma_xml::element_prefix(&node).unwrap_or_default());
        for attr in &attrs_raw {
            if let Some((prefix, _)) = attr.qualified_name.split_once(':') {
                utilized.insert(prefix.to_owned());
            }
        }
        utilized.remove("xml");

        let inscope = render::inscope_namespaces(&node);

        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            match inscope.get(prefix) {
                Some(uri) => {
                    if rendered_ns.get(prefix) != Some(uri) {
                        ns_decls.push(NsDecl {
                            prefix: prefix.clone(),
                            uri: uri.clone(),
                        });
                    }
                }
                None if prefix.is_empty() => {
                    // Default namespace went out of scope below an output
                    // ancestor that rendered one.
                    if rendered_ns.get("").is_some_and(|d| !d.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {}
            }
        }
        ns_decls.sort();

        let mut attrs = attrs_raw;
        attrs.sort();

        let elem_name = firma_xml::qualified_name(&node);
        render::start_tag(output, &elem_name, &ns_decls, &attrs);

        let mut child_rendered = rendered_ns.clone();
        for decl in &ns_decls {
            child_rendered.insert(decl.prefix.clone(), decl.uri.clone());
        }
        for child in node.children() {
            self.process_node(child, output, &child_rendered)?;
        }

        render::end_tag(output, &elem_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exc(xml: &str, prefixes: &[&str]) -> String {
        let doc = roxmltree::Document::parse(xml).unwrap();
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
        String::from_utf8(canonicalize(&doc, false, None, &prefixes).unwrap()).unwrap()
    }

    #[test]
    fn only_utilized_namespaces_rendered() {
        assert_eq!(
            exc(r#"<a:r xmlns:a="urn:a" xmlns:b="urn:b"><c/></a:r>"#, &[]),
            r#"<a:r xmlns:a="urn:a"><c></c></a:r>"#
        );
    }

    #[test]
    fn attribute_prefixes_are_utilized() {
        assert_eq!(
            exc(
                r#"<r xmlns:xsi="urn:xsi" xmlns:u="urn:u"><c xsi:nil="true"/></r>"#,
                &[]
            ),
            r#"<r><c xmlns:xsi="urn:xsi" xsi:nil="true"></c></r>"#
        );
    }

    #[test]
    fn prefix_list_forces_rendering() {
        assert_eq!(
            exc(
                r#"<r xmlns="urn:d" xmlns:xsd="urn:xsd" xmlns:u="urn:u"><c/></r>"#,
                &["#default", "xsd"]
            ),
            r#"<r xmlns="urn:d" xmlns:xsd="urn:xsd"><c></c></r>"#
        );
    }

    #[test]
    fn default_namespace_rendered_where_used() {
        assert_eq!(
            exc(r#"<p:r xmlns:p="urn:p" xmlns="urn:d"><c><p:e/></c></p:r>"#, &[]),
            r#"<p:r xmlns:p="urn:p"><c xmlns="urn:d"><p:e></p:e></c></p:r>"#
        );
    }
}
