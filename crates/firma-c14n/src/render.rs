#![forbid(unsafe_code)]

//! Shared rendering utilities for C14N output.

use firma_xml::escape;
use std::collections::BTreeMap;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI ("" undeclares the default namespace).
    pub uri: String,
}

impl NsDecl {
    /// Render this namespace declaration.
    pub fn render(&self, out: &mut Vec<u8>) {
        if self.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(self.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        out.extend_from_slice(escape::escape_attr(&self.uri).as_bytes());
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Default namespace sorts first, then by prefix.
        match (self.prefix.is_empty(), other.prefix.is_empty()) {
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            _ => self.prefix.cmp(&other.prefix),
        }
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    pub local_name: String,
    /// The qualified name (prefix:local or just local).
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    /// Build from a parsed attribute of `node`.
    pub fn from_node(node: &roxmltree::Node<'_, '_>, attr: &roxmltree::Attribute<'_, '_>) -> Self {
        let qualified_name = match firma_xml::attribute_prefix(node, attr) {
            Some(prefix) => format!("{prefix}:{}", attr.name()),
            None => attr.name().to_owned(),
        };
        Self {
            ns_uri: attr.namespace().unwrap_or("").to_owned(),
            local_name: attr.name().to_owned(),
            qualified_name,
            value: attr.value().to_owned(),
        }
    }

    /// Render this attribute.
    pub fn render(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        out.extend_from_slice(escape::escape_attr(&self.value).as_bytes());
        out.push(b'"');
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Unqualified attributes first, then by (namespace URI, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => std::cmp::Ordering::Less,
            (false, true) => std::cmp::Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then(self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// In-scope namespaces of an element, keyed by prefix ("" for default).
///
/// The implicit `xml` binding is left out since it is never rendered.
pub fn inscope_namespaces(node: &roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|ns| ns.name() != Some("xml") && !ns.uri().is_empty())
        .map(|ns| (ns.name().unwrap_or("").to_owned(), ns.uri().to_owned()))
        .collect()
}

/// Write an element start tag.
pub fn start_tag(out: &mut Vec<u8>, name: &str, ns_decls: &[NsDecl], attrs: &[Attr]) {
    out.push(b'<');
    out.extend_from_slice(name.as_bytes());
    for ns in ns_decls {
        ns.render(out);
    }
    for attr in attrs {
        attr.render(out);
    }
    out.push(b'>');
}

/// Write an element end tag.
pub fn end_tag(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(name.as_bytes());
    out.push(b'>');
}

/// Write a comment or processing instruction.
///
/// At document level these are separated from the document element by a
/// single line feed.
pub fn misc_node(out: &mut Vec<u8>, node: &roxmltree::Node<'_, '_>) {
    let at_top = node
        .parent()
        .is_some_and(|p| p.node_type() == roxmltree::NodeType::Root);
    if at_top && node.prev_siblings().any(|s| s.is_element()) {
        out.push(b'\n');
    }

    match node.node_type() {
        roxmltree::NodeType::Comment => {
            out.extend_from_slice(b"<!--");
            out.extend_from_slice(node.text().unwrap_or("").as_bytes());
            out.extend_from_slice(b"-->");
        }
        roxmltree::NodeType::PI => {
            if let Some(pi) = node.pi() {
                out.extend_from_slice(b"<?");
                out.extend_from_slice(pi.target.as_bytes());
                if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                    out.push(b' ');
                    out.extend_from_slice(escape::escape_pi(value).as_bytes());
                }
                out.extend_from_slice(b"?>");
            }
        }
        _ => {}
    }

    if at_top && node.next_siblings().any(|s| s.is_element()) {
        out.push(b'\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_order_puts_default_first() {
        let mut decls = vec![
            NsDecl { prefix: "xsi".into(), uri: "urn:xsi".into() },
            NsDecl { prefix: "ds".into(), uri: "urn:ds".into() },
            NsDecl { prefix: String::new(), uri: "urn:d".into() },
        ];
        decls.sort();
        let prefixes: Vec<&str> = decls.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(prefixes, ["", "ds", "xsi"]);
    }

    #[test]
    fn attribute_order_is_namespace_then_local() {
        let attr = |ns: &str, local: &str| Attr {
            ns_uri: ns.into(),
            local_name: local.into(),
            qualified_name: local.into(),
            value: String::new(),
        };
        let mut attrs = vec![
            attr("urn:b", "a"),
            attr("", "z"),
            attr("urn:a", "z"),
            attr("", "Id"),
        ];
        attrs.sort();
        let order: Vec<(&str, &str)> = attrs
            .iter()
            .map(|a| (a.ns_uri.as_str(), a.local_name.as_str()))
            .collect();
        assert_eq!(order, [("", "Id"), ("", "z"), ("urn:a", "z"), ("urn:b", "a")]);
    }

    #[test]
    fn document_level_comments_get_line_feeds() {
        let doc = roxmltree::Document::parse("<!--a--><r/><!--b-->").unwrap();
        let mut out = Vec::new();
        for node in doc.root().children().filter(|n| n.is_comment()) {
            misc_node(&mut out, &node);
        }
        assert_eq!(out, b"<!--a-->\n\n<!--b-->");
    }
}
