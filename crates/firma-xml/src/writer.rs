#![forbid(unsafe_code)]

//! Owned element trees and a compact XML writer for signature fragments.
//!
//! Fragments are built as [`Element`] values, then serialized without any
//! formatting whitespace so that their canonical form does not depend on
//! indentation.

use crate::escape::{escape_attr, escape_text};

/// A streaming XML writer over a `String`.
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
}

impl XmlWriter {
    /// Create a new XML writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an element with the given name and attributes.
    pub fn start_element(&mut self, name: &str, attrs: &[(String, String)]) {
        self.open(name, attrs);
        self.out.push('>');
    }

    /// Write an empty element (self-closing).
    pub fn empty_element(&mut self, name: &str, attrs: &[(String, String)]) {
        self.open(name, attrs);
        self.out.push_str("/>");
    }

    /// End the current element.
    pub fn end_element(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    /// Write text content.
    pub fn write_text(&mut self, text: &str) {
        self.out.push_str(&escape_text(text));
    }

    /// Finish writing and return the XML as a string.
    pub fn into_string(self) -> String {
        self.out
    }

    fn open(&mut self, name: &str, attrs: &[(String, String)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (k, v) in attrs {
            self.out.push(' ');
            self.out.push_str(k);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(v));
            self.out.push('"');
        }
    }
}

/// Child content of an [`Element`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text(String),
}

/// An owned XML element with a qualified name.
///
/// Namespace declarations are plain attributes (`xmlns`, `xmlns:p`) and are
/// written in insertion order, before any other attribute added later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Content>,
}

impl Element {
    /// Create an element with a qualified name such as `ds:KeyInfo`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add an attribute, builder style.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Add or replace an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Declare a namespace binding (`prefix` empty for the default namespace).
    pub fn ns(self, prefix: &str, uri: &str) -> Self {
        if prefix.is_empty() {
            self.attr("xmlns", uri)
        } else {
            self.attr(format!("xmlns:{prefix}"), uri)
        }
    }

    /// Value of an attribute by qualified name.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Append a child element, builder style.
    pub fn child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Append a text node, builder style.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Content::Text(text.into()));
        self
    }

    /// Append a child element.
    pub fn push(&mut self, child: Element) {
        self.children.push(Content::Element(child));
    }

    /// Child content in order.
    pub fn children(&self) -> &[Content] {
        &self.children
    }

    /// Child elements in order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        })
    }

    /// Serialize into an existing writer.
    pub fn write(&self, w: &mut XmlWriter) {
        if self.children.is_empty() {
            w.empty_element(&self.name, &self.attrs);
            return;
        }
        w.start_element(&self.name, &self.attrs);
        for child in &self.children {
            match child {
                Content::Element(e) => e.write(w),
                Content::Text(t) => w.write_text(t),
            }
        }
        w.end_element(&self.name);
    }

    /// Serialize to a compact string.
    pub fn to_xml(&self) -> String {
        let mut w = XmlWriter::new();
        self.write(&mut w);
        w.into_string()
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_xml())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_compact_tree() {
        let el = Element::new("ds:KeyInfo")
            .ns("ds", "http://www.w3.org/2000/09/xmldsig#")
            .attr("Id", "k")
            .child(Element::new("ds:X509Data").child(Element::new("ds:X509Certificate").text("AB==")))
            .child(Element::new("ds:Empty"));
        assert_eq!(
            el.to_xml(),
            "<ds:KeyInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\" Id=\"k\">\
             <ds:X509Data><ds:X509Certificate>AB==</ds:X509Certificate></ds:X509Data>\
             <ds:Empty/></ds:KeyInfo>"
        );
    }

    #[test]
    fn escapes_content() {
        let el = Element::new("n").attr("a", "x\"y").text("CN=A & B <C>");
        assert_eq!(el.to_string(), "<n a=\"x&quot;y\">CN=A &amp; B &lt;C&gt;</n>");
    }

    #[test]
    fn set_attr_replaces() {
        let mut el = Element::new("n").attr("Id", "1");
        el.set_attr("Id", "2");
        assert_eq!(el.get_attr("Id"), Some("2"));
        assert_eq!(el.child_elements().count(), 0);
    }
}
