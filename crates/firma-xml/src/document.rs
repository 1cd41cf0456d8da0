#![forbid(unsafe_code)]

//! Owned XML document over roxmltree.

use firma_core::Error;

/// An owned, well-formed XML document.
///
/// To work with the parsed tree, call [`XmlDocument::parse_doc`] which
/// returns a temporary `roxmltree::Document` borrowing from the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    text: String,
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    pub fn parse(text: String) -> Result<Self, Error> {
        crate::parse(&text)?;
        Ok(Self { text })
    }

    /// Parse and validate XML from bytes.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?
            .to_owned();
        Self::parse(text)
    }

    /// Get the raw XML text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the document, returning its text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// Parse the document and return a temporary `roxmltree::Document`.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>, Error> {
        crate::parse(&self.text)
    }

    /// Return a new document with `fragment` appended as the last child of
    /// the root element.
    ///
    /// The fragment text is inserted immediately before the root's end tag;
    /// a self-closing root is expanded into a start/end pair. No other byte
    /// of the document changes. The result is re-parsed so a fragment that
    /// breaks well-formedness is rejected.
    pub fn append_to_root(&self, fragment: &str) -> Result<XmlDocument, Error> {
        let doc = self.parse_doc()?;
        let root = doc.root_element();
        let range = root.range();
        let element_text = self
            .text
            .get(range.clone())
            .ok_or_else(|| Error::XmlStructure("root element range out of bounds".into()))?;

        let mut out = String::with_capacity(self.text.len() + fragment.len() + 16);
        if element_text.ends_with("/>") && !element_text.contains("</") {
            let name = crate::qualified_name(&root);
            let close = range.end - 2;
            out.push_str(&self.text[..close]);
            out.push('>');
            out.push_str(fragment);
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
            out.push_str(&self.text[range.end..]);
        } else {
            let end_tag = element_text
                .rfind("</")
                .map(|i| range.start + i)
                .ok_or_else(|| Error::XmlStructure("root element has no end tag".into()))?;
            out.push_str(&self.text[..end_tag]);
            out.push_str(fragment);
            out.push_str(&self.text[end_tag..]);
        }
        Self::parse(out)
    }

    /// Find the first descendant element with the given local name and namespace.
    pub fn find_element<'a>(
        doc: &'a roxmltree::Document<'a>,
        ns: &str,
        local_name: &str,
    ) -> Option<roxmltree::Node<'a, 'a>> {
        doc.descendants().find(|n| {
            n.is_element()
                && n.tag_name().name() == local_name
                && n.tag_name().namespace().unwrap_or("") == ns
        })
    }

    /// Find the element whose `Id` attribute equals `id`.
    pub fn find_by_id<'a>(
        doc: &'a roxmltree::Document<'a>,
        id: &str,
    ) -> Option<roxmltree::Node<'a, 'a>> {
        doc.descendants()
            .find(|n| n.is_element() && n.attribute("Id") == Some(id))
    }
}

impl std::str::FromStr for XmlDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            XmlDocument::parse("<a><b></a>".into()),
            Err(Error::XmlParse(_))
        ));
        assert!(XmlDocument::parse_bytes(&[0x3c, 0xff, 0x3e]).is_err());
    }

    #[test]
    fn append_keeps_existing_content() {
        let doc = XmlDocument::parse(
            "<?xml version=\"1.0\"?>\n<r xmlns=\"urn:r\">\n  <a>1</a>\n  <b/>\n</r>\n".into(),
        )
        .unwrap();
        let signed = doc.append_to_root("<s/>").unwrap();
        assert_eq!(
            signed.text(),
            "<?xml version=\"1.0\"?>\n<r xmlns=\"urn:r\">\n  <a>1</a>\n  <b/>\n<s/></r>\n"
        );
        let parsed = signed.parse_doc().unwrap();
        let names: Vec<&str> = parsed
            .root_element()
            .children()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .collect();
        assert_eq!(names, ["a", "b", "s"]);
    }

    #[test]
    fn append_expands_self_closing_root() {
        let doc = XmlDocument::parse("<p:r xmlns:p=\"urn:p\" a=\"1\"/>".into()).unwrap();
        let signed = doc.append_to_root("<x/>").unwrap();
        assert_eq!(signed.text(), "<p:r xmlns:p=\"urn:p\" a=\"1\"><x/></p:r>");
    }

    #[test]
    fn append_rejects_broken_fragment() {
        let doc = XmlDocument::parse("<r/>".into()).unwrap();
        assert!(doc.append_to_root("<x>").is_err());
    }

    #[test]
    fn finds_by_id() {
        let doc = XmlDocument::parse(r#"<r><a Id="one"/><b Id="two"/></r>"#.into()).unwrap();
        let parsed = doc.parse_doc().unwrap();
        let node = XmlDocument::find_by_id(&parsed, "two").unwrap();
        assert_eq!(node.tag_name().name(), "b");
        assert!(XmlDocument::find_by_id(&parsed, "three").is_none());
    }
}
